//! Header resolution and per-row validation for the facility CSV feed.

use csv::StringRecord;
use geo::Coord;
use parkside_core::{Facility, FacilityError, Svy21Projector};

use super::capacity::estimate_capacity;

/// Column names accepted for the facility identifier.
const ID_COLUMNS: &[&str] = &["car_park_no", "facility_no"];
const ADDRESS_COLUMN: &str = "address";
const X_COLUMN: &str = "x_coord";
const Y_COLUMN: &str = "y_coord";
const DECKS_COLUMNS: &[&str] = &["decks", "car_park_decks"];
const TYPE_COLUMNS: &[&str] = &["type", "car_park_type"];

/// Positions of the recognised columns within the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Columns {
    id: usize,
    address: usize,
    x: usize,
    y: usize,
    decks: Option<usize>,
    kind: Option<usize>,
}

impl Columns {
    /// Resolve column positions, or list the required columns that are absent.
    pub(super) fn resolve(headers: &StringRecord) -> Result<Self, Vec<String>> {
        let names: Vec<String> = headers
            .iter()
            .map(|name| name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase())
            .collect();
        let find = |candidates: &[&str]| {
            names
                .iter()
                .position(|name| candidates.contains(&name.as_str()))
        };

        let id = find(ID_COLUMNS);
        let address = find(&[ADDRESS_COLUMN]);
        let x = find(&[X_COLUMN]);
        let y = find(&[Y_COLUMN]);
        match (id, address, x, y) {
            (Some(id), Some(address), Some(x), Some(y)) => Ok(Self {
                id,
                address,
                x,
                y,
                decks: find(DECKS_COLUMNS),
                kind: find(TYPE_COLUMNS),
            }),
            _ => {
                let mut missing = Vec::new();
                if id.is_none() {
                    missing.push(ID_COLUMNS[0].to_owned());
                }
                for (found, column) in [(address, ADDRESS_COLUMN), (x, X_COLUMN), (y, Y_COLUMN)] {
                    if found.is_none() {
                        missing.push(column.to_owned());
                    }
                }
                Err(missing)
            }
        }
    }
}

/// Reason a data row was skipped.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum RowRejection {
    /// A required field was absent or blank.
    MissingField(&'static str),
    /// A grid coordinate did not parse as a finite number.
    InvalidCoordinate {
        column: &'static str,
        value: String,
    },
    /// The projected facility failed validation.
    InvalidFacility(FacilityError),
}

impl std::fmt::Display for RowRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(column) => write!(f, "missing {column}"),
            Self::InvalidCoordinate { column, value } => {
                write!(f, "{column} {value:?} is not a finite number")
            }
            Self::InvalidFacility(err) => write!(f, "{err}"),
        }
    }
}

fn required<'r>(
    record: &'r StringRecord,
    index: usize,
    column: &'static str,
) -> Result<&'r str, RowRejection> {
    record
        .get(index)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(RowRejection::MissingField(column))
}

fn coordinate(
    record: &StringRecord,
    index: usize,
    column: &'static str,
) -> Result<f64, RowRejection> {
    let raw = required(record, index, column)?;
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| RowRejection::InvalidCoordinate {
            column,
            value: raw.to_owned(),
        })
}

/// Validate a record and convert it into a projected facility.
pub(super) fn convert(
    record: &StringRecord,
    columns: &Columns,
    projector: &Svy21Projector,
) -> Result<Facility, RowRejection> {
    let id = required(record, columns.id, ID_COLUMNS[0])?;
    let address = required(record, columns.address, ADDRESS_COLUMN)?;
    let grid = Coord {
        x: coordinate(record, columns.x, X_COLUMN)?,
        y: coordinate(record, columns.y, Y_COLUMN)?,
    };
    let optional = |index: Option<usize>| index.and_then(|i| record.get(i));
    let total_lots = estimate_capacity(optional(columns.decks), optional(columns.kind));

    Facility::new(id, address, projector.project(grid), grid, total_lots)
        .map_err(RowRejection::InvalidFacility)
}
