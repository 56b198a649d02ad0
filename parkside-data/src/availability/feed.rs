//! Serde model of the carpark availability JSON feed.
//!
//! Every field is optional: the upstream service omits keys freely and sends
//! numeric values as strings, so validation happens in the updater rather
//! than at deserialisation.

use serde::Deserialize;

/// Sentinel count used when `lots_available` is missing or unparseable.
pub const INVALID_LOTS: i64 = -1;

/// Top-level feed payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AvailabilityFeed {
    /// Snapshots in upstream order; only the first is consumed.
    pub items: Vec<FeedItem>,
}

/// One point-in-time snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedItem {
    /// RFC 3339 time of the snapshot.
    pub timestamp: Option<String>,
    /// Readings per facility.
    pub carpark_data: Vec<CarparkEntry>,
}

/// Availability reading for one facility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CarparkEntry {
    /// Facility identifier.
    pub carpark_number: Option<String>,
    /// Local time the facility last reported.
    pub update_datetime: Option<String>,
    /// Lot counts by lot type.
    pub carpark_info: Vec<LotReading>,
}

/// Lot counts for one lot type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LotReading {
    /// Total lots of this type.
    pub total_lots: Option<String>,
    /// Lot type code, such as `C` for cars.
    pub lot_type: Option<String>,
    /// Free lots of this type.
    pub lots_available: Option<String>,
}

impl CarparkEntry {
    /// Trimmed facility id, or `None` when missing or blank.
    #[must_use]
    pub fn facility_id(&self) -> Option<&str> {
        self.carpark_number
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Free lots from the first reading, or [`INVALID_LOTS`].
    #[must_use]
    pub fn available_lots(&self) -> i64 {
        parse_lots(
            self.carpark_info
                .first()
                .and_then(|reading| reading.lots_available.as_deref()),
        )
    }
}

/// Parse a lot count, mapping anything unusable to [`INVALID_LOTS`].
///
/// Negative values parse as-is so callers can reject them explicitly.
#[must_use]
pub fn parse_lots(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(INVALID_LOTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("42"), 42)]
    #[case(Some(" 7 "), 7)]
    #[case(Some("-3"), -3)]
    #[case(Some("many"), INVALID_LOTS)]
    #[case(Some(""), INVALID_LOTS)]
    #[case(None, INVALID_LOTS)]
    fn parses_lot_counts(#[case] raw: Option<&str>, #[case] expected: i64) {
        assert_eq!(parse_lots(raw), expected);
    }

    #[rstest]
    fn deserialises_upstream_shape() {
        let json = r#"{
            "items": [{
                "timestamp": "2024-01-15T10:30:00+08:00",
                "carpark_data": [{
                    "carpark_info": [
                        {"total_lots": "105", "lot_type": "C", "lots_available": "42"},
                        {"total_lots": "10", "lot_type": "Y", "lots_available": "3"}
                    ],
                    "carpark_number": "HE12",
                    "update_datetime": "2024-01-15T10:29:45"
                }]
            }]
        }"#;

        let feed: AvailabilityFeed = serde_json::from_str(json).expect("feed parses");

        let entry = &feed.items[0].carpark_data[0];
        assert_eq!(entry.facility_id(), Some("HE12"));
        assert_eq!(entry.available_lots(), 42);
        assert_eq!(entry.carpark_info[1].lot_type.as_deref(), Some("Y"));
    }

    #[rstest]
    #[case("{}")]
    #[case(r#"{"items": []}"#)]
    #[case(r#"{"items": [{}]}"#)]
    fn tolerates_missing_fields(#[case] json: &str) {
        let feed: AvailabilityFeed = serde_json::from_str(json).expect("feed parses");
        assert!(feed.items.iter().all(|item| item.carpark_data.is_empty()));
    }

    #[rstest]
    #[case(None)]
    #[case(Some("   "))]
    fn blank_ids_are_absent(#[case] id: Option<&str>) {
        let entry = CarparkEntry {
            carpark_number: id.map(str::to_owned),
            ..CarparkEntry::default()
        };
        assert_eq!(entry.facility_id(), None);
        assert_eq!(entry.available_lots(), INVALID_LOTS);
    }
}
