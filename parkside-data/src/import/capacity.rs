//! Capacity estimation for facilities whose feed omits a lot count.

use std::str::FromStr;

/// Lots assumed per deck of a multi-level facility.
pub const LOTS_PER_DECK: u32 = 75;

/// Capacity assumed when neither decks nor a known type are available.
pub const DEFAULT_CAPACITY: u32 = 100;

/// Structural kinds with a fixed capacity estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacilityKind {
    /// Multi-storey car park.
    MultiStorey,
    /// Basement car park.
    Basement,
    /// Open-air surface car park.
    Surface,
}

impl FacilityKind {
    /// Estimated lots for this kind.
    #[must_use]
    pub const fn estimated_lots(self) -> u32 {
        match self {
            Self::MultiStorey => 200,
            Self::Basement => 150,
            Self::Surface => 100,
        }
    }
}

/// Returned when a type label is not in the lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFacilityKind(pub String);

impl FromStr for FacilityKind {
    type Err = UnknownFacilityKind;

    /// Accepts labels such as `multi-storey`, `MULTI-STOREY CAR PARK` or
    /// `basement`, ignoring case, separators and a trailing "car park".
    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let normalised = label
            .trim()
            .to_ascii_lowercase()
            .replace(['-', '_'], " ");
        let normalised = normalised.trim_end_matches("car park").trim();
        match normalised.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
            "multi storey" | "multistorey" => Ok(Self::MultiStorey),
            "basement" => Ok(Self::Basement),
            "surface" => Ok(Self::Surface),
            _ => Err(UnknownFacilityKind(label.to_owned())),
        }
    }
}

/// Estimate capacity from the optional `decks` and `type` columns.
///
/// The first satisfied rule wins: a positive deck count gives
/// `decks * LOTS_PER_DECK`, then a known type gives its table value, and
/// anything else gives [`DEFAULT_CAPACITY`].
///
/// # Examples
///
/// ```
/// use parkside_data::import::estimate_capacity;
///
/// assert_eq!(estimate_capacity(Some("8"), Some("surface")), 600);
/// assert_eq!(estimate_capacity(Some(""), Some("basement")), 150);
/// assert_eq!(estimate_capacity(None, None), 100);
/// ```
#[must_use]
pub fn estimate_capacity(decks: Option<&str>, kind: Option<&str>) -> u32 {
    let from_decks = decks
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|&count| count > 0)
        .and_then(|count| count.checked_mul(LOTS_PER_DECK));
    if let Some(lots) = from_decks {
        return lots;
    }
    kind.and_then(|label| label.parse::<FacilityKind>().ok())
        .map_or(DEFAULT_CAPACITY, FacilityKind::estimated_lots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("8"), None, 600)]
    #[case(Some("1"), Some("basement"), 75)]
    #[case(Some(" 3 "), Some("surface"), 225)]
    #[case(Some("0"), Some("basement"), 150)]
    #[case(Some(""), Some("basement"), 150)]
    #[case(Some("-2"), Some("multi-storey"), 200)]
    #[case(Some("two"), Some("surface"), 100)]
    #[case(None, Some("MULTI-STOREY CAR PARK"), 200)]
    #[case(None, Some("Basement Car Park"), 150)]
    #[case(None, Some("mechanised car park"), 100)]
    #[case(None, None, 100)]
    fn applies_fallback_chain(
        #[case] decks: Option<&str>,
        #[case] kind: Option<&str>,
        #[case] expected: u32,
    ) {
        assert_eq!(estimate_capacity(decks, kind), expected);
    }

    #[rstest]
    fn overflowing_deck_count_falls_through() {
        let decks = u32::MAX.to_string();
        assert_eq!(estimate_capacity(Some(&decks), Some("basement")), 150);
    }

    #[rstest]
    #[case("multi storey", FacilityKind::MultiStorey)]
    #[case("multi_storey", FacilityKind::MultiStorey)]
    #[case("SURFACE CAR PARK", FacilityKind::Surface)]
    fn parses_kind_labels(#[case] label: &str, #[case] expected: FacilityKind) {
        assert_eq!(label.parse::<FacilityKind>(), Ok(expected));
    }

    #[rstest]
    fn unknown_kind_is_reported() {
        assert_eq!(
            "covered".parse::<FacilityKind>(),
            Err(UnknownFacilityKind("covered".to_owned()))
        );
    }
}
