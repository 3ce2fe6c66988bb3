//! Season classification of a product's season attribute.

use serde::{Deserialize, Serialize};

/// Season of a tyre, as far as background/icon selection is concerned.
///
/// `Unspecified` covers missing or unrecognised values and maps to the summer
/// background with the generic icon, so every product still gets a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Summer,
    Winter,
    AllSeason,
    Unspecified,
}

impl Season {
    /// Case-insensitive match on the catalog's attribute value.
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "летняя" | "summer" => Season::Summer,
            "зимняя" | "winter" => Season::Winter,
            "всесезонная" | "all-season" | "all season" | "allseason" => Season::AllSeason,
            _ => Season::Unspecified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::summer("летняя", Season::Summer)]
    #[case::summer_upper("ЛЕТНЯЯ", Season::Summer)]
    #[case::winter(" Зимняя ", Season::Winter)]
    #[case::all_season("Всесезонная", Season::AllSeason)]
    #[case::english("Winter", Season::Winter)]
    #[case::empty("", Season::Unspecified)]
    #[case::unknown("демисезонная", Season::Unspecified)]
    fn classifies_attribute_values(#[case] raw: &str, #[case] expected: Season) {
        assert_eq!(Season::classify(raw), expected);
    }
}
