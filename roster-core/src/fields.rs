//! Single-line value extractors
//!
//! These are the leaves of the scanner: each one looks at one line of model
//! output and pulls a value out of it. None of them fail; a line that does not
//! carry the value yields `None`, an empty list, or the caller's default.

use regex::Regex;
use std::sync::LazyLock;

/// Separators accepted between a label and its value
const SEPARATORS: [char; 2] = [':', '-'];

// Leading decimal number, the way a lenient float parse reads "8 weeks"
static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)").unwrap()
});

/// Extract the value that follows `label:` or `label-` on a line.
///
/// Only the first occurrence of the label that is immediately followed by a
/// separator is used; the value runs to the end of the line and is trimmed.
pub fn extract_field(line: &str, label: &str) -> Option<String> {
    if label.is_empty() {
        return None;
    }

    line.match_indices(label).find_map(|(idx, _)| {
        let rest = &line[idx + label.len()..];
        rest.strip_prefix(SEPARATORS)
            .map(|value| value.trim().to_string())
    })
}

/// Split the text after the first `:` on commas.
///
/// Items are trimmed and empty items dropped. A line with no `:` has no list.
/// Commas inside a single item ("Acme, Inc.") split that item.
pub fn extract_list(line: &str) -> Vec<String> {
    let Some((_, rest)) = line.split_once(':') else {
        return Vec::new();
    };

    rest.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the leading number of a value ("8 weeks" -> 8.0).
pub fn parse_number(value: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(value.trim())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Resolve a free-text value against a closed set of options.
///
/// The value is lowercased and the first option (in declared order) it
/// contains wins; otherwise `default` is returned.
pub fn match_choice(value: &str, options: &[&str], default: &str) -> String {
    let lowered = value.to_lowercase();

    options
        .iter()
        .find(|option| lowered.contains(&option.to_lowercase()))
        .map(|option| option.to_string())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_field_colon_and_dash() {
        assert_eq!(
            extract_field("Severity: high", "Severity").as_deref(),
            Some("high")
        );
        assert_eq!(
            extract_field("Owner- platform team ", "Owner").as_deref(),
            Some("platform team")
        );
    }

    #[test]
    fn test_extract_field_absent_label() {
        assert_eq!(extract_field("Description: something", "Impact"), None);
        assert_eq!(extract_field("", "Impact"), None);
        // Label present but not followed by a separator
        assert_eq!(extract_field("Impact is unclear", "Impact"), None);
    }

    #[test]
    fn test_extract_field_first_occurrence_wins() {
        let value = extract_field("Note: first Note: second", "Note");
        assert_eq!(value.as_deref(), Some("first Note: second"));
    }

    #[test]
    fn test_extract_field_skips_unseparated_occurrence() {
        let value = extract_field("Impact Impact: high", "Impact");
        assert_eq!(value.as_deref(), Some("high"));
    }

    #[test]
    fn test_extract_list() {
        assert_eq!(extract_list("Label: a, b, c"), vec!["a", "b", "c"]);
        assert!(extract_list("Label:").is_empty());
        assert!(extract_list("Label: , ,").is_empty());
        assert!(extract_list("no separator here").is_empty());
    }

    #[test]
    fn test_extract_list_splits_embedded_commas() {
        // Known limitation: a comma inside one logical item splits it.
        assert_eq!(
            extract_list("Vendors: Acme, Inc., Globex"),
            vec!["Acme", "Inc.", "Globex"]
        );
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("8 weeks"), Some(8.0));
        assert_eq!(parse_number(" 2.5"), Some(2.5));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number("about 5"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_match_choice() {
        let options = ["low", "medium", "high"];
        assert_eq!(match_choice("High", &options, "medium"), "high");
        assert_eq!(match_choice("LOW - unlikely", &options, "medium"), "low");
        assert_eq!(match_choice("severe", &options, "medium"), "medium");
    }
}
