//! Pure value normalizers
//!
//! Image URL quality upgrade, rating text parsing and whitespace collapse.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marker separating the image id from its rendering parameters
pub const IMAGE_DELIMITER: &str = "._V1_";

/// Rendering parameters for the high-resolution poster
pub const IMAGE_TEMPLATE: &str = "QL75_UX380_CR0,0,380,562_.jpg";

/// Returned when no rating can be read
pub const NOT_AVAILABLE: &str = "N/A";

static RATING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d.])(\d\.\d)\s*/\s*10(?:$|\D)").expect("rating pattern is valid")
});

/// Rewrite everything after the delimiter with the high-resolution template.
///
/// URLs without the delimiter pass through unchanged.
pub fn upgrade_image_url(url: &str) -> String {
    upgrade_image_url_with(url, IMAGE_DELIMITER, IMAGE_TEMPLATE)
}

pub fn upgrade_image_url_with(url: &str, delimiter: &str, template: &str) -> String {
    if delimiter.is_empty() {
        return url.to_string();
    }
    match url.find(delimiter) {
        Some(pos) => format!("{}{}{}", &url[..pos], delimiter, template),
        None => url.to_string(),
    }
}

/// Parse a `D.D/10` rating out of free text, `"N/A"` if there is none
pub fn parse_rating(text: &str) -> String {
    RATING
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| format!("{}/10", m.as_str()))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Format a numeric rating the same way the text parser does
pub fn format_rating(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if (0.0..10.0).contains(&rounded) && !rounded.is_sign_negative() {
        format!("{:.1}/10", rounded)
    } else {
        NOT_AVAILABLE.to_string()
    }
}

/// Trim every fragment, drop the empty ones and join the rest
pub fn collapse_text<'a>(fragments: impl IntoIterator<Item = &'a str>, separator: &str) -> String {
    fragments
        .into_iter()
        .map(|f| f.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
        .trim()
        .to_string()
}

/// Normalizer applied to a resolved field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalizer {
    ImageUpgrade,
    Rating,
    Collapse,
}

impl Normalizer {
    /// Apply to a value; lists are normalized element-wise
    pub fn apply(self, value: Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.apply(v)).collect()),
            Value::String(s) => Value::String(self.apply_str(&s)),
            Value::Number(n) if self == Self::Rating => match n.as_f64() {
                Some(f) => Value::String(format_rating(f)),
                None => Value::String(NOT_AVAILABLE.to_string()),
            },
            other => other,
        }
    }

    fn apply_str(self, s: &str) -> String {
        match self {
            Self::ImageUpgrade => upgrade_image_url(s),
            Self::Rating => parse_rating(s),
            Self::Collapse => collapse_text(s.lines(), " "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const POSTER: &str = "https://m.media-amazon.com/images/M/MV5BMjAxMzY3NjcxNF5BMl5BanBnXkFtZTcwNTI5OTM0Mw@@._V1_QL75_UY207_CR4,0,140,207_.jpg";

    #[test]
    fn test_image_upgrade() {
        let upgraded = upgrade_image_url(POSTER);
        assert_eq!(
            upgraded,
            "https://m.media-amazon.com/images/M/MV5BMjAxMzY3NjcxNF5BMl5BanBnXkFtZTcwNTI5OTM0Mw@@._V1_QL75_UX380_CR0,0,380,562_.jpg"
        );
        assert_eq!(upgrade_image_url(&upgraded), upgraded);
        assert_eq!(
            upgrade_image_url("https://example.com/poster.jpg"),
            "https://example.com/poster.jpg"
        );
    }

    #[test]
    fn test_rating_parser() {
        assert_eq!(parse_rating("7.2/10"), "7.2/10");
        assert_eq!(parse_rating("7.2/10 (user)"), "7.2/10");
        assert_eq!(parse_rating("IMDb rating: 8.8 / 10"), "8.8/10");
        assert_eq!(parse_rating("Rated 7.2"), "N/A");
        assert_eq!(parse_rating("17.2/10"), "N/A");
        assert_eq!(parse_rating(""), "N/A");
    }

    #[test]
    fn test_numeric_ratings() {
        assert_eq!(Normalizer::Rating.apply(serde_json::json!(8.8)), serde_json::json!("8.8/10"));
        assert_eq!(Normalizer::Rating.apply(serde_json::json!(7)), serde_json::json!("7.0/10"));
        assert_eq!(Normalizer::Rating.apply(Value::Null), Value::Null);
    }

    #[test]
    fn test_numeric_ratings_near_bounds() {
        assert_eq!(format_rating(9.96), "N/A");
        assert_eq!(format_rating(9.94), "9.9/10");
        assert_eq!(format_rating(-0.0), "N/A");
        assert_eq!(format_rating(-0.04), "N/A");
        assert_eq!(format_rating(0.0), "0.0/10");
        assert_eq!(format_rating(f64::NAN), "N/A");
    }

    #[test]
    fn test_collapse() {
        assert_eq!(collapse_text(["  a ", "", "\n", " b  c "], " | "), "a | b c");
        assert_eq!(
            Normalizer::Collapse.apply(serde_json::json!(["  x\n  y ", "z"])),
            serde_json::json!(["x y", "z"])
        );
    }

    proptest! {
        #[test]
        fn prop_upgrade_matches_template_and_is_idempotent(
            prefix in "[a-zA-Z0-9/:.@_-]{0,40}",
            suffix in "[a-zA-Z0-9,_.]{0,30}",
        ) {
            let url = format!("{}{}{}", prefix, IMAGE_DELIMITER, suffix);
            let once = upgrade_image_url(&url);
            let tail = format!("{}{}", IMAGE_DELIMITER, IMAGE_TEMPLATE);
            prop_assert!(once.ends_with(&tail));
            prop_assert_eq!(upgrade_image_url(&once), once.clone());
        }

        #[test]
        fn prop_urls_without_delimiter_pass_through(url in "[a-zA-Z0-9/:.-]{0,60}") {
            prop_assume!(!url.contains(IMAGE_DELIMITER));
            prop_assert_eq!(upgrade_image_url(&url), url);
        }

        #[test]
        fn prop_rating_is_pattern_or_not_available(text in ".{0,60}") {
            let rating = parse_rating(&text);
            let shape = Regex::new(r"^\d\.\d/10$").unwrap();
            prop_assert!(rating == NOT_AVAILABLE || shape.is_match(&rating));
        }

        #[test]
        fn prop_numeric_rating_is_pattern_or_not_available(value in proptest::num::f64::ANY) {
            let shape = Regex::new(r"^\d\.\d/10$").unwrap();
            let Value::String(rating) = Normalizer::Rating.apply(Value::from(value)) else {
                // non-finite floats have no JSON number form and stay null
                prop_assert!(!value.is_finite());
                return Ok(());
            };
            prop_assert!(rating == NOT_AVAILABLE || shape.is_match(&rating), "{} -> {}", value, rating);
        }
    }
}
