//! # Value Coercion
//!
//! Converts raw property strings to typed configuration values.
//!
//! The open, extensible surface is the [`FromConfigValue`] trait: any type
//! used as a setter parameter implements it, and custom implementations
//! take precedence over everything built in (a bespoke encoding on an enum
//! simply does not call [`parse_enum_variant`]). The built-in
//! implementations cover the closed set of primitives, URLs, paths, and
//! container kinds.
//!
//! Error texts deliberately avoid echoing the raw value; the binding
//! engine formats invalid-value diagnostics itself so that
//! security-sensitive values can be redacted.

use std::collections::{BTreeSet, HashSet};
use std::hash::Hash;
use std::path::PathBuf;

use errors::CoerceError;
use url::Url;

/// Conversion from a raw configuration string to a typed value.
pub trait FromConfigValue: Sized {
    fn from_config_value(raw: &str) -> Result<Self, CoerceError>;
}

impl FromConfigValue for String {
    fn from_config_value(raw: &str) -> Result<Self, CoerceError> {
        Ok(raw.to_string())
    }
}

/// Strictly `true` or `false`, case-insensitive. Whitespace is not trimmed
/// and shorthand spellings (`1`, `yes`) are rejected.
impl FromConfigValue for bool {
    fn from_config_value(raw: &str) -> Result<Self, CoerceError> {
        if raw.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(CoerceError::Invalid {
                target: "bool",
                reason: "expected true or false".to_string()
            })
        }
    }
}

macro_rules! from_config_value_via_parse {
    ($($target:ty),* $(,)?) => {
        $(
            impl FromConfigValue for $target {
                fn from_config_value(raw: &str) -> Result<Self, CoerceError> {
                    raw.parse::<$target>().map_err(|error| CoerceError::Invalid {
                        target: stringify!($target),
                        reason: error.to_string()
                    })
                }
            }
        )*
    };
}

from_config_value_via_parse!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);

impl FromConfigValue for Url {
    fn from_config_value(raw: &str) -> Result<Self, CoerceError> {
        raw.parse::<Url>().map_err(|error| CoerceError::Invalid {
            target: "Url",
            reason: error.to_string()
        })
    }
}

impl FromConfigValue for PathBuf {
    fn from_config_value(raw: &str) -> Result<Self, CoerceError> {
        Ok(PathBuf::from(raw))
    }
}

/// A present value coerced from the raw string. A key that is set to an
/// unrepresentable value is an error, not an absent optional.
impl<V: FromConfigValue> FromConfigValue for Option<V> {
    fn from_config_value(raw: &str) -> Result<Self, CoerceError> {
        V::from_config_value(raw).map(Some)
    }
}

impl<V: FromConfigValue> FromConfigValue for Vec<V> {
    fn from_config_value(raw: &str) -> Result<Self, CoerceError> {
        split_values(raw).map(V::from_config_value).collect()
    }
}

impl<V: FromConfigValue + Eq + Hash> FromConfigValue for HashSet<V> {
    fn from_config_value(raw: &str) -> Result<Self, CoerceError> {
        split_values(raw).map(V::from_config_value).collect()
    }
}

impl<V: FromConfigValue + Ord> FromConfigValue for BTreeSet<V> {
    fn from_config_value(raw: &str) -> Result<Self, CoerceError> {
        split_values(raw).map(V::from_config_value).collect()
    }
}

/// Splits a list-valued property: comma-separated, each piece trimmed,
/// empty pieces dropped.
pub fn split_values(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|piece| !piece.is_empty())
}

/// Fuzzy variant lookup for enum implementations of [`FromConfigValue`].
///
/// The raw value has `-` replaced with `_` and is then compared
/// case-insensitively against the declared variant names. Exactly one
/// match wins; none or several fail.
///
/// ```
/// use binding::parse_enum_variant;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Level { Info, Warn }
///
/// let level = parse_enum_variant("warn", &[("INFO", Level::Info), ("WARN", Level::Warn)]);
/// assert_eq!(level.unwrap(), Level::Warn);
/// ```
pub fn parse_enum_variant<T: Clone>(
    raw: &str,
    variants: &[(&str, T)],
) -> Result<T, CoerceError> {
    let normalized = raw.replace('-', "_");
    let mut matched: Option<&T> = None;
    for (name, value) in variants {
        if name.eq_ignore_ascii_case(&normalized) {
            if matched.is_some() {
                return Err(CoerceError::Ambiguous {
                    target: std::any::type_name::<T>()
                });
            }
            matched = Some(value);
        }
    }
    matched.cloned().ok_or(CoerceError::NoMatch {
        target: std::any::type_name::<T>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Level {
        Info,
        Warn,
        Error
    }

    const LEVELS: &[(&str, Level)] = &[
        ("INFO", Level::Info),
        ("WARN", Level::Warn),
        ("ERROR", Level::Error),
    ];

    #[test]
    fn test_string_passes_through() {
        assert_eq!(String::from_config_value("  raw ").unwrap(), "  raw ");
    }

    #[test]
    fn test_bool_is_case_insensitive() {
        assert!(bool::from_config_value("TRUE").unwrap());
        assert!(bool::from_config_value("True").unwrap());
        assert!(!bool::from_config_value("false").unwrap());
    }

    #[test]
    fn test_bool_rejects_whitespace_and_shorthand() {
        assert!(bool::from_config_value("true ").is_err());
        assert!(bool::from_config_value(" false").is_err());
        assert!(bool::from_config_value("1").is_err());
        assert!(bool::from_config_value("yes").is_err());
        assert!(bool::from_config_value("").is_err());
    }

    #[test]
    fn test_integral_parse() {
        assert_eq!(i32::from_config_value("8080").unwrap(), 8080);
        assert_eq!(u64::from_config_value("0").unwrap(), 0);
        assert_eq!(i8::from_config_value("-5").unwrap(), -5);
        assert!(i32::from_config_value("8080x").is_err());
        assert!(u8::from_config_value("256").is_err());
    }

    #[test]
    fn test_float_parse() {
        assert_eq!(f64::from_config_value("0.25").unwrap(), 0.25);
        assert!(f32::from_config_value("a quarter").is_err());
    }

    #[test]
    fn test_url_parse() {
        let url = Url::from_config_value("http://example.com:8080/base").unwrap();
        assert_eq!(url.port(), Some(8080));
        assert!(Url::from_config_value("not a url").is_err());
    }

    #[test]
    fn test_enum_fuzzy_match() {
        assert_eq!(parse_enum_variant("Warn", LEVELS).unwrap(), Level::Warn);
        assert_eq!(parse_enum_variant("error", LEVELS).unwrap(), Level::Error);
    }

    #[test]
    fn test_enum_dash_is_underscore() {
        let variants = &[("READ_ONLY", 0), ("READ_WRITE", 1)];
        assert_eq!(parse_enum_variant("read-only", variants).unwrap(), 0);
    }

    #[test]
    fn test_enum_no_match_fails() {
        assert!(matches!(
            parse_enum_variant("verbose", LEVELS),
            Err(CoerceError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_enum_ambiguous_match_fails() {
        let variants = &[("VALUE", 0), ("value", 1)];
        assert!(matches!(
            parse_enum_variant("Value", variants),
            Err(CoerceError::Ambiguous { .. })
        ));
    }

    #[test]
    fn test_list_preserves_order_and_duplicates() {
        let values: Vec<String> = Vec::from_config_value("a, b ,,c,a").unwrap();
        assert_eq!(values, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_set_deduplicates() {
        let values: HashSet<i32> = HashSet::from_config_value("1, 2, 1").unwrap();
        assert_eq!(values.len(), 2);
        assert!(values.contains(&1));
        assert!(values.contains(&2));
    }

    #[test]
    fn test_collection_element_failure_propagates() {
        let result: Result<Vec<i32>, _> = Vec::from_config_value("1,two,3");
        assert!(result.is_err());
    }

    #[test]
    fn test_option_wraps_present_value() {
        assert_eq!(Option::<u16>::from_config_value("8080").unwrap(), Some(8080));
    }

    #[test]
    fn test_option_propagates_inner_failure() {
        assert!(Option::<u16>::from_config_value("eighty").is_err());
    }

    #[test]
    fn test_splitter_drops_empty_pieces() {
        let pieces: Vec<&str> = split_values(" , a , , b,").collect();
        assert_eq!(pieces, vec!["a", "b"]);
    }
}
