//! Canonical timestamp representation.
//!
//! Every date stored on a canonical record is a UTC wall-clock time rendered
//! as `YYYY-MM-DD HH:MM:SS`. Records hold [`NaiveDateTime`] values and use the
//! serde helpers here so that serialized output matches the storage format.

use chrono::NaiveDateTime;

/// `strftime` pattern of the canonical storage format.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a timestamp in the canonical storage format.
#[must_use]
pub fn to_canonical(value: &NaiveDateTime) -> String {
    value.format(CANONICAL_FORMAT).to_string()
}

/// Parse a timestamp already in the canonical storage format.
///
/// # Errors
///
/// Returns `chrono::ParseError` if the input is not `YYYY-MM-DD HH:MM:SS`.
pub fn from_canonical(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, CANONICAL_FORMAT)
}

/// Serde helpers for `Option<NaiveDateTime>` fields in canonical format.
pub mod option {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_some(&super::to_canonical(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| super::from_canonical(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Serde helpers for required `NaiveDateTime` fields in canonical format.
pub mod required {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::to_canonical(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::from_canonical(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_format() {
        let dt = from_canonical("2016-01-05 14:20:36").unwrap();
        assert_eq!(to_canonical(&dt), "2016-01-05 14:20:36");
    }

    #[test]
    fn test_rejects_iso_t_separator() {
        assert!(from_canonical("2016-01-05T14:20:36").is_err());
    }
}
