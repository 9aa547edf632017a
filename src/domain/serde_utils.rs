//! Serde utilities for wire payloads.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;

/// Module to handle ids that might arrive as strings or numbers.
pub mod id_string {
    use super::{Deserializer, Serializer, Visitor, de, fmt};

    /// Serializes an id as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the serializer fails.
    pub fn serialize<S>(value: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    /// Deserializes an id from a string or integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is neither a string nor an integer.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StringOrIntVisitor;

        impl Visitor<'_> for StringOrIntVisitor {
            type Value = String;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer id")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(value.to_string())
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(value.to_string())
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if value.is_empty() {
                    return Err(de::Error::custom("id must not be empty"));
                }
                Ok(value.to_string())
            }
        }

        deserializer.deserialize_any(StringOrIntVisitor)
    }

    /// Module to handle optional ids.
    pub mod option {
        use super::{Deserializer, Serializer, Visitor, de, fmt};

        /// Serializes an optional id.
        ///
        /// # Errors
        ///
        /// Returns an error if the serializer fails.
        #[allow(clippy::ref_option)]
        pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(v) => super::serialize(v, serializer),
                None => serializer.serialize_none(),
            }
        }

        /// Deserializes an optional id from a string or number.
        ///
        /// # Errors
        ///
        /// Returns an error if deserialization fails.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
        where
            D: Deserializer<'de>,
        {
            struct OptionVisitor;

            impl<'de> Visitor<'de> for OptionVisitor {
                type Value = Option<String>;

                fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                    formatter.write_str("optional id")
                }

                fn visit_none<E>(self) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(None)
                }

                fn visit_unit<E>(self) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(None)
                }

                fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
                where
                    D: Deserializer<'de>,
                {
                    super::deserialize(deserializer).map(Some)
                }
            }
            deserializer.deserialize_option(OptionVisitor)
        }
    }
}

/// Module to handle timestamps sent as RFC 3339 strings or epoch milliseconds.
pub mod timestamp {
    use super::{Deserializer, Serializer, Visitor, de, fmt};
    use chrono::{DateTime, Utc};

    /// Serializes a timestamp as RFC 3339.
    ///
    /// # Errors
    ///
    /// Returns an error if the serializer fails.
    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    /// Deserializes a timestamp from an RFC 3339 string or epoch milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be interpreted as a timestamp.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TimestampVisitor;

        impl Visitor<'_> for TimestampVisitor {
            type Value = DateTime<Utc>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an RFC 3339 string or epoch milliseconds")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                DateTime::from_timestamp_millis(value)
                    .ok_or_else(|| de::Error::custom("timestamp out of range"))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let millis = i64::try_from(value).map_err(de::Error::custom)?;
                self.visit_i64(millis)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                DateTime::parse_from_rfc3339(value)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(TimestampVisitor)
    }

    /// Module to handle optional timestamps.
    pub mod option {
        use super::{DateTime, Deserializer, Serializer, Utc, Visitor, de, fmt};

        /// Serializes an optional timestamp.
        ///
        /// # Errors
        ///
        /// Returns an error if the serializer fails.
        #[allow(clippy::ref_option)]
        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(v) => super::serialize(v, serializer),
                None => serializer.serialize_none(),
            }
        }

        /// Deserializes an optional timestamp.
        ///
        /// # Errors
        ///
        /// Returns an error if deserialization fails.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            struct OptionVisitor;

            impl<'de> Visitor<'de> for OptionVisitor {
                type Value = Option<DateTime<Utc>>;

                fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                    formatter.write_str("optional timestamp")
                }

                fn visit_none<E>(self) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(None)
                }

                fn visit_unit<E>(self) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(None)
                }

                fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
                where
                    D: Deserializer<'de>,
                {
                    super::deserialize(deserializer).map(Some)
                }
            }
            deserializer.deserialize_option(OptionVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(with = "super::id_string")]
        id: String,
        #[serde(default, with = "super::id_string::option")]
        parent: Option<String>,
        #[serde(with = "super::timestamp")]
        at: DateTime<Utc>,
        #[serde(default, with = "super::timestamp::option")]
        edited: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_numeric_id_and_millis() {
        let probe: Probe = serde_json::from_str(r#"{"id": 42, "at": 100200}"#).unwrap();
        assert_eq!(probe.id, "42");
        assert_eq!(probe.at.timestamp_millis(), 100_200);
        assert!(probe.parent.is_none());
        assert!(probe.edited.is_none());
    }

    #[test]
    fn test_string_id_and_rfc3339() {
        let probe: Probe = serde_json::from_str(
            r#"{"id": "srv_1", "parent": 7, "at": "2024-01-01T00:00:00Z", "edited": null}"#,
        )
        .unwrap();
        assert_eq!(probe.id, "srv_1");
        assert_eq!(probe.parent.as_deref(), Some("7"));
        assert_eq!(probe.at.timestamp(), 1_704_067_200);
        assert!(probe.edited.is_none());
    }

    #[test]
    fn test_rejects_empty_id() {
        let result = serde_json::from_str::<Probe>(r#"{"id": "", "at": 1}"#);
        assert!(result.is_err());
    }
}
