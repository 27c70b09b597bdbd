//! Value Record - the on-disk shape of one parameter or metric

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Render a UTC instant as ISO-8601 with microseconds and a trailing `Z`.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use trueno_track::experiment::format_timestamp;
///
/// let ts = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
/// assert_eq!(format_timestamp(ts), "2025-01-15T12:00:00.000000Z");
/// ```
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Value Record is the content of a `params/{key}.json` or
/// `metrics/{key}.json` file.
///
/// The key itself is not stored; it is the file stem. Rewriting a key
/// replaces the whole record, so `timestamp` is always the time of the
/// most recent write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueRecord {
    value: Value,
    timestamp: String,
}

impl ValueRecord {
    /// Create a new record stamped with the current time.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self::builder(value).build()
    }

    /// Create a builder for constructing a record with an explicit timestamp.
    #[must_use]
    pub fn builder(value: Value) -> ValueRecordBuilder {
        ValueRecordBuilder::new(value)
    }

    /// Get the logged value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Consume the record, returning the logged value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Get the write timestamp (ISO-8601, `Z`-suffixed).
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// Builder for `ValueRecord`.
#[derive(Debug)]
pub struct ValueRecordBuilder {
    value: Value,
    timestamp: DateTime<Utc>,
}

impl ValueRecordBuilder {
    /// Create a new builder stamped with the current time.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            timestamp: Utc::now(),
        }
    }

    /// Set a custom timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Build the `ValueRecord`.
    #[must_use]
    pub fn build(self) -> ValueRecord {
        ValueRecord {
            value: self.value,
            timestamp: format_timestamp(self.timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_timestamp_is_z_suffixed() {
        let record = ValueRecord::new(json!(0.5));
        assert!(record.timestamp().ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(record.timestamp()).is_ok());
    }

    #[test]
    fn test_wire_shape() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let record = ValueRecord::builder(json!({"layers": [64, 32]}))
            .timestamp(ts)
            .build();

        let encoded = serde_json::to_value(&record).unwrap();
        assert_eq!(
            encoded,
            json!({
                "value": {"layers": [64, 32]},
                "timestamp": "2025-01-15T12:00:00.000000Z"
            })
        );
    }
}
