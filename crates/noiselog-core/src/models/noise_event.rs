// crates/noiselog-core/src/models/noise_event.rs
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{NoiseError, Result};

/// Accepted spellings of a local date-time. Seconds and fractions are optional.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A single logged noise incident.
///
/// `datetime` is the primary key and the sort key. Once stored an event is
/// never modified.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseEvent {
    /// Local date-time in canonical ISO-8601 form (`YYYY-MM-DDTHH:MM:SS`)
    pub datetime: String,
    /// Where in the dwelling the noise was heard
    pub listener: String,
    /// Where the noise came from
    pub source: String,
    /// Category or description of the noise
    pub noise: String,
    /// Free-form intensity label, e.g. `Low` or `High`
    pub severity: String,
}

impl NoiseEvent {
    pub fn new(
        datetime: impl Into<String>,
        listener: impl Into<String>,
        source: impl Into<String>,
        noise: impl Into<String>,
        severity: impl Into<String>,
    ) -> Self {
        Self {
            datetime: datetime.into(),
            listener: listener.into(),
            source: source.into(),
            noise: noise.into(),
            severity: severity.into(),
        }
    }

    pub fn field(&self, field: NoiseField) -> &str {
        match field {
            NoiseField::Listener => &self.listener,
            NoiseField::Source => &self.source,
            NoiseField::Noise => &self.noise,
            NoiseField::Severity => &self.severity,
        }
    }

    /// Check that every field is present and rewrite `datetime` into canonical form.
    pub fn validated(mut self) -> Result<Self> {
        if self.datetime.trim().is_empty() {
            return Err(NoiseError::validation("missing field 'datetime'"));
        }
        for field in NoiseField::ALL {
            if self.field(field).trim().is_empty() {
                return Err(NoiseError::validation(format!("missing field '{field}'")));
            }
        }

        let parsed = parse_local_datetime(&self.datetime)?;
        self.datetime = canonical_datetime(&parsed);
        Ok(self)
    }

    pub fn local_datetime(&self) -> Result<NaiveDateTime> {
        parse_local_datetime(&self.datetime)
    }
}

/// The free-text fields of a [`NoiseEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseField {
    Listener,
    Source,
    Noise,
    Severity,
}

impl NoiseField {
    pub const ALL: [NoiseField; 4] = [
        NoiseField::Listener,
        NoiseField::Source,
        NoiseField::Noise,
        NoiseField::Severity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoiseField::Listener => "listener",
            NoiseField::Source => "source",
            NoiseField::Noise => "noise",
            NoiseField::Severity => "severity",
        }
    }
}

impl fmt::Display for NoiseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn parse_local_datetime(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .ok_or_else(|| NoiseError::validation(format!("'{input}' is not an ISO-8601 local date-time")))
}

/// Render a date-time so that string order equals chronological order.
/// Fractional seconds are only written when non-zero.
pub fn canonical_datetime(datetime: &NaiveDateTime) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(datetime: &str) -> NoiseEvent {
        NoiseEvent::new(datetime, "Bedroom", "Neighbor TV", "Music", "High")
    }

    #[test]
    fn test_validated_canonicalizes_datetime() {
        assert_eq!(
            event("2024-01-01T09:30").validated().unwrap().datetime,
            "2024-01-01T09:30:00"
        );
        assert_eq!(
            event("2024-01-01 09:30:15").validated().unwrap().datetime,
            "2024-01-01T09:30:15"
        );
        assert_eq!(
            event("2024-01-01T09:30:15.250").validated().unwrap().datetime,
            "2024-01-01T09:30:15.250"
        );
    }

    #[test]
    fn test_validated_rejects_missing_fields() {
        let err = event("").validated().unwrap_err();
        assert_eq!(err, NoiseError::validation("missing field 'datetime'"));

        let mut missing_source = event("2024-01-01T09:30");
        missing_source.source = "  ".to_string();
        assert_eq!(
            missing_source.validated().unwrap_err(),
            NoiseError::validation("missing field 'source'")
        );
    }

    #[test]
    fn test_validated_rejects_malformed_datetime() {
        for bad in ["yesterday", "2024-13-01T00:00", "2024-01-01", "2024-01-01T25:00"] {
            let err = event(bad).validated().unwrap_err();
            assert_eq!(err.kind(), "validation", "{bad} should be rejected");
        }
    }

    #[test]
    fn test_canonical_order_is_chronological() {
        let earlier = event("2024-01-01 09:05").validated().unwrap();
        let later = event("2024-01-01T10:00:00.5").validated().unwrap();
        assert_eq!(earlier.datetime, "2024-01-01T09:05:00");
        assert_eq!(later.datetime, "2024-01-01T10:00:00.500");
        assert!(earlier.datetime < later.datetime);
    }

    #[test]
    fn test_field_accessor() {
        let e = event("2024-01-01T00:00");
        assert_eq!(e.field(NoiseField::Listener), "Bedroom");
        assert_eq!(e.field(NoiseField::Source), "Neighbor TV");
        assert_eq!(e.field(NoiseField::Noise), "Music");
        assert_eq!(e.field(NoiseField::Severity), "High");
    }

    #[test]
    fn test_field_serde_names() {
        assert_eq!(serde_json::to_value(NoiseField::Severity).unwrap(), "severity");
        let field: NoiseField = serde_json::from_value(serde_json::json!("listener")).unwrap();
        assert_eq!(field, NoiseField::Listener);
    }
}
