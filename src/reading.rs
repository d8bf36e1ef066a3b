use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One simulated power production sample.
///
/// This struct is both the wire body published to the broker and the element
/// type of the output document, so the two always carry the identical value.
/// The timestamp serializes as an ISO-8601 string; the power is rounded to
/// two decimal places at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub power_watts: f64,
}

impl Reading {
    /// Creates a reading with the power rounded to centiwatt precision.
    ///
    /// Callers are responsible for supplying a finite, non-negative power;
    /// the generator guarantees both.
    pub fn new(timestamp: DateTime<Utc>, power_watts: f64) -> Self {
        debug_assert!(
            power_watts.is_finite() && power_watts >= 0.0,
            "power must be a non-negative finite number, got {}",
            power_watts
        );
        Self {
            timestamp,
            power_watts: round_to_centiwatts(power_watts),
        }
    }
}

fn round_to_centiwatts(power_watts: f64) -> f64 {
    (power_watts * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap()
    }

    #[test]
    fn power_is_rounded_to_two_decimals() {
        assert_eq!(Reading::new(noon(), 1234.5678).power_watts, 1234.57);
        assert_eq!(Reading::new(noon(), 0.004).power_watts, 0.0);
        assert_eq!(Reading::new(noon(), 0.005).power_watts, 0.01);
    }

    #[test]
    fn serializes_timestamp_as_iso_8601() {
        let reading = Reading::new(noon(), 1500.0);
        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"timestamp\":\"2024-06-21T12:00:00Z\""));
        assert!(json.contains("\"power_watts\":1500.0"));
    }

    #[test]
    fn wire_body_round_trips() {
        let reading = Reading::new(noon(), 2750.25);
        let json = serde_json::to_vec(&reading).unwrap();
        let decoded: Reading = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded, reading);
    }
}
