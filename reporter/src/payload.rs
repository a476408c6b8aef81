use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use trackkit_location::Fix;

use crate::ReportError;

/// The JSON body posted to the collector.
///
/// Built fresh from a [`Fix`] for every send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    /// Opaque device identifier.
    pub device_id: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Horizontal accuracy in whole meters, truncated toward zero.
    pub accuracy: i64,
    /// Altitude in meters.
    pub altitude: f64,
    /// Sample time, ISO-8601 in UTC.
    pub timestamp: String,
    /// Tag identifying the reporting agent, sent as `url`.
    #[serde(rename = "url", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ReportPayload {
    /// Builds the payload for `fix`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(fix: &Fix, device_id: &str, source: Option<&str>) -> Self {
        Self {
            device_id: device_id.to_string(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: fix.horizontal_accuracy.trunc() as i64,
            altitude: fix.altitude,
            timestamp: fix.sampled_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            source: source.map(ToString::to_string),
        }
    }

    /// Builds the payload for `fix`, refusing values JSON cannot carry.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if the coordinates are out of
    /// range or any measurement is NaN or infinite.
    pub fn try_new(fix: &Fix, device_id: &str, source: Option<&str>) -> Result<Self, ReportError> {
        if !fix.has_valid_coordinates() {
            return Err(ReportError::Serialization(format!(
                "invalid coordinates ({}, {})",
                fix.latitude, fix.longitude
            )));
        }
        if !fix.horizontal_accuracy.is_finite() || !fix.altitude.is_finite() {
            return Err(ReportError::Serialization(format!(
                "non-finite accuracy ({}) or altitude ({})",
                fix.horizontal_accuracy, fix.altitude
            )));
        }
        Ok(Self::new(fix, device_id, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fix(accuracy: f64) -> Fix {
        Fix {
            latitude: 37.3349,
            longitude: -122.009,
            horizontal_accuracy: accuracy,
            altitude: 12.5,
            sampled_at: Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap(),
        }
    }

    #[test]
    fn wire_format() {
        let payload = ReportPayload::new(&fix(35.9), "2162127", None);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "device_id": "2162127",
                "latitude": 37.3349,
                "longitude": -122.009,
                "accuracy": 35,
                "altitude": 12.5,
                "timestamp": "2025-03-14T15:09:26Z",
            })
        );
    }

    #[test]
    fn source_tag_is_sent_as_url() {
        let payload = ReportPayload::new(&fix(5.0), "dev", Some("macos-location-reporter"));
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["url"], "macos-location-reporter");
    }

    #[test]
    fn accuracy_truncates_toward_zero() {
        assert_eq!(ReportPayload::new(&fix(9.99), "d", None).accuracy, 9);
        assert_eq!(ReportPayload::new(&fix(-1.0), "d", None).accuracy, -1);
        assert_eq!(ReportPayload::new(&fix(0.4), "d", None).accuracy, 0);
    }

    #[test]
    fn rejects_values_json_cannot_carry() {
        assert!(ReportPayload::try_new(&fix(f64::INFINITY), "d", None).is_err());

        let mut nan_altitude = fix(5.0);
        nan_altitude.altitude = f64::NAN;
        assert!(ReportPayload::try_new(&nan_altitude, "d", None).is_err());

        let mut off_globe = fix(5.0);
        off_globe.latitude = 91.0;
        assert!(matches!(
            ReportPayload::try_new(&off_globe, "d", None),
            Err(ReportError::Serialization(_))
        ));

        assert_eq!(
            ReportPayload::try_new(&fix(-1.0), "d", None),
            Ok(ReportPayload::new(&fix(-1.0), "d", None))
        );
    }
}
