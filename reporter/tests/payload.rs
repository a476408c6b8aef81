use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use trackkit_location::Fix;
use trackkit_reporter::ReportPayload;

fn fix(latitude: f64, longitude: f64, accuracy: f64) -> Fix {
    Fix {
        latitude,
        longitude,
        horizontal_accuracy: accuracy,
        altitude: -3.25,
        sampled_at: Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap(),
    }
}

#[test]
fn payload_survives_json() {
    for fix in [
        fix(0.0, 0.0, 0.0),
        fix(-89.999_999, 179.999_999, 1_500.75),
        fix(35.689_487, 139.691_706, 65.0),
    ] {
        let payload = ReportPayload::new(&fix, "device-7", None);
        let json = serde_json::to_string(&payload).unwrap();
        let decoded: ReportPayload = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, payload);
        assert_eq!(decoded.timestamp, "2024-12-31T23:59:59Z");
        assert!(decoded.timestamp.parse::<chrono::DateTime<Utc>>().is_ok());
    }
}

#[test]
fn accuracy_is_an_integer_on_the_wire() {
    let payload = ReportPayload::new(&fix(1.0, 2.0, 12.9), "d", None);
    let value = serde_json::to_value(&payload).unwrap();

    assert!(value["accuracy"].is_i64());
    assert_eq!(value["accuracy"], 12);
    assert!(value.get("url").is_none());
}
