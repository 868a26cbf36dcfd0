//! Display normalization for sensor readings.

use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use crate::models::{Readings, SensorSnapshot};

const NO_RAINFALL: &str = "No rainfall";

/// Normalize a reading for display.
///
/// A literal `none` (any case, surrounding whitespace ignored) becomes
/// `No rainfall`; everything else is NFKC-normalized.
pub fn clean_text(text: &str) -> String {
    if text.trim().eq_ignore_ascii_case("none") {
        return NO_RAINFALL.to_string();
    }
    text.nfkc().collect()
}

/// Apply [`clean_text`] to every value of a readings map.
///
/// Only strings are normalized. Numbers, booleans and `null` pass through,
/// so an offline sensor stays `null` rather than reading as rainfall.
pub fn clean_readings(readings: &Readings) -> Readings {
    readings
        .iter()
        .map(|(k, v)| {
            let cleaned = match v {
                Value::String(s) => Value::String(clean_text(s)),
                other => other.clone(),
            };
            (k.clone(), cleaned)
        })
        .collect()
}

/// A copy of `snapshot` with every category map cleaned for display.
pub fn clean_snapshot(snapshot: &SensorSnapshot) -> SensorSnapshot {
    SensorSnapshot {
        timestamp: snapshot.timestamp.clone(),
        soil: clean_readings(&snapshot.soil),
        water: clean_readings(&snapshot.water),
        environment: clean_readings(&snapshot.environment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn none_maps_to_no_rainfall() {
        assert_eq!(clean_text("none"), "No rainfall");
        assert_eq!(clean_text("None"), "No rainfall");
        assert_eq!(clean_text("  NONE \t"), "No rainfall");
    }

    #[test]
    fn other_strings_are_composed() {
        // "e" + combining acute accent composes to a single code point.
        assert_eq!(clean_text("Cafe\u{301}"), "Caf\u{e9}");
        assert_eq!(clean_text("23.5°C"), "23.5°C");
        assert_eq!(clean_text("Light"), "Light");
        assert_eq!(clean_text("nonexistent"), "nonexistent");
    }

    #[test]
    fn compatibility_forms_are_folded() {
        // Fullwidth digits fold to ASCII under NFKC.
        assert_eq!(clean_text("\u{ff12}\u{ff10}%"), "20%");
    }

    #[test]
    fn readings_are_cleaned_value_by_value() {
        let readings = json!({"rainfall": "None", "ph": 6.8, "sensor": null})
            .as_object()
            .unwrap()
            .clone();
        let cleaned = clean_readings(&readings);
        assert_eq!(cleaned["rainfall"], json!("No rainfall"));
        assert_eq!(cleaned["ph"], json!(6.8));
        assert_eq!(cleaned["sensor"], Value::Null);
    }

    #[test]
    fn offline_sensor_is_not_reported_as_rainfall() {
        let snap: SensorSnapshot = serde_json::from_value(json!({
            "timestamp": "2024-06-01 10:00",
            "soil": {"ph": null, "moisture": "31%"},
            "water": {"turbidity": null},
            "environment": {"rainfall": "none"}
        }))
        .unwrap();
        let cleaned = clean_snapshot(&snap);
        assert_eq!(cleaned.soil["ph"], Value::Null);
        assert_eq!(cleaned.soil["moisture"], json!("31%"));
        assert_eq!(cleaned.water["turbidity"], Value::Null);
        assert_eq!(cleaned.environment["rainfall"], json!("No rainfall"));
    }
}
