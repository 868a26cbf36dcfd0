//! Sensor status block for the `{sensor_status}` prompt slot.

use std::collections::BTreeMap;

use crate::models::{display_value, Category, SensorSnapshot};
use crate::trend::{render_trends, summarize_trends};

/// Number of snapshots rendered and compared.
pub const STATUS_WINDOW: usize = 3;

/// Order snapshots by timestamp and keep the most recent [`STATUS_WINDOW`].
///
/// Timestamps compare as strings. When two snapshots share a timestamp the
/// later one in the input wins.
pub fn latest_window(snapshots: &[SensorSnapshot]) -> Vec<SensorSnapshot> {
    let by_time: BTreeMap<&str, &SensorSnapshot> = snapshots
        .iter()
        .map(|s| (s.timestamp.as_str(), s))
        .collect();
    let ordered: Vec<SensorSnapshot> = by_time.into_values().cloned().collect();
    let start = ordered.len().saturating_sub(STATUS_WINDOW);
    ordered[start..].to_vec()
}

/// Render readings and trends as plain text for the language model.
pub fn render_sensor_status(snapshots: &[SensorSnapshot]) -> String {
    if snapshots.is_empty() {
        return "No sensor data available.".to_string();
    }

    let window = latest_window(snapshots);
    let mut lines = vec![format!("Sensor Data (latest {} readings):", STATUS_WINDOW)];
    for snap in &window {
        lines.push(format!("\nTimestamp: {}", snap.timestamp));
        for category in Category::ALL {
            lines.push(format!("{}:", category.label()));
            for (metric, value) in snap.readings(category) {
                lines.push(format!("  {}: {}", metric, display_value(value)));
            }
        }
    }

    lines.push("\nTrends and Changes Summary:".to_string());
    if let Some(trends) = summarize_trends(&window) {
        lines.push(render_trends(&trends));
    }

    lines.join("\n")
}
