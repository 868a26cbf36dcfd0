//! `farmctl status`: latest sensor readings and their trends.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::config::Config;
use crate::models::{display_value, Category, SensorSnapshot};
use crate::normalize::clean_snapshot;
use crate::sensors;
use crate::status::latest_window;
use crate::trend::{render_trends, summarize_trends, CategoryTrends};

/// Normalized snapshots plus their trend summary, as served over HTTP and
/// printed by `farmctl status --json`.
#[derive(Debug, Clone, Serialize)]
pub struct SensorReport {
    pub snapshots: Vec<SensorSnapshot>,
    pub trends: Option<Vec<CategoryTrends>>,
}

/// Build the report from raw snapshots. Trends use raw values; only the
/// displayed snapshots are normalized.
pub fn sensor_report(snapshots: &[SensorSnapshot]) -> SensorReport {
    let window = latest_window(snapshots);
    SensorReport {
        trends: summarize_trends(&window),
        snapshots: snapshots.iter().map(clean_snapshot).collect(),
    }
}

pub fn run_status(config: &Config, json: bool) -> Result<()> {
    let snapshots =
        sensors::get_latest_sensor_data(&config.sensors.log_path, config.sensors.num_entries);
    if snapshots.is_empty() {
        bail!(
            "No sensor data found. Please ensure '{}' exists and contains valid data.",
            config.sensors.log_path.display()
        );
    }

    let report = sensor_report(&snapshots);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Latest Sensor Data Summary");
    println!("==========================");
    for snap in &report.snapshots {
        println!();
        println!("Timestamp: {}", snap.timestamp);
        for category in Category::ALL {
            println!("  {}:", category.label());
            for (metric, value) in snap.readings(category) {
                println!("    {}: {}", metric, display_value(value));
            }
        }
    }

    println!();
    match &report.trends {
        Some(trends) => {
            println!("Trends and Changes Summary:");
            println!("{}", render_trends(trends));
        }
        None => println!("Trends need three readings; only {} available.", snapshots.len()),
    }
    Ok(())
}
