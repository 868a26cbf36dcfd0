//! Trend summarization over the three most recent sensor snapshots.
//!
//! Direction is decided from the endpoints only: the oldest and newest
//! values are compared and the middle value is carried along for display.
//! Numeric readings (after stripping `°C`, `NTU`, and `%`) are classified as
//! increased/decreased/stable; anything else is compared as a raw value and
//! reported as changed/unchanged.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::models::{display_value, Category, SensorSnapshot};

/// Unit suffixes stripped before numeric parsing.
const UNIT_SUFFIXES: [&str; 3] = ["°C", "NTU", "%"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increased,
    Decreased,
    Stable,
    Changed,
    Unchanged,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Increased => "increased",
            Trend::Decreased => "decreased",
            Trend::Stable => "remained stable",
            Trend::Changed => "changed",
            Trend::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

impl Trend {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Trend::Increased | Trend::Decreased | Trend::Stable)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricTrend {
    pub metric: String,
    pub trend: Trend,
    /// Oldest, middle, newest, as displayed.
    pub values: [String; 3],
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryTrends {
    pub category: &'static str,
    pub metrics: Vec<MetricTrend>,
}

/// Parse a reading as a number after removing known unit suffixes.
pub fn parse_numeric(value: &Value) -> Option<f64> {
    if let Value::Number(n) = value {
        return n.as_f64();
    }
    let mut text = display_value(value);
    for suffix in UNIT_SUFFIXES {
        text = text.replace(suffix, "");
    }
    text.trim().parse::<f64>().ok()
}

/// Classify one metric from its three samples, oldest first.
pub fn classify(oldest: &Value, middle: &Value, newest: &Value) -> Trend {
    match (
        parse_numeric(oldest),
        parse_numeric(middle),
        parse_numeric(newest),
    ) {
        (Some(first), Some(_), Some(last)) => {
            if last > first {
                Trend::Increased
            } else if last < first {
                Trend::Decreased
            } else {
                Trend::Stable
            }
        }
        _ => {
            if oldest != newest {
                Trend::Changed
            } else {
                Trend::Unchanged
            }
        }
    }
}

/// Summarize trends for every metric present in the newest snapshot.
///
/// Returns `None` unless exactly three snapshots (oldest first) are given.
/// A metric absent from an older snapshot counts as `null` there.
pub fn summarize_trends(snapshots: &[SensorSnapshot]) -> Option<Vec<CategoryTrends>> {
    let [oldest, middle, newest] = snapshots else {
        return None;
    };

    let summary = Category::ALL
        .iter()
        .map(|&category| {
            let metrics = newest
                .readings(category)
                .iter()
                .map(|(metric, v3)| {
                    let v1 = oldest.readings(category).get(metric).unwrap_or(&Value::Null);
                    let v2 = middle.readings(category).get(metric).unwrap_or(&Value::Null);
                    MetricTrend {
                        metric: metric.clone(),
                        trend: classify(v1, v2, v3),
                        values: [display_value(v1), display_value(v2), display_value(v3)],
                    }
                })
                .collect();
            CategoryTrends {
                category: category.key(),
                metrics,
            }
        })
        .collect();

    Some(summary)
}

impl fmt::Display for MetricTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = &self.values;
        if self.trend.is_numeric() {
            write!(f, "{}: {} (from {} → {} → {})", self.metric, self.trend, a, b, c)
        } else {
            write!(
                f,
                "{}: {} (from '{}' → '{}' → '{}')",
                self.metric, self.trend, a, b, c
            )
        }
    }
}

/// Render trends as the line-oriented block used in prompts.
pub fn render_trends(trends: &[CategoryTrends]) -> String {
    let mut lines = Vec::new();
    for group in trends {
        let label = Category::ALL
            .iter()
            .find(|c| c.key() == group.category)
            .map(|c| c.label())
            .unwrap_or(group.category);
        lines.push(format!("\n{} Trends:", label));
        for metric in &group.metrics {
            lines.push(format!("  {}", metric));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(ts: &str, soil: Value, environment: Value) -> SensorSnapshot {
        serde_json::from_value(json!({
            "timestamp": ts,
            "soil": soil,
            "water": {},
            "environment": environment,
        }))
        .unwrap()
    }

    fn find<'a>(trends: &'a [CategoryTrends], category: &str, metric: &str) -> &'a MetricTrend {
        trends
            .iter()
            .find(|c| c.category == category)
            .and_then(|c| c.metrics.iter().find(|m| m.metric == metric))
            .unwrap()
    }

    #[test]
    fn rising_temperature_is_increased() {
        let snaps = vec![
            snapshot("t1", json!({"temperature": "20°C"}), json!({})),
            snapshot("t2", json!({"temperature": "22°C"}), json!({})),
            snapshot("t3", json!({"temperature": "25°C"}), json!({})),
        ];
        let trends = summarize_trends(&snaps).unwrap();
        let t = find(&trends, "soil", "temperature");
        assert_eq!(t.trend, Trend::Increased);
        assert_eq!(
            t.to_string(),
            "temperature: increased (from 20°C → 22°C → 25°C)"
        );
    }

    #[test]
    fn middle_value_is_ignored_for_direction() {
        assert_eq!(
            classify(&json!("30%"), &json!("10%"), &json!("35%")),
            Trend::Increased
        );
        assert_eq!(
            classify(&json!("5 NTU"), &json!("50 NTU"), &json!("5 NTU")),
            Trend::Stable
        );
        assert_eq!(
            classify(&json!(7.1), &json!(9.0), &json!(6.4)),
            Trend::Decreased
        );
    }

    #[test]
    fn categorical_rainfall_round_trip_is_unchanged() {
        let snaps = vec![
            snapshot("t1", json!({}), json!({"rainfall": "None"})),
            snapshot("t2", json!({}), json!({"rainfall": "Light"})),
            snapshot("t3", json!({}), json!({"rainfall": "None"})),
        ];
        let trends = summarize_trends(&snaps).unwrap();
        let t = find(&trends, "environment", "rainfall");
        assert_eq!(t.trend, Trend::Unchanged);
        assert_eq!(
            t.to_string(),
            "rainfall: unchanged (from 'None' → 'Light' → 'None')"
        );
    }

    #[test]
    fn categorical_difference_is_changed() {
        assert_eq!(
            classify(&json!("None"), &json!("None"), &json!("Heavy")),
            Trend::Changed
        );
    }

    #[test]
    fn one_unparseable_sample_falls_back_to_categorical() {
        assert_eq!(
            classify(&json!("20°C"), &json!("error"), &json!("20°C")),
            Trend::Unchanged
        );
    }

    #[test]
    fn metric_missing_in_oldest_counts_as_changed() {
        let snaps = vec![
            snapshot("t1", json!({}), json!({})),
            snapshot("t2", json!({}), json!({})),
            snapshot("t3", json!({"nitrogen": "12"}), json!({})),
        ];
        let trends = summarize_trends(&snaps).unwrap();
        assert_eq!(find(&trends, "soil", "nitrogen").trend, Trend::Changed);
    }

    #[test]
    fn requires_exactly_three_snapshots() {
        let snap = snapshot("t1", json!({"temperature": "20°C"}), json!({}));
        assert!(summarize_trends(&[snap.clone(), snap.clone()]).is_none());
        assert!(summarize_trends(&[snap.clone(), snap.clone(), snap.clone(), snap]).is_none());
    }

    #[test]
    fn render_groups_by_category() {
        let snaps = vec![
            snapshot("t1", json!({"moisture": "40%"}), json!({"rainfall": "None"})),
            snapshot("t2", json!({"moisture": "38%"}), json!({"rainfall": "None"})),
            snapshot("t3", json!({"moisture": "35%"}), json!({"rainfall": "None"})),
        ];
        let text = render_trends(&summarize_trends(&snaps).unwrap());
        assert!(text.contains("\nSoil Trends:\n  moisture: decreased (from 40% → 38% → 35%)"));
        assert!(text.contains("\nWater Trends:"));
        assert!(text.contains("rainfall: unchanged"));
    }
}
