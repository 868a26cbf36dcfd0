//! Core data models used throughout the farm assistant.
//!
//! Sensor snapshots come from the JSON sensor log, chunks from the PDF
//! indexing pipeline, and conversation entries from the interactive shells.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sensor readings grouped by category. Keys keep their file order.
pub type Readings = Map<String, Value>;

/// One timestamped entry of the sensor log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub timestamp: String,
    #[serde(default)]
    pub soil: Readings,
    #[serde(default)]
    pub water: Readings,
    #[serde(default)]
    pub environment: Readings,
}

/// The three reading groups of a [`SensorSnapshot`], in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Soil,
    Water,
    Environment,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Soil, Category::Water, Category::Environment];

    pub fn key(&self) -> &'static str {
        match self {
            Category::Soil => "soil",
            Category::Water => "water",
            Category::Environment => "environment",
        }
    }

    /// Capitalized label used in rendered status blocks.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Soil => "Soil",
            Category::Water => "Water",
            Category::Environment => "Environment",
        }
    }
}

impl SensorSnapshot {
    pub fn readings(&self, category: Category) -> &Readings {
        match category {
            Category::Soil => &self.soil,
            Category::Water => &self.water,
            Category::Environment => &self.environment,
        }
    }
}

/// Render a reading for humans and for the prompt.
///
/// Strings are shown without quotes, `null` as `None` so that the
/// rainfall normalization applies to it as well.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

/// A slice of extracted document text, ready for embedding.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    /// Path of the source PDF, relative to the documents directory.
    pub source: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// Plain text extracted from one source document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub source: String,
    pub text: String,
}

/// One query/response exchange in an interactive session.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationEntry {
    pub query: String,
    pub response: String,
    pub asked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_keeps_metric_order() {
        let snap: SensorSnapshot = serde_json::from_value(json!({
            "timestamp": "2025-01-01 08:00",
            "soil": {"temperature": "20°C", "moisture": "40%", "ph": 6.5}
        }))
        .unwrap();
        let keys: Vec<&str> = snap.soil.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["temperature", "moisture", "ph"]);
        assert!(snap.water.is_empty());
    }

    #[test]
    fn display_value_forms() {
        assert_eq!(display_value(&json!("23.5°C")), "23.5°C");
        assert_eq!(display_value(&json!(6.5)), "6.5");
        assert_eq!(display_value(&Value::Null), "None");
        assert_eq!(display_value(&json!(true)), "true");
    }
}
