//! Input records as loaded from an org chart document.
//!
//! Documents are JSON (or YAML) objects mapping a person/role name to its attributes:
//!
//! ```json
//! { "CEO": { "level": 1 }, "VP": { "level": 2, "under": "CEO", "position": "Sales" } }
//! ```
//!
//! No schema validation is performed. Entries with a missing or non-numeric `level`, an empty
//! `under`, or unknown fields are accepted as-is; only a top-level value that is not an object
//! is a load failure.

use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Solid,
    Dashed,
}

impl LineType {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "solid" => Some(Self::Solid),
            "dashed" | "dotted" => Some(Self::Dashed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub name: String,
    /// Declared level; `1` is the top of the chart. `None` when the entry had no usable level.
    pub level: Option<i64>,
    /// Name of the parent record. Empty strings are normalized to `None`.
    pub under: Option<String>,
    pub position: Option<String>,
    pub line_type: Option<LineType>,
}

impl Record {
    pub fn new(name: impl Into<String>, level: i64) -> Self {
        Self {
            name: name.into(),
            level: Some(level),
            under: None,
            position: None,
            line_type: None,
        }
    }

    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.under = Some(parent.into()).filter(|p: &String| !p.is_empty());
        self
    }

    pub fn position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn line_type(mut self, line_type: LineType) -> Self {
        self.line_type = Some(line_type);
        self
    }

    /// Builds a record from one document entry, tolerating malformed attributes.
    pub fn from_value(name: &str, value: &Value) -> Self {
        let level = value.get("level").and_then(level_from_value);
        let under = value
            .get("under")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let position = value
            .get("position")
            .and_then(Value::as_str)
            .map(str::to_string);
        let line_type = value
            .get("lineType")
            .and_then(Value::as_str)
            .and_then(LineType::parse);
        Self {
            name: name.to_string(),
            level,
            under,
            position,
            line_type,
        }
    }

    pub fn is_level_one(&self) -> bool {
        self.level == Some(1)
    }

    pub fn to_value(&self) -> Value {
        let mut obj = serde_json::Map::new();
        if let Some(level) = self.level {
            obj.insert("level".to_string(), Value::from(level));
        }
        if let Some(under) = &self.under {
            obj.insert("under".to_string(), Value::from(under.as_str()));
        }
        if let Some(position) = &self.position {
            obj.insert("position".to_string(), Value::from(position.as_str()));
        }
        if let Some(line_type) = self.line_type {
            let raw = match line_type {
                LineType::Solid => "solid",
                LineType::Dashed => "dashed",
            };
            obj.insert("lineType".to_string(), Value::from(raw));
        }
        Value::Object(obj)
    }
}

fn level_from_value(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// A loaded org chart document, keyed by record name in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    records: IndexMap<String, Record>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::load("document", e))?;
        Self::from_value(&value)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| Error::load("document", e))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(obj) = value.as_object() else {
            return Err(Error::Load {
                what: "document",
                message: "top-level value must be an object keyed by name".to_string(),
            });
        };
        let records = obj
            .iter()
            .map(|(name, entry)| (name.clone(), Record::from_value(name, entry)))
            .collect();
        Ok(Self { records })
    }

    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.name.clone(), r)).collect(),
        }
    }

    pub fn insert(&mut self, record: Record) -> Option<Record> {
        self.records.insert(record.name.clone(), record)
    }

    pub fn get(&self, name: &str) -> Option<&Record> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.records
                .iter()
                .map(|(name, r)| (name.clone(), r.to_value()))
                .collect(),
        )
    }
}
