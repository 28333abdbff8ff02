//! Assembled records
//!
//! A [`Record`] is the untyped output of one scanner pass: id, title and one
//! value per schema binding. [`Record::into_typed`] hands it to serde to build
//! the caller's struct.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CoreError, FieldRule, RecordSchema};

/// A single extracted value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Number(f64),
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(text) => Value::String(text),
            FieldValue::List(items) => Value::Array(items.into_iter().map(Value::String).collect()),
            FieldValue::Number(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}

/// One record assembled from a heading and the field lines below it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    /// Values in schema binding order
    pub fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Open a record with every bound field at its default
    pub fn open(schema: &RecordSchema, id: String, title: String) -> Self {
        let fields = schema
            .fields
            .iter()
            .map(|binding| (binding.key.to_string(), binding.rule.default_value()))
            .collect();

        Self { id, title, fields }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.get(key) {
            Some(FieldValue::List(items)) => Some(items),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(FieldValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// Replace the value stored under `key`
    pub fn set(&mut self, key: &str, value: FieldValue) {
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.fields.push((key.to_string(), value));
        }
    }

    /// Flatten into a JSON object (`id`, `title`, then every field)
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("id".to_string(), Value::String(self.id.clone()));
        object.insert("title".to_string(), Value::String(self.title.clone()));
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone().into());
        }
        Value::Object(object)
    }

    /// Deserialize into a typed record
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, CoreError> {
        let id = self.id.clone();
        serde_json::from_value(self.to_json()).map_err(|source| CoreError::Conversion { id, source })
    }
}

/// Apply a rule to the text of a matched line
pub(crate) fn apply_rule(rule: &FieldRule, line: &str, label: &str) -> FieldValue {
    match rule {
        FieldRule::Text => {
            FieldValue::Text(crate::extract_field(line, label).unwrap_or_default())
        }
        FieldRule::List => FieldValue::List(crate::extract_list(line)),
        FieldRule::Number { default } => FieldValue::Number(
            crate::extract_field(line, label)
                .and_then(|value| crate::parse_number(&value))
                .unwrap_or(*default),
        ),
        FieldRule::Choice { options, default } => FieldValue::Text(
            crate::extract_field(line, label)
                .map(|value| crate::match_choice(&value, options, default))
                .unwrap_or_else(|| default.to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldBinding, RecordSchema};
    use serde::Deserialize;

    const TASK: RecordSchema = RecordSchema::new(
        "Task",
        "TASK",
        &[
            FieldBinding::new("Description", "description", FieldRule::Text),
            FieldBinding::new("Estimate", "estimate", FieldRule::COUNT),
            FieldBinding::new("Files", "files", FieldRule::List),
        ],
    );

    #[derive(Debug, Deserialize)]
    struct Task {
        id: String,
        title: String,
        description: String,
        estimate: f64,
        files: Vec<String>,
    }

    #[test]
    fn test_open_uses_defaults() {
        let record = Record::open(&TASK, "TASK_1".into(), "Wire login".into());
        assert_eq!(record.text("description"), Some(""));
        assert_eq!(record.number("estimate"), Some(0.0));
        assert_eq!(record.list("files"), Some(&[][..]));
    }

    #[test]
    fn test_apply_rules() {
        assert_eq!(
            apply_rule(&FieldRule::COUNT, "Estimate: 3 hours", "Estimate"),
            FieldValue::Number(3.0)
        );
        assert_eq!(
            apply_rule(&FieldRule::COUNT, "Estimate: unknown", "Estimate"),
            FieldValue::Number(0.0)
        );
        assert_eq!(
            apply_rule(&FieldRule::LEVEL, "Impact: catastrophic", "Impact"),
            FieldValue::Text("medium".into())
        );
        assert_eq!(
            apply_rule(&FieldRule::List, "- Files: src/a.rs, src/b.rs", "Files"),
            FieldValue::List(vec!["src/a.rs".into(), "src/b.rs".into()])
        );
    }

    #[test]
    fn test_into_typed() {
        let mut record = Record::open(&TASK, "TASK_1".into(), "Wire login".into());
        record.set("estimate", FieldValue::Number(2.0));
        record.set("files", FieldValue::List(vec!["src/auth.rs".into()]));

        let task: Task = record.into_typed().unwrap();
        assert_eq!(task.id, "TASK_1");
        assert_eq!(task.title, "Wire login");
        assert_eq!(task.description, "");
        assert_eq!(task.estimate, 2.0);
        assert_eq!(task.files, vec!["src/auth.rs"]);
    }

    #[test]
    fn test_to_json_shape() {
        let record = Record::open(&TASK, "TASK_2".into(), "Docs".into());
        let json = record.to_json();
        assert_eq!(json["id"], "TASK_2");
        assert_eq!(json["estimate"], 0.0);
        assert!(json["files"].as_array().unwrap().is_empty());
    }
}
