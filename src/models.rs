// src/models.rs
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::schema::SchemaError;

/// Primitive type of a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Integer,
    Float,
    Boolean,
    Text,
    #[serde(rename = "datetime")]
    DateTime,
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Text => "text",
            FieldType::DateTime => "datetime",
            FieldType::Date => "date",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field value, either parsed from the command line or read back
/// from the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::DateTime(v) => f.write_str(&v.to_rfc3339()),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Integer(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Boolean(v) => serializer.serialize_bool(*v),
            Value::Text(v) => serializer.serialize_str(v),
            Value::DateTime(_) | Value::Date(_) => serializer.collect_str(self),
        }
    }
}

// Schema files carry defaults as plain JSON scalars. Timestamps arrive as
// text and are coerced to the field type during inspection.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawValue::deserialize(deserializer)? {
            RawValue::Null => Value::Null,
            RawValue::Boolean(v) => Value::Boolean(v),
            RawValue::Integer(v) => Value::Integer(v),
            RawValue::Float(v) => Value::Float(v),
            RawValue::Text(v) => Value::Text(v),
        })
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

/// Declared metadata of one model field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<Value>,
    /// Set to the current time on every write.
    #[serde(default)]
    pub auto_now: bool,
    /// Set to the current time when the record is created.
    #[serde(default)]
    pub auto_now_add: bool,
    #[serde(default)]
    pub help: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            primary_key: false,
            nullable: false,
            default: None,
            auto_now: false,
            auto_now_add: false,
            help: None,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::DateTime)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn auto_now(mut self) -> Self {
        self.auto_now = true;
        self
    }

    pub fn auto_now_add(mut self) -> Self {
        self.auto_now_add = true;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Explicit description of a persisted record type.
///
/// This stands in for runtime reflection: callers either build it in code
/// with the builder methods or load it from a JSON schema file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    /// Table name; defaults to the lowercase model name.
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    pub fields: Vec<Field>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            about: None,
            fields: Vec::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase())
    }
}

/// On-disk list of models, as read by the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaFile {
    pub models: Vec<Model>,
}

impl SchemaFile {
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// One persisted record, with values in model field order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.values.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// One-line `field=value` rendering used by listings.
    pub fn summary(&self) -> String {
        self.iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_fields_in_order() {
        let model = Model::new("User")
            .field(Field::integer("id").primary_key())
            .field(Field::text("name"))
            .field(Field::boolean("active").default_value(true));

        assert_eq!(model.table_name(), "user");
        let names: Vec<_> = model.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "active"]);
        assert_eq!(model.fields[2].default, Some(Value::Boolean(true)));
    }

    #[test]
    fn schema_file_parses_defaults_and_flags() {
        let schema = SchemaFile::from_json(
            r#"{
                "models": [{
                    "name": "Task",
                    "table": "tasks",
                    "fields": [
                        {"name": "id", "type": "integer", "primary_key": true},
                        {"name": "title", "type": "text", "help": "Task title"},
                        {"name": "weight", "type": "float", "default": 1.5},
                        {"name": "done", "type": "boolean", "default": false},
                        {"name": "due", "type": "date", "nullable": true},
                        {"name": "created_at", "type": "datetime", "auto_now_add": true}
                    ]
                }]
            }"#,
        )
        .unwrap();

        let model = &schema.models[0];
        assert_eq!(model.table_name(), "tasks");
        assert_eq!(model.fields[1].help.as_deref(), Some("Task title"));
        assert_eq!(model.fields[2].default, Some(Value::Float(1.5)));
        assert_eq!(model.fields[3].default, Some(Value::Boolean(false)));
        assert!(model.fields[4].nullable);
        assert_eq!(model.fields[5].field_type, FieldType::DateTime);
        assert!(model.fields[5].auto_now_add);
    }

    #[test]
    fn unknown_field_type_is_rejected() {
        let result = SchemaFile::from_json(
            r#"{"models": [{"name": "X", "fields": [{"name": "id", "type": "uuid"}]}]}"#,
        );
        assert!(matches!(result, Err(SchemaError::Json(_))));
    }

    #[test]
    fn record_serializes_as_object_in_field_order() {
        let mut record = Record::new();
        record.push("id", Value::Integer(1));
        record.push("name", Value::from("Alice"));
        record.push("note", Value::Null);
        record.push("due", Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"id":1,"name":"Alice","note":null,"due":"2024-03-01"}"#);
        assert_eq!(record.summary(), "id=1, name=Alice, note=null, due=2024-03-01");
        assert_eq!(record.get("name"), Some(&Value::from("Alice")));
        assert_eq!(record.get("missing"), None);
    }
}
