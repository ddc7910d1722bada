// src/schema/inspector.rs
use crate::models::{Field, FieldType, Model, Value};

use super::mapper::parse_value;
use super::SchemaError;

/// Validated, read-only view of one model field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub default: Option<Value>,
    pub primary_key: bool,
    pub auto_now: bool,
    pub auto_now_add: bool,
    pub help: Option<String>,
}

impl FieldDescriptor {
    /// Generated fields are filled in by the system and never accepted as input.
    pub fn is_generated(&self) -> bool {
        self.primary_key || self.auto_now || self.auto_now_add
    }
}

/// A model whose field list has passed inspection.
///
/// Names are guaranteed to be plain identifiers, so they are safe to use as
/// SQL identifiers and flag names.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    name: String,
    table: String,
    about: Option<String>,
    fields: Vec<FieldDescriptor>,
    primary_key: usize,
}

impl ModelSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subcommand group name, e.g. `user`.
    pub fn command_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Name used in user-facing messages, e.g. `USER`.
    pub fn display_name(&self) -> String {
        self.name.to_uppercase()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn about(&self) -> Option<&str> {
        self.about.as_deref()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn primary_key(&self) -> &FieldDescriptor {
        &self.fields[self.primary_key]
    }
}

// Key added to models that do not declare one.
const IMPLICIT_KEY: &str = "id";

fn implicit_key() -> FieldDescriptor {
    FieldDescriptor {
        name: IMPLICIT_KEY.to_string(),
        field_type: FieldType::Integer,
        nullable: false,
        default: None,
        primary_key: true,
        auto_now: false,
        auto_now_add: false,
        help: None,
    }
}

// Flags clap adds to every generated subcommand.
const RESERVED_FIELD_NAMES: [&str; 1] = ["help"];

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Brings a declared default to the field's own type. Returns `None` when the
/// value cannot represent that type.
fn coerce_default(field_type: FieldType, value: &Value) -> Option<Value> {
    match (field_type, value) {
        (FieldType::Integer, Value::Integer(_))
        | (FieldType::Float, Value::Float(_))
        | (FieldType::Boolean, Value::Boolean(_))
        | (FieldType::Text, Value::Text(_))
        | (FieldType::DateTime, Value::DateTime(_))
        | (FieldType::Date, Value::Date(_)) => Some(value.clone()),
        (FieldType::Float, Value::Integer(v)) => Some(Value::Float(*v as f64)),
        (FieldType::DateTime | FieldType::Date, Value::Text(raw)) => {
            parse_value(field_type, raw).ok()
        }
        _ => None,
    }
}

fn describe(model: &Model, field: &Field) -> Result<FieldDescriptor, SchemaError> {
    if !is_identifier(&field.name) {
        return Err(SchemaError::InvalidName(field.name.clone()));
    }

    if RESERVED_FIELD_NAMES.contains(&field.name.as_str()) {
        return Err(SchemaError::ReservedName(field.name.clone()));
    }

    if (field.auto_now || field.auto_now_add) && field.field_type != FieldType::DateTime {
        return Err(SchemaError::InvalidAutoTimestamp {
            model: model.name.clone(),
            field: field.name.clone(),
        });
    }

    let default = match &field.default {
        None => None,
        Some(Value::Null) if field.nullable => None,
        Some(value) => Some(coerce_default(field.field_type, value).ok_or_else(|| {
            SchemaError::DefaultTypeMismatch {
                model: model.name.clone(),
                field: field.name.clone(),
                expected: field.field_type,
            }
        })?),
    };

    Ok(FieldDescriptor {
        name: field.name.clone(),
        field_type: field.field_type,
        nullable: field.nullable,
        default,
        primary_key: field.primary_key,
        auto_now: field.auto_now,
        auto_now_add: field.auto_now_add,
        help: field.help.clone(),
    })
}

/// Walks a model's declared fields and produces the validated schema the
/// command builder and the database layer work from.
pub fn inspect(model: &Model) -> Result<ModelSchema, SchemaError> {
    if !is_identifier(&model.name) {
        return Err(SchemaError::InvalidName(model.name.clone()));
    }

    let table = model.table_name();
    if !is_identifier(&table) {
        return Err(SchemaError::InvalidName(table));
    }

    if model.fields.is_empty() {
        return Err(SchemaError::EmptyModel(model.name.clone()));
    }

    let mut fields: Vec<FieldDescriptor> = Vec::with_capacity(model.fields.len());
    for field in &model.fields {
        if fields.iter().any(|seen| seen.name == field.name) {
            return Err(SchemaError::DuplicateField {
                model: model.name.clone(),
                field: field.name.clone(),
            });
        }
        fields.push(describe(model, field)?);
    }

    if !fields.iter().any(|field| field.primary_key) {
        if fields.iter().any(|field| field.name == IMPLICIT_KEY) {
            return Err(SchemaError::MissingPrimaryKey(model.name.clone()));
        }
        log::debug!("Model {} declares no primary key, adding '{}'", model.name, IMPLICIT_KEY);
        fields.insert(0, implicit_key());
    }

    let mut keys = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| field.primary_key);
    let (primary_key, key_field) = keys
        .next()
        .ok_or_else(|| SchemaError::MissingPrimaryKey(model.name.clone()))?;
    if keys.next().is_some() {
        return Err(SchemaError::MultiplePrimaryKeys(model.name.clone()));
    }
    if key_field.field_type != FieldType::Integer {
        return Err(SchemaError::UnsupportedPrimaryKey {
            model: model.name.clone(),
            field: key_field.name.clone(),
            field_type: key_field.field_type,
        });
    }

    log::debug!("Inspected model {} ({} fields)", model.name, fields.len());

    Ok(ModelSchema {
        name: model.name.clone(),
        table,
        about: model.about.clone(),
        fields,
        primary_key,
    })
}
