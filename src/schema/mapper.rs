// src/schema/mapper.rs
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Arg;
use thiserror::Error;

use crate::models::{FieldType, Value};

use super::inspector::{FieldDescriptor, ModelSchema};

// Accepted in addition to RFC 3339; interpreted as UTC.
const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Clone, Error, PartialEq)]
#[error("'{input}' is not a valid {expected}: {reason}")]
pub struct ParseError {
    pub input: String,
    pub expected: FieldType,
    pub reason: String,
}

fn parse_datetime(input: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc());
        }
    }

    let date = NaiveDate::from_str(input)
        .map_err(|_| "expected RFC 3339, YYYY-MM-DD HH:MM:SS or YYYY-MM-DD".to_string())?;
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| "date out of range".to_string())
}

/// Parses one command-line value with the native parser of `field_type`.
pub fn parse_value(field_type: FieldType, input: &str) -> Result<Value, ParseError> {
    let parsed = match field_type {
        FieldType::Integer => i64::from_str(input)
            .map(Value::Integer)
            .map_err(|e| e.to_string()),
        FieldType::Float => f64::from_str(input)
            .map(Value::Float)
            .map_err(|e| e.to_string()),
        FieldType::Boolean => bool::from_str(input)
            .map(Value::Boolean)
            .map_err(|e| e.to_string()),
        FieldType::Text => Ok(Value::Text(input.to_string())),
        FieldType::DateTime => parse_datetime(input).map(Value::DateTime),
        FieldType::Date => NaiveDate::from_str(input)
            .map(Value::Date)
            .map_err(|e| e.to_string()),
    };

    parsed.map_err(|reason| ParseError {
        input: input.to_string(),
        expected: field_type,
        reason,
    })
}

/// Which generated subcommand an option is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionRole {
    /// One option per input field, required unless nullable or defaulted.
    Create,
    /// One optional option per input field.
    Update,
    /// One optional equality filter per non-key field.
    Filter,
}

/// Command-line option derived from exactly one field.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDescriptor {
    /// Argument id; always the field name.
    pub id: String,
    /// Long flag without the leading dashes.
    pub flag: String,
    pub field_type: FieldType,
    pub required: bool,
    pub help: String,
}

impl OptionDescriptor {
    /// Every option takes exactly one value, so the token after the flag is
    /// always that value even when it starts with `-` (`--balance -5`,
    /// `--rate -inf`, `--note -x`).
    pub fn to_arg(&self) -> Arg {
        let field_type = self.field_type;
        Arg::new(self.id.clone())
            .long(self.flag.clone())
            .value_name(field_type.as_str().to_uppercase())
            .help(self.help.clone())
            .required(self.required)
            .num_args(1)
            .allow_hyphen_values(true)
            .value_parser(move |raw: &str| parse_value(field_type, raw))
    }
}

fn help_text(field: &FieldDescriptor) -> String {
    let base = field
        .help
        .clone()
        .unwrap_or_else(|| format!("{} ({})", field.name, field.field_type));

    match &field.default {
        Some(default) => format!("{} [default: {}]", base, default),
        None => base,
    }
}

/// Maps one field to its option for `role`, or `None` when the field takes
/// no input in that role.
pub fn map_field(field: &FieldDescriptor, role: OptionRole) -> Option<OptionDescriptor> {
    let required = match role {
        OptionRole::Create if field.is_generated() => return None,
        OptionRole::Update if field.is_generated() => return None,
        OptionRole::Filter if field.primary_key => return None,
        OptionRole::Create => !field.nullable && field.default.is_none(),
        OptionRole::Update | OptionRole::Filter => false,
    };

    Some(OptionDescriptor {
        id: field.name.clone(),
        flag: field.name.replace('_', "-"),
        field_type: field.field_type,
        required,
        help: help_text(field),
    })
}

pub fn options_for(schema: &ModelSchema, role: OptionRole) -> Vec<OptionDescriptor> {
    schema
        .fields()
        .iter()
        .filter_map(|field| map_field(field, role))
        .collect()
}

/// Positional argument carrying the primary key value.
pub fn key_arg(schema: &ModelSchema) -> Arg {
    let field_type = schema.primary_key().field_type;
    Arg::new(schema.primary_key().name.clone())
        .value_name("ID")
        .help("ID of the instance")
        .required(true)
        .allow_negative_numbers(true)
        .value_parser(move |raw: &str| parse_value(field_type, raw))
}
