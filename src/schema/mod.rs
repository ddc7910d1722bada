// src/schema/mod.rs
use std::io;
use thiserror::Error;

use crate::models::FieldType;

pub mod inspector;
pub mod mapper;

pub use inspector::{inspect, FieldDescriptor, ModelSchema};
pub use mapper::{map_field, options_for, parse_value, OptionDescriptor, OptionRole, ParseError};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Model {0} declares no fields")]
    EmptyModel(String),

    #[error("Invalid identifier: '{0}'")]
    InvalidName(String),

    #[error("Model {model} declares field '{field}' more than once")]
    DuplicateField { model: String, field: String },

    #[error("Model {0} has a field named 'id' that is not its primary key; mark a primary key explicitly")]
    MissingPrimaryKey(String),

    #[error("Model {0} declares more than one primary key field")]
    MultiplePrimaryKeys(String),

    #[error("Primary key {model}.{field} must be an integer, not {field_type}")]
    UnsupportedPrimaryKey {
        model: String,
        field: String,
        field_type: FieldType,
    },

    #[error("Field {model}.{field} uses auto_now/auto_now_add but is not a datetime")]
    InvalidAutoTimestamp { model: String, field: String },

    #[error("Default value of {model}.{field} is not a valid {expected}")]
    DefaultTypeMismatch {
        model: String,
        field: String,
        expected: FieldType,
    },

    #[error("Field name '{0}' is reserved by the command line")]
    ReservedName(String),

    #[error("Model command '{0}' is registered more than once")]
    DuplicateModel(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
