// src/cli/handlers.rs
use chrono::Utc;
use clap::error::ErrorKind;
use clap::ArgMatches;

use crate::db::{Database, DbError};
use crate::models::{Record, Value};
use crate::schema::ModelSchema;

use super::CliError;

/// Result of one dispatched operation, ready to be printed.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created(Record),
    Listed { model: String, records: Vec<Record> },
    Shown(Record),
    Updated(Record),
    Deleted { model: String, id: Value },
}

fn key_value(schema: &ModelSchema, matches: &ArgMatches) -> Result<Value, CliError> {
    let key = &schema.primary_key().name;
    matches.get_one::<Value>(key).cloned().ok_or_else(|| {
        CliError::Validation(clap::Error::raw(
            ErrorKind::MissingRequiredArgument,
            format!("missing value for <{}>\n", key),
        ))
    })
}

// A key that does not resolve becomes a user-facing NotFound; anything else
// from the database is passed through.
fn lookup_error(schema: &ModelSchema, id: &Value, error: DbError) -> CliError {
    match error {
        DbError::NotFound => CliError::NotFound {
            model: schema.display_name(),
            id: id.clone(),
        },
        other => CliError::Database(other),
    }
}

pub async fn handle_create(db: &Database, schema: &ModelSchema, matches: &ArgMatches) -> Result<Record, CliError> {
    let now = Utc::now();
    let mut values = Vec::new();

    for field in schema.fields().iter().filter(|field| !field.primary_key) {
        let value = if field.auto_now || field.auto_now_add {
            Value::DateTime(now)
        } else if let Some(value) = matches.get_one::<Value>(&field.name) {
            value.clone()
        } else if let Some(default) = &field.default {
            default.clone()
        } else {
            Value::Null
        };
        values.push((field.name.clone(), value));
    }

    let record = db.insert(schema, &values).await?;
    log::info!("Created {} {}", schema.display_name(), record.summary());
    Ok(record)
}

pub async fn handle_list(db: &Database, schema: &ModelSchema, matches: &ArgMatches) -> Result<Outcome, CliError> {
    let filters: Vec<(String, Value)> = schema
        .fields()
        .iter()
        .filter(|field| !field.primary_key)
        .filter_map(|field| {
            matches
                .get_one::<Value>(&field.name)
                .map(|value| (field.name.clone(), value.clone()))
        })
        .collect();

    let records = db.fetch_all(schema, &filters).await?;
    Ok(Outcome::Listed {
        model: schema.display_name(),
        records,
    })
}

pub async fn handle_get(db: &Database, schema: &ModelSchema, matches: &ArgMatches) -> Result<Record, CliError> {
    let id = key_value(schema, matches)?;
    db.fetch_by_key(schema, &id)
        .await
        .map_err(|e| lookup_error(schema, &id, e))
}

pub async fn handle_update(db: &Database, schema: &ModelSchema, matches: &ArgMatches) -> Result<Record, CliError> {
    let id = key_value(schema, matches)?;
    let now = Utc::now();
    let mut changes = Vec::new();

    for field in schema.fields().iter().filter(|field| !field.primary_key) {
        if field.auto_now {
            changes.push((field.name.clone(), Value::DateTime(now)));
        } else if field.is_generated() {
            continue;
        } else if let Some(value) = matches.get_one::<Value>(&field.name) {
            changes.push((field.name.clone(), value.clone()));
        }
    }

    let record = db
        .update_by_key(schema, &id, &changes)
        .await
        .map_err(|e| lookup_error(schema, &id, e))?;
    log::info!("Updated {} {}", schema.display_name(), record.summary());
    Ok(record)
}

pub async fn handle_delete(db: &Database, schema: &ModelSchema, matches: &ArgMatches) -> Result<Outcome, CliError> {
    let id = key_value(schema, matches)?;
    db.delete_by_key(schema, &id)
        .await
        .map_err(|e| lookup_error(schema, &id, e))?;
    log::info!("Deleted {} with ID {}", schema.display_name(), id);

    Ok(Outcome::Deleted {
        model: schema.display_name(),
        id,
    })
}
