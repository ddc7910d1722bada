// src/db/sqlite.rs
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite};

use crate::models::{FieldType, Record, Value};
use crate::schema::{FieldDescriptor, ModelSchema};

use super::query::{self, Dialect};
use super::{column_types, Assignments, DatabaseBackend, DbError};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: Option<SqlitePool>,
    connection_string: Option<String>,
}

impl SqliteBackend {
    pub fn new() -> Self {
        Self {
            pool: None,
            connection_string: None,
        }
    }

    // Helper to get the pool or return an error
    fn get_pool(&self) -> Result<&SqlitePool, DbError> {
        self.pool.as_ref().ok_or(DbError::InitError("Database not initialized".into()))
    }

    /// Filesystem path of the database, or `None` for in-memory databases.
    pub fn get_db_path(&self) -> Option<String> {
        self.connection_string.as_deref().and_then(db_path)
    }
}

impl Default for SqliteBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn db_path(connection_string: &str) -> Option<String> {
    let rest = connection_string
        .strip_prefix("sqlite://")
        .or_else(|| connection_string.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);

    if path.is_empty() || path == ":memory:" || connection_string.contains("mode=memory") {
        None
    } else {
        Some(path.to_string())
    }
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Integer(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Boolean(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::DateTime(v) => query.bind(v.to_rfc3339()),
        Value::Date(v) => query.bind(v.format("%Y-%m-%d").to_string()),
    }
}

// SQLite stores a NaN bind as NULL, which would silently drop the value or
// trip a NOT NULL constraint.
fn check_storable(typed: &[(&str, FieldType, &Value)]) -> Result<(), DbError> {
    match typed.iter().find(|(_, _, value)| matches!(value, Value::Float(v) if v.is_nan())) {
        Some((column, _, value)) => Err(DbError::UnsupportedValue {
            column: column.to_string(),
            value: value.to_string(),
            reason: "SQLite cannot store NaN".to_string(),
        }),
        None => Ok(()),
    }
}

fn decode_value(row: &SqliteRow, field: &FieldDescriptor) -> Result<Value, DbError> {
    let name = field.name.as_str();
    let value = match field.field_type {
        FieldType::Integer => row.try_get::<Option<i64>, _>(name)?.map(Value::Integer),
        FieldType::Float => row.try_get::<Option<f64>, _>(name)?.map(Value::Float),
        FieldType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Boolean),
        FieldType::Text => row.try_get::<Option<String>, _>(name)?.map(Value::Text),
        FieldType::DateTime => match row.try_get::<Option<String>, _>(name)? {
            Some(raw) => {
                let parsed = DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| DbError::DecodeError(format!("Invalid datetime in {}: {}", name, e)))?;
                Some(Value::DateTime(parsed.with_timezone(&Utc)))
            }
            None => None,
        },
        FieldType::Date => match row.try_get::<Option<String>, _>(name)? {
            Some(raw) => {
                let parsed = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|e| DbError::DecodeError(format!("Invalid date in {}: {}", name, e)))?;
                Some(Value::Date(parsed))
            }
            None => None,
        },
    };

    Ok(value.unwrap_or(Value::Null))
}

fn decode_record(row: &SqliteRow, schema: &ModelSchema) -> Result<Record, DbError> {
    let mut record = Record::new();
    for field in schema.fields() {
        record.push(field.name.clone(), decode_value(row, field)?);
    }
    Ok(record)
}

impl DatabaseBackend for SqliteBackend {
    async fn init(&mut self, connection_string: &str) -> Result<(), DbError> {
        if !connection_string.starts_with("sqlite:") {
            return Err(DbError::ConfigError("Invalid SQLite connection string".into()));
        }
        self.connection_string = Some(connection_string.to_string());

        let path = db_path(connection_string);

        // Create the database directory if it doesn't exist
        if let Some(path) = &path {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        DbError::InitError(format!("Failed to create database directory: {}", e))
                    })?;
                }
            }
        }

        log::info!(
            "Initializing SQLite database at: {}",
            path.as_deref().unwrap_or(":memory:")
        );

        let options = SqliteConnectOptions::from_str(connection_string)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database sees its own database.
        let max_connections = if path.is_some() { 5 } else { 1 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        self.pool = Some(pool);
        Ok(())
    }

    async fn register(&self, schema: &ModelSchema) -> Result<(), DbError> {
        let pool = self.get_pool()?;
        let sql = query::create_table(Dialect::Sqlite, schema);
        log::debug!("{}", sql);

        sqlx::query(&sql).execute(pool).await?;
        log::info!("Registered table {}", schema.table());
        Ok(())
    }

    async fn insert(&self, schema: &ModelSchema, values: &Assignments) -> Result<Record, DbError> {
        let pool = self.get_pool()?;
        let typed = column_types(schema, values)?;
        check_storable(&typed)?;
        let columns: Vec<&str> = typed.iter().map(|(name, _, _)| *name).collect();

        let sql = query::insert(Dialect::Sqlite, schema, &columns);
        log::debug!("{}", sql);

        let mut sqlx_query = sqlx::query(&sql);
        for (_, _, value) in &typed {
            sqlx_query = bind_value(sqlx_query, value);
        }

        let row = sqlx_query.fetch_one(pool).await?;
        decode_record(&row, schema)
    }

    async fn fetch_all(&self, schema: &ModelSchema, filters: &Assignments) -> Result<Vec<Record>, DbError> {
        let pool = self.get_pool()?;
        let typed = column_types(schema, filters)?;
        check_storable(&typed)?;
        let columns: Vec<&str> = typed.iter().map(|(name, _, _)| *name).collect();

        let sql = query::select(Dialect::Sqlite, schema, &columns);
        log::debug!("{}", sql);

        let mut sqlx_query = sqlx::query(&sql);
        for (_, _, value) in &typed {
            sqlx_query = bind_value(sqlx_query, value);
        }

        let rows = sqlx_query.fetch_all(pool).await?;
        rows.iter().map(|row| decode_record(row, schema)).collect()
    }

    async fn fetch_by_key(&self, schema: &ModelSchema, id: &Value) -> Result<Record, DbError> {
        let pool = self.get_pool()?;
        let sql = query::select_by_key(Dialect::Sqlite, schema);

        let row = bind_value(sqlx::query(&sql), id)
            .fetch_optional(pool)
            .await?
            .ok_or(DbError::NotFound)?;

        decode_record(&row, schema)
    }

    async fn update_by_key(
        &self,
        schema: &ModelSchema,
        id: &Value,
        changes: &Assignments,
    ) -> Result<Record, DbError> {
        if changes.is_empty() {
            return self.fetch_by_key(schema, id).await;
        }

        let pool = self.get_pool()?;
        let typed = column_types(schema, changes)?;
        check_storable(&typed)?;
        let columns: Vec<&str> = typed.iter().map(|(name, _, _)| *name).collect();

        let sql = query::update_by_key(Dialect::Sqlite, schema, &columns);
        log::debug!("{}", sql);

        let mut sqlx_query = sqlx::query(&sql);
        for (_, _, value) in &typed {
            sqlx_query = bind_value(sqlx_query, value);
        }
        sqlx_query = bind_value(sqlx_query, id);

        let row = sqlx_query
            .fetch_optional(pool)
            .await?
            .ok_or(DbError::NotFound)?;

        decode_record(&row, schema)
    }

    async fn delete_by_key(&self, schema: &ModelSchema, id: &Value) -> Result<(), DbError> {
        let pool = self.get_pool()?;
        let sql = query::delete_by_key(Dialect::Sqlite, schema);

        let result = bind_value(sqlx::query(&sql), id).execute(pool).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, Model};
    use crate::schema::inspect;

    fn schema() -> ModelSchema {
        inspect(
            &Model::new("Item")
                .field(Field::integer("id").primary_key())
                .field(Field::text("label"))
                .field(Field::float("price").nullable())
                .field(Field::boolean("in_stock"))
                .field(Field::date("released").nullable())
                .field(Field::datetime("created_at").auto_now_add()),
        )
        .unwrap()
    }

    async fn backend(dir: &tempfile::TempDir) -> SqliteBackend {
        let mut backend = SqliteBackend::new();
        let url = format!("sqlite:{}", dir.path().join("nested").join("items.db").display());
        backend.init(&url).await.unwrap();
        backend.register(&schema()).await.unwrap();
        backend
    }

    fn values(label: &str, in_stock: bool) -> Vec<(String, Value)> {
        vec![
            ("label".to_string(), Value::from(label)),
            ("price".to_string(), Value::Null),
            ("in_stock".to_string(), Value::Boolean(in_stock)),
            (
                "released".to_string(),
                Value::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
            ),
            ("created_at".to_string(), Value::DateTime(Utc::now())),
        ]
    }

    #[test]
    fn parses_paths_out_of_urls() {
        assert_eq!(db_path("sqlite:./data/app.db").as_deref(), Some("./data/app.db"));
        assert_eq!(db_path("sqlite:///tmp/app.db?mode=rwc").as_deref(), Some("/tmp/app.db"));
        assert_eq!(db_path("sqlite::memory:"), None);
        assert_eq!(db_path("sqlite:file:x?mode=memory"), None);
    }

    #[tokio::test]
    async fn insert_assigns_sequential_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;

        let first = backend.insert(&schema(), &values("lamp", true)).await.unwrap();
        let second = backend.insert(&schema(), &values("desk", false)).await.unwrap();

        assert_eq!(first.get("id"), Some(&Value::Integer(1)));
        assert_eq!(second.get("id"), Some(&Value::Integer(2)));
        assert_eq!(first.get("price"), Some(&Value::Null));
        assert_eq!(first.get("in_stock"), Some(&Value::Boolean(true)));
        assert!(backend.get_db_path().unwrap().ends_with("items.db"));
    }

    #[tokio::test]
    async fn round_trips_every_field_type() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;

        let created = backend.insert(&schema(), &values("lamp", true)).await.unwrap();
        let fetched = backend
            .fetch_by_key(&schema(), &Value::Integer(1))
            .await
            .unwrap();

        assert_eq!(created, fetched);
        assert!(matches!(fetched.get("created_at"), Some(Value::DateTime(_))));
        assert_eq!(
            fetched.get("released"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()))
        );
    }

    #[tokio::test]
    async fn fetch_all_applies_equality_filters() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        for (label, in_stock) in [("lamp", true), ("desk", false), ("chair", true)] {
            backend.insert(&schema(), &values(label, in_stock)).await.unwrap();
        }

        let all = backend.fetch_all(&schema(), &[]).await.unwrap();
        assert_eq!(all.len(), 3);

        let filters = vec![("in_stock".to_string(), Value::Boolean(true))];
        let stocked = backend.fetch_all(&schema(), &filters).await.unwrap();
        let labels: Vec<_> = stocked.iter().map(|r| r.get("label").unwrap().to_string()).collect();
        assert_eq!(labels, ["lamp", "chair"]);
    }

    #[tokio::test]
    async fn update_writes_only_given_columns() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        backend.insert(&schema(), &values("lamp", true)).await.unwrap();

        let changes = vec![("price".to_string(), Value::Float(19.5))];
        let updated = backend
            .update_by_key(&schema(), &Value::Integer(1), &changes)
            .await
            .unwrap();

        assert_eq!(updated.get("price"), Some(&Value::Float(19.5)));
        assert_eq!(updated.get("label"), Some(&Value::from("lamp")));
        assert_eq!(updated.get("in_stock"), Some(&Value::Boolean(true)));
    }

    #[tokio::test]
    async fn missing_keys_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        let missing = Value::Integer(99);
        let changes = vec![("label".to_string(), Value::from("x"))];

        assert!(matches!(
            backend.fetch_by_key(&schema(), &missing).await,
            Err(DbError::NotFound)
        ));
        assert!(matches!(
            backend.update_by_key(&schema(), &missing, &changes).await,
            Err(DbError::NotFound)
        ));
        assert!(matches!(
            backend.update_by_key(&schema(), &missing, &[]).await,
            Err(DbError::NotFound)
        ));
        assert!(matches!(
            backend.delete_by_key(&schema(), &missing).await,
            Err(DbError::NotFound)
        ));
    }

    #[tokio::test]
    async fn rejects_columns_outside_the_schema() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        let values = vec![("colour".to_string(), Value::from("red"))];

        assert!(matches!(
            backend.insert(&schema(), &values).await,
            Err(DbError::UnknownColumn { column, .. }) if column == "colour"
        ));
    }

    #[tokio::test]
    async fn rejects_nan_before_it_reaches_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        let mut nan = values("lamp", true);
        nan[1].1 = Value::Float(f64::NAN);

        let err = backend.insert(&schema(), &nan).await.unwrap_err();
        assert!(matches!(err, DbError::UnsupportedValue { ref column, .. } if column == "price"));
        assert!(err.to_string().contains("NaN"));

        let infinite = vec![("price".to_string(), Value::Float(f64::INFINITY))];
        backend.insert(&schema(), &values("desk", true)).await.unwrap();
        let updated = backend
            .update_by_key(&schema(), &Value::Integer(1), &infinite)
            .await
            .unwrap();
        assert_eq!(updated.get("price"), Some(&Value::Float(f64::INFINITY)));
    }

    #[tokio::test]
    async fn in_memory_databases_work() {
        let mut backend = SqliteBackend::new();
        backend.init("sqlite::memory:").await.unwrap();
        backend.register(&schema()).await.unwrap();
        backend.insert(&schema(), &values("lamp", true)).await.unwrap();

        assert_eq!(backend.fetch_all(&schema(), &[]).await.unwrap().len(), 1);
        assert_eq!(backend.get_db_path(), None);
        backend.close().await;
    }
}
