// src/db/postgres.rs
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};

use crate::models::{FieldType, Record, Value};
use crate::schema::{FieldDescriptor, ModelSchema};

use super::query::{self, Dialect};
use super::{column_types, Assignments, DatabaseBackend, DbError};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: Option<PgPool>,
}

impl PostgresBackend {
    pub fn new() -> Self {
        Self { pool: None }
    }

    // Helper to get the pool or return an error
    fn get_pool(&self) -> Result<&PgPool, DbError> {
        self.pool.as_ref().ok_or(DbError::InitError("Database not initialized".into()))
    }
}

impl Default for PostgresBackend {
    fn default() -> Self {
        Self::new()
    }
}

// Postgres checks parameter types against the column, so NULLs carry the
// column's type.
fn bind_value<'q>(query: PgQuery<'q>, field_type: FieldType, value: &Value) -> PgQuery<'q> {
    match value {
        Value::Null => match field_type {
            FieldType::Integer => query.bind(None::<i64>),
            FieldType::Float => query.bind(None::<f64>),
            FieldType::Boolean => query.bind(None::<bool>),
            FieldType::Text => query.bind(None::<String>),
            FieldType::DateTime => query.bind(None::<DateTime<Utc>>),
            FieldType::Date => query.bind(None::<NaiveDate>),
        },
        Value::Integer(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Boolean(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::DateTime(v) => query.bind(*v),
        Value::Date(v) => query.bind(*v),
    }
}

fn decode_value(row: &PgRow, field: &FieldDescriptor) -> Result<Value, DbError> {
    let name = field.name.as_str();
    let value = match field.field_type {
        FieldType::Integer => row.try_get::<Option<i64>, _>(name)?.map(Value::Integer),
        FieldType::Float => row.try_get::<Option<f64>, _>(name)?.map(Value::Float),
        FieldType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Boolean),
        FieldType::Text => row.try_get::<Option<String>, _>(name)?.map(Value::Text),
        FieldType::DateTime => row
            .try_get::<Option<DateTime<Utc>>, _>(name)?
            .map(Value::DateTime),
        FieldType::Date => row.try_get::<Option<NaiveDate>, _>(name)?.map(Value::Date),
    };

    Ok(value.unwrap_or(Value::Null))
}

fn decode_record(row: &PgRow, schema: &ModelSchema) -> Result<Record, DbError> {
    let mut record = Record::new();
    for field in schema.fields() {
        record.push(field.name.clone(), decode_value(row, field)?);
    }
    Ok(record)
}

impl DatabaseBackend for PostgresBackend {
    async fn init(&mut self, connection_string: &str) -> Result<(), DbError> {
        log::info!("Initializing PostgreSQL database...");

        // Create a connection pool
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;

        log::info!("Connected to PostgreSQL");

        self.pool = Some(pool);
        Ok(())
    }

    async fn register(&self, schema: &ModelSchema) -> Result<(), DbError> {
        let pool = self.get_pool()?;
        let sql = query::create_table(Dialect::Postgres, schema);
        log::debug!("{}", sql);

        sqlx::query(&sql).execute(pool).await?;
        log::info!("Registered table {}", schema.table());
        Ok(())
    }

    async fn insert(&self, schema: &ModelSchema, values: &Assignments) -> Result<Record, DbError> {
        let pool = self.get_pool()?;
        let typed = column_types(schema, values)?;
        let columns: Vec<&str> = typed.iter().map(|(name, _, _)| *name).collect();

        let sql = query::insert(Dialect::Postgres, schema, &columns);
        log::debug!("{}", sql);

        let mut sqlx_query = sqlx::query(&sql);
        for (_, field_type, value) in &typed {
            sqlx_query = bind_value(sqlx_query, *field_type, value);
        }

        let row = sqlx_query.fetch_one(pool).await?;
        decode_record(&row, schema)
    }

    async fn fetch_all(&self, schema: &ModelSchema, filters: &Assignments) -> Result<Vec<Record>, DbError> {
        let pool = self.get_pool()?;
        let typed = column_types(schema, filters)?;
        let columns: Vec<&str> = typed.iter().map(|(name, _, _)| *name).collect();

        let sql = query::select(Dialect::Postgres, schema, &columns);
        log::debug!("{}", sql);

        let mut sqlx_query = sqlx::query(&sql);
        for (_, field_type, value) in &typed {
            sqlx_query = bind_value(sqlx_query, *field_type, value);
        }

        let rows = sqlx_query.fetch_all(pool).await?;
        rows.iter().map(|row| decode_record(row, schema)).collect()
    }

    async fn fetch_by_key(&self, schema: &ModelSchema, id: &Value) -> Result<Record, DbError> {
        let pool = self.get_pool()?;
        let sql = query::select_by_key(Dialect::Postgres, schema);

        let row = bind_value(sqlx::query(&sql), FieldType::Integer, id)
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
        let columns: Vec<&str> = typed.iter().map(|(name, _, _)| *name).collect();

        let sql = query::update_by_key(Dialect::Postgres, schema, &columns);
        log::debug!("{}", sql);

        let mut sqlx_query = sqlx::query(&sql);
        for (_, field_type, value) in &typed {
            sqlx_query = bind_value(sqlx_query, *field_type, value);
        }
        sqlx_query = bind_value(sqlx_query, FieldType::Integer, id);

        let row = sqlx_query
            .fetch_optional(pool)
            .await?
            .ok_or(DbError::NotFound)?;

        decode_record(&row, schema)
    }

    async fn delete_by_key(&self, schema: &ModelSchema, id: &Value) -> Result<(), DbError> {
        let pool = self.get_pool()?;
        let sql = query::delete_by_key(Dialect::Postgres, schema);

        let result = bind_value(sqlx::query(&sql), FieldType::Integer, id)
            .execute(pool)
            .await?;

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
