// src/db/mod.rs
use thiserror::Error;

use crate::models::{Record, Value};
use crate::schema::ModelSchema;

pub mod postgres;
pub mod query;
pub mod sqlite;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    SqlxError(String),

    #[error("Record not found")]
    NotFound,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Unknown column {table}.{column}")]
    UnknownColumn { table: String, column: String },

    #[error("Cannot store {value} in column {column}: {reason}")]
    UnsupportedValue {
        column: String,
        value: String,
        reason: String,
    },
}

// Convert database-specific errors to our DbError
impl From<sqlx::Error> for DbError {
    fn from(error: sqlx::Error) -> Self {
        DbError::SqlxError(error.to_string())
    }
}

/// Column name and value pairs handed to the backends. Names must belong to
/// the schema the call is made with.
pub type Assignments = [(String, Value)];

// Database backend trait - implemented by each database type
pub trait DatabaseBackend: Send + Sync {
    async fn init(&mut self, connection_string: &str) -> Result<(), DbError>;

    /// Creates the model's table if it does not exist yet.
    async fn register(&self, schema: &ModelSchema) -> Result<(), DbError>;

    async fn insert(&self, schema: &ModelSchema, values: &Assignments) -> Result<Record, DbError>;

    async fn fetch_all(&self, schema: &ModelSchema, filters: &Assignments) -> Result<Vec<Record>, DbError>;

    async fn fetch_by_key(&self, schema: &ModelSchema, id: &Value) -> Result<Record, DbError>;

    async fn update_by_key(
        &self,
        schema: &ModelSchema,
        id: &Value,
        changes: &Assignments,
    ) -> Result<Record, DbError>;

    async fn delete_by_key(&self, schema: &ModelSchema, id: &Value) -> Result<(), DbError>;

    async fn close(&self);
}

// Enum to hold specific backend implementations
#[derive(Debug, Clone)]
pub enum DatabaseType {
    Postgres(postgres::PostgresBackend),
    Sqlite(sqlite::SqliteBackend),
}

/// Handle on the persistence layer. Opening and closing it is up to the
/// embedding application.
#[derive(Debug, Clone)]
pub struct Database {
    pub backend: DatabaseType,
}

impl Database {
    /// Connects to the backend named by the URL scheme.
    pub async fn new(connection_string: &str) -> Result<Self, DbError> {
        if connection_string.starts_with("sqlite:") {
            let mut backend = sqlite::SqliteBackend::new();
            backend.init(connection_string).await?;
            Ok(Self {
                backend: DatabaseType::Sqlite(backend),
            })
        } else if connection_string.starts_with("postgres:")
            || connection_string.starts_with("postgresql:")
        {
            let mut backend = postgres::PostgresBackend::new();
            backend.init(connection_string).await?;
            Ok(Self {
                backend: DatabaseType::Postgres(backend),
            })
        } else {
            Err(DbError::ConfigError(format!(
                "Unsupported database URL '{}': expected sqlite: or postgres:",
                connection_string
            )))
        }
    }

    pub async fn register(&self, schema: &ModelSchema) -> Result<(), DbError> {
        match &self.backend {
            DatabaseType::Postgres(backend) => backend.register(schema).await,
            DatabaseType::Sqlite(backend) => backend.register(schema).await,
        }
    }

    pub async fn insert(&self, schema: &ModelSchema, values: &Assignments) -> Result<Record, DbError> {
        match &self.backend {
            DatabaseType::Postgres(backend) => backend.insert(schema, values).await,
            DatabaseType::Sqlite(backend) => backend.insert(schema, values).await,
        }
    }

    pub async fn fetch_all(&self, schema: &ModelSchema, filters: &Assignments) -> Result<Vec<Record>, DbError> {
        match &self.backend {
            DatabaseType::Postgres(backend) => backend.fetch_all(schema, filters).await,
            DatabaseType::Sqlite(backend) => backend.fetch_all(schema, filters).await,
        }
    }

    pub async fn fetch_by_key(&self, schema: &ModelSchema, id: &Value) -> Result<Record, DbError> {
        match &self.backend {
            DatabaseType::Postgres(backend) => backend.fetch_by_key(schema, id).await,
            DatabaseType::Sqlite(backend) => backend.fetch_by_key(schema, id).await,
        }
    }

    pub async fn update_by_key(
        &self,
        schema: &ModelSchema,
        id: &Value,
        changes: &Assignments,
    ) -> Result<Record, DbError> {
        match &self.backend {
            DatabaseType::Postgres(backend) => backend.update_by_key(schema, id, changes).await,
            DatabaseType::Sqlite(backend) => backend.update_by_key(schema, id, changes).await,
        }
    }

    pub async fn delete_by_key(&self, schema: &ModelSchema, id: &Value) -> Result<(), DbError> {
        match &self.backend {
            DatabaseType::Postgres(backend) => backend.delete_by_key(schema, id).await,
            DatabaseType::Sqlite(backend) => backend.delete_by_key(schema, id).await,
        }
    }

    pub async fn close(&self) {
        match &self.backend {
            DatabaseType::Postgres(backend) => backend.close().await,
            DatabaseType::Sqlite(backend) => backend.close().await,
        }
    }

    pub fn get_backend_type(&self) -> &str {
        match &self.backend {
            DatabaseType::Sqlite(_) => "SQLite",
            DatabaseType::Postgres(_) => "PostgreSQL",
        }
    }
}

/// Resolves the declared type of every assigned column, so backends can bind
/// typed NULLs.
fn column_types<'a>(
    schema: &'a ModelSchema,
    values: &'a Assignments,
) -> Result<Vec<(&'a str, crate::models::FieldType, &'a Value)>, DbError> {
    values
        .iter()
        .map(|(name, value)| {
            schema
                .field(name)
                .map(|field| (field.name.as_str(), field.field_type, value))
                .ok_or_else(|| DbError::UnknownColumn {
                    table: schema.table().to_string(),
                    column: name.clone(),
                })
        })
        .collect()
}

// Function to initialize the database
pub async fn init_db(db_url: &str) -> Result<Database, DbError> {
    Database::new(db_url).await
}
