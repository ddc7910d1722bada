// src/db/query.rs
//
// SQL text for the generated CRUD operations. Identifiers come from an
// inspected `ModelSchema` and are always plain identifiers; values are never
// interpolated, only bound.
use crate::models::FieldType;
use crate::schema::{FieldDescriptor, ModelSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Placeholder for the 1-based parameter `index`.
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Sqlite => "?".to_string(),
            Dialect::Postgres => format!("${}", index),
        }
    }

    fn column_type(self, field: &FieldDescriptor) -> &'static str {
        match (self, field.field_type) {
            (Dialect::Sqlite, FieldType::Integer) => "INTEGER",
            (Dialect::Sqlite, FieldType::Float) => "REAL",
            (Dialect::Sqlite, FieldType::Boolean) => "BOOLEAN",
            // Timestamps and dates are stored as RFC 3339 / ISO 8601 text.
            (Dialect::Sqlite, FieldType::Text | FieldType::DateTime | FieldType::Date) => "TEXT",
            (Dialect::Postgres, FieldType::Integer) => "BIGINT",
            (Dialect::Postgres, FieldType::Float) => "DOUBLE PRECISION",
            (Dialect::Postgres, FieldType::Boolean) => "BOOLEAN",
            (Dialect::Postgres, FieldType::Text) => "TEXT",
            (Dialect::Postgres, FieldType::DateTime) => "TIMESTAMPTZ",
            (Dialect::Postgres, FieldType::Date) => "DATE",
        }
    }

    fn primary_key_column(self) -> &'static str {
        match self {
            Dialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Dialect::Postgres => "BIGSERIAL PRIMARY KEY",
        }
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

fn column_list(schema: &ModelSchema) -> String {
    schema
        .fields()
        .iter()
        .map(|field| quote(&field.name))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn create_table(dialect: Dialect, schema: &ModelSchema) -> String {
    let columns = schema
        .fields()
        .iter()
        .map(|field| {
            if field.primary_key {
                format!("{} {}", quote(&field.name), dialect.primary_key_column())
            } else if field.nullable {
                format!("{} {}", quote(&field.name), dialect.column_type(field))
            } else {
                format!("{} {} NOT NULL", quote(&field.name), dialect.column_type(field))
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(schema.table()),
        columns
    )
}

pub fn insert(dialect: Dialect, schema: &ModelSchema, columns: &[&str]) -> String {
    if columns.is_empty() {
        return format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quote(schema.table()),
            column_list(schema)
        );
    }

    let names = columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| dialect.placeholder(i))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quote(schema.table()),
        names,
        placeholders,
        column_list(schema)
    )
}

/// `SELECT` over the whole table with one equality condition per filter
/// column, ordered by primary key.
pub fn select(dialect: Dialect, schema: &ModelSchema, filters: &[&str]) -> String {
    let mut query = format!(
        "SELECT {} FROM {}",
        column_list(schema),
        quote(schema.table())
    );

    if !filters.is_empty() {
        let conditions = filters
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = {}", quote(column), dialect.placeholder(i + 1)))
            .collect::<Vec<_>>()
            .join(" AND ");
        query.push_str(" WHERE ");
        query.push_str(&conditions);
    }

    query.push_str(&format!(" ORDER BY {} ASC", quote(&schema.primary_key().name)));
    query
}

pub fn select_by_key(dialect: Dialect, schema: &ModelSchema) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = {}",
        column_list(schema),
        quote(schema.table()),
        quote(&schema.primary_key().name),
        dialect.placeholder(1)
    )
}

/// `UPDATE` of the given columns; the key is bound after them.
pub fn update_by_key(dialect: Dialect, schema: &ModelSchema, columns: &[&str]) -> String {
    let assignments = columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = {}", quote(column), dialect.placeholder(i + 1)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        quote(schema.table()),
        assignments,
        quote(&schema.primary_key().name),
        dialect.placeholder(columns.len() + 1),
        column_list(schema)
    )
}

pub fn delete_by_key(dialect: Dialect, schema: &ModelSchema) -> String {
    format!(
        "DELETE FROM {} WHERE {} = {}",
        quote(schema.table()),
        quote(&schema.primary_key().name),
        dialect.placeholder(1)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, Model};
    use crate::schema::inspect;

    fn schema() -> ModelSchema {
        inspect(
            &Model::new("User")
                .table("users")
                .field(Field::integer("id").primary_key())
                .field(Field::text("name"))
                .field(Field::boolean("active").default_value(true))
                .field(Field::datetime("seen_at").nullable()),
        )
        .unwrap()
    }

    #[test]
    fn create_table_per_dialect() {
        assert_eq!(
            create_table(Dialect::Sqlite, &schema()),
            "CREATE TABLE IF NOT EXISTS \"users\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"name\" TEXT NOT NULL, \"active\" BOOLEAN NOT NULL, \"seen_at\" TEXT)"
        );
        assert_eq!(
            create_table(Dialect::Postgres, &schema()),
            "CREATE TABLE IF NOT EXISTS \"users\" (\"id\" BIGSERIAL PRIMARY KEY, \
             \"name\" TEXT NOT NULL, \"active\" BOOLEAN NOT NULL, \"seen_at\" TIMESTAMPTZ)"
        );
    }

    #[test]
    fn insert_returns_every_column() {
        assert_eq!(
            insert(Dialect::Postgres, &schema(), &["name", "active"]),
            "INSERT INTO \"users\" (\"name\", \"active\") VALUES ($1, $2) \
             RETURNING \"id\", \"name\", \"active\", \"seen_at\""
        );
        assert_eq!(
            insert(Dialect::Sqlite, &schema(), &[]),
            "INSERT INTO \"users\" DEFAULT VALUES RETURNING \"id\", \"name\", \"active\", \"seen_at\""
        );
    }

    #[test]
    fn select_adds_filters_in_order() {
        assert_eq!(
            select(Dialect::Sqlite, &schema(), &[]),
            "SELECT \"id\", \"name\", \"active\", \"seen_at\" FROM \"users\" ORDER BY \"id\" ASC"
        );
        assert_eq!(
            select(Dialect::Postgres, &schema(), &["name", "active"]),
            "SELECT \"id\", \"name\", \"active\", \"seen_at\" FROM \"users\" \
             WHERE \"name\" = $1 AND \"active\" = $2 ORDER BY \"id\" ASC"
        );
    }

    #[test]
    fn update_binds_key_last() {
        assert_eq!(
            update_by_key(Dialect::Postgres, &schema(), &["name"]),
            "UPDATE \"users\" SET \"name\" = $1 WHERE \"id\" = $2 \
             RETURNING \"id\", \"name\", \"active\", \"seen_at\""
        );
        assert_eq!(
            delete_by_key(Dialect::Sqlite, &schema()),
            "DELETE FROM \"users\" WHERE \"id\" = ?"
        );
        assert_eq!(
            select_by_key(Dialect::Sqlite, &schema()),
            "SELECT \"id\", \"name\", \"active\", \"seen_at\" FROM \"users\" WHERE \"id\" = ?"
        );
    }
}
