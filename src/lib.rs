//! Command-line management interface generated from data model descriptions.
//!
//! A [`Model`] lists named, typed fields. [`ModelCommand`] turns one model
//! into a `clap` subcommand group with `create`, `list`, `get`, `update` and
//! `delete` verbs whose flags mirror the fields, and dispatches parsed
//! matches to a [`Database`]. [`ModelCli`] mounts several groups under one
//! root command.
//!
//! ```no_run
//! use model_cli::{Database, Field, Model, ModelCli};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let user = Model::new("User")
//!     .field(Field::integer("id").primary_key())
//!     .field(Field::text("name"))
//!     .field(Field::boolean("active").default_value(true));
//!
//! let cli = ModelCli::new(&[user])?;
//! let db = Database::new("sqlite:./data/users.db").await?;
//! cli.register_all(&db).await?;
//!
//! let (_, matches) = cli.parse_from(["app", "user", "create", "--name", "Alice"])?;
//! let outcome = cli.run(&db, &matches).await?;
//! println!("{}", model_cli::cli::output::render(&outcome));
//! db.close().await;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod schema;
pub mod utils;

pub use cli::{Args, CliError, ModelCli, ModelCommand, Outcome, Verb};
pub use config::Config;
pub use db::{Database, DbError};
pub use models::{Field, FieldType, Model, Record, SchemaFile, Value};
pub use schema::{ModelSchema, SchemaError};
