// src/cli/mod.rs
use clap::error::ErrorKind;
use clap::{ArgMatches, Command, CommandFactory, FromArgMatches, Parser};
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{Model, Value};
use crate::schema::SchemaError;

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{ModelCommand, Verb};
pub use handlers::Outcome;

#[derive(Debug, Error)]
pub enum CliError {
    /// Bad command-line input: wrong type, missing required field.
    #[error(transparent)]
    Validation(#[from] clap::Error),

    #[error("{model} with ID {id} not found.")]
    NotFound { model: String, id: Value },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl CliError {
    /// Process exit code: clap's own code for usage errors, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation(err) => err.exit_code(),
            _ => 1,
        }
    }
}

/// Global arguments shared by every generated subcommand group.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "model-cli", author, version, about, long_about = None)]
pub struct Args {
    /// Database URL (sqlite:… or postgres://…); overrides DATABASE_URL
    #[arg(long, short, global = true)]
    pub db: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Root command carrying one generated group per model.
#[derive(Debug, Clone)]
pub struct ModelCli {
    commands: Vec<ModelCommand>,
}

impl ModelCli {
    pub fn new(models: &[Model]) -> Result<Self, SchemaError> {
        let mut commands: Vec<ModelCommand> = Vec::with_capacity(models.len());
        for model in models {
            let command = ModelCommand::new(model)?;
            let globals = Args::command();
            if let Some(field) = command.schema().fields().iter().find(|field| {
                globals
                    .get_arguments()
                    .any(|arg| arg.get_id().as_str() == field.name)
            }) {
                return Err(SchemaError::ReservedName(field.name.clone()));
            }
            if commands.iter().any(|existing| existing.name() == command.name()) {
                return Err(SchemaError::DuplicateModel(command.name()));
            }
            commands.push(command);
        }
        Ok(Self { commands })
    }

    pub fn groups(&self) -> &[ModelCommand] {
        &self.commands
    }

    pub fn group(&self, name: &str) -> Option<&ModelCommand> {
        self.commands.iter().find(|command| command.name() == name)
    }

    pub fn command(&self) -> Command {
        Args::command()
            .subcommand_required(true)
            .arg_required_else_help(true)
            .subcommands(self.commands.iter().map(ModelCommand::command))
    }

    /// Parses `argv` into the global arguments and the full match tree.
    pub fn parse_from<I, T>(&self, argv: I) -> Result<(Args, ArgMatches), CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = self.command().try_get_matches_from(argv)?;
        let args = Args::from_arg_matches(&matches)?;
        Ok((args, matches))
    }

    /// Creates the table of every registered model.
    pub async fn register_all(&self, db: &Database) -> Result<(), CliError> {
        for command in &self.commands {
            db.register(command.schema()).await?;
        }
        Ok(())
    }

    pub async fn run(&self, db: &Database, matches: &ArgMatches) -> Result<Outcome, CliError> {
        let Some((name, group_matches)) = matches.subcommand() else {
            return Err(self
                .command()
                .error(ErrorKind::MissingSubcommand, "a model subcommand is required")
                .into());
        };

        let group = self.group(name).ok_or_else(|| {
            CliError::from(
                self.command()
                    .error(ErrorKind::InvalidSubcommand, format!("unknown model '{}'", name)),
            )
        })?;

        group.dispatch(db, group_matches).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;

    fn models() -> Vec<Model> {
        vec![
            Model::new("User")
                .field(Field::integer("id").primary_key())
                .field(Field::text("name")),
            Model::new("Project")
                .about("Projects owned by users.")
                .field(Field::integer("id").primary_key())
                .field(Field::text("title"))
                .field(Field::integer("owner_id")),
        ]
    }

    #[test]
    fn mounts_one_group_per_model() {
        let cli = ModelCli::new(&models()).unwrap();
        let command = cli.command();
        command.clone().debug_assert();

        let names: Vec<_> = command.get_subcommands().map(|c| c.get_name().to_string()).collect();
        assert_eq!(names, ["user", "project"]);
        assert!(cli.group("project").is_some());
        assert!(cli.group("task").is_none());
    }

    #[test]
    fn rejects_models_sharing_a_command_name() {
        let mut models = models();
        models.push(Model::new("USER").field(Field::integer("id").primary_key()));

        let err = ModelCli::new(&models).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateModel(name) if name == "user"));
    }

    #[test]
    fn rejects_fields_shadowing_global_arguments() {
        let model = Model::new("Server")
            .field(Field::integer("id").primary_key())
            .field(Field::text("db"));

        let err = ModelCli::new(&[model]).unwrap_err();
        assert!(matches!(err, SchemaError::ReservedName(name) if name == "db"));
    }

    #[test]
    fn global_arguments_parse_anywhere() {
        let cli = ModelCli::new(&models()).unwrap();
        let (args, matches) = cli
            .parse_from(["model-cli", "project", "list", "--owner-id", "3", "--json", "--db", "sqlite::memory:"])
            .unwrap();

        assert!(args.json);
        assert_eq!(args.db.as_deref(), Some("sqlite::memory:"));
        assert_eq!(matches.subcommand_name(), Some("project"));
    }

    #[test]
    fn validation_errors_keep_clap_exit_codes() {
        let cli = ModelCli::new(&models()).unwrap();

        let err = cli.parse_from(["model-cli", "user", "create"]).unwrap_err();
        assert!(matches!(&err, CliError::Validation(e) if e.kind() == ErrorKind::MissingRequiredArgument));
        assert_eq!(err.exit_code(), 2);

        let err = cli.parse_from(["model-cli", "user", "get", "x"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn not_found_message_names_model_and_key() {
        let err = CliError::NotFound {
            model: "USER".to_string(),
            id: Value::Integer(7),
        };
        assert_eq!(err.to_string(), "USER with ID 7 not found.");
        assert_eq!(err.exit_code(), 1);
    }
}
