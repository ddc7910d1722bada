// src/cli/commands.rs
use std::fmt;

use clap::error::ErrorKind;
use clap::{ArgMatches, Command};

use crate::db::Database;
use crate::models::Model;
use crate::schema::mapper::key_arg;
use crate::schema::{inspect, options_for, ModelSchema, OptionRole, SchemaError};

use super::handlers::{self, Outcome};
use super::CliError;

/// The five operations every generated group offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    List,
    Get,
    Update,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Create, Verb::List, Verb::Get, Verb::Update, Verb::Delete];

    pub fn name(&self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::List => "list",
            Verb::Get => "get",
            Verb::Update => "update",
            Verb::Delete => "delete",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|verb| verb.name() == name)
    }

    fn alias(&self) -> Option<&'static str> {
        match self {
            Verb::Get => Some("show"),
            Verb::Update => Some("edit"),
            _ => None,
        }
    }

    fn about(&self, model: &str) -> String {
        match self {
            Verb::Create => format!("Create a new {} instance.", model),
            Verb::List => format!("List all {} instances.", model),
            Verb::Get => format!("Show a specific {} instance.", model),
            Verb::Update => format!("Edit an existing {} instance.", model),
            Verb::Delete => format!("Delete a specific {} instance.", model),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Subcommand group for one model.
///
/// [`ModelCommand::command`] yields a `clap::Command` that can be mounted
/// under any parent command; the matches for that subcommand are then handed
/// to [`ModelCommand::dispatch`].
#[derive(Debug, Clone)]
pub struct ModelCommand {
    schema: ModelSchema,
}

impl ModelCommand {
    pub fn new(model: &Model) -> Result<Self, SchemaError> {
        Ok(Self {
            schema: inspect(model)?,
        })
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn name(&self) -> String {
        self.schema.command_name()
    }

    pub fn command(&self) -> Command {
        let display = self.schema.display_name();
        let about = self
            .schema
            .about()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Manage {} instances.", display));

        Command::new(self.name())
            .about(about)
            .subcommand_required(true)
            .arg_required_else_help(true)
            .subcommands(Verb::ALL.iter().map(|verb| self.verb_command(*verb)))
    }

    fn verb_command(&self, verb: Verb) -> Command {
        let mut command = Command::new(verb.name()).about(verb.about(&self.schema.display_name()));
        if let Some(alias) = verb.alias() {
            command = command.visible_alias(alias);
        }

        match verb {
            Verb::Create => command.args(
                options_for(&self.schema, OptionRole::Create)
                    .iter()
                    .map(|option| option.to_arg()),
            ),
            Verb::List => command.args(
                options_for(&self.schema, OptionRole::Filter)
                    .iter()
                    .map(|option| option.to_arg()),
            ),
            Verb::Get | Verb::Delete => command.arg(key_arg(&self.schema)),
            Verb::Update => command.arg(key_arg(&self.schema)).args(
                options_for(&self.schema, OptionRole::Update)
                    .iter()
                    .map(|option| option.to_arg()),
            ),
        }
    }

    /// Runs the verb selected in `matches`, which must come from this
    /// group's [`command`](Self::command).
    pub async fn dispatch(&self, db: &Database, matches: &ArgMatches) -> Result<Outcome, CliError> {
        let Some((name, verb_matches)) = matches.subcommand() else {
            return Err(self
                .command()
                .error(ErrorKind::MissingSubcommand, "a subcommand is required")
                .into());
        };
        let verb = Verb::from_name(name).ok_or_else(|| {
            CliError::from(
                self.command()
                    .error(ErrorKind::InvalidSubcommand, format!("unknown subcommand '{}'", name)),
            )
        })?;

        log::debug!("Dispatching {} {}", self.name(), verb);

        match verb {
            Verb::Create => handlers::handle_create(db, &self.schema, verb_matches)
                .await
                .map(Outcome::Created),
            Verb::List => handlers::handle_list(db, &self.schema, verb_matches).await,
            Verb::Get => handlers::handle_get(db, &self.schema, verb_matches)
                .await
                .map(Outcome::Shown),
            Verb::Update => handlers::handle_update(db, &self.schema, verb_matches)
                .await
                .map(Outcome::Updated),
            Verb::Delete => handlers::handle_delete(db, &self.schema, verb_matches).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, Value};

    fn user() -> ModelCommand {
        ModelCommand::new(
            &Model::new("User")
                .field(Field::integer("id").primary_key())
                .field(Field::text("name"))
                .field(Field::boolean("active").default_value(true)),
        )
        .unwrap()
    }

    #[test]
    fn generates_exactly_the_five_verbs() {
        for model in [
            Model::new("Tag").field(Field::integer("id").primary_key()),
            Model::new("Label").field(Field::text("label")),
            Model::new("User")
                .field(Field::integer("id").primary_key())
                .field(Field::text("name")),
        ] {
            let command = ModelCommand::new(&model).unwrap().command();
            let mut names: Vec<_> = command.get_subcommands().map(|c| c.get_name().to_string()).collect();
            names.sort();
            assert_eq!(names, ["create", "delete", "get", "list", "update"]);
        }
    }

    #[test]
    fn group_is_named_after_the_model() {
        let command = user().command();
        assert_eq!(command.get_name(), "user");
        assert_eq!(
            command.get_about().map(|about| about.to_string()),
            Some("Manage USER instances.".to_string())
        );
    }

    #[test]
    fn command_definition_is_consistent() {
        user().command().debug_assert();
    }

    #[test]
    fn create_requires_fields_without_defaults() {
        let command = user().command();

        let matches = command
            .clone()
            .try_get_matches_from(["user", "create", "--name", "Alice"])
            .unwrap();
        let (verb, create) = matches.subcommand().unwrap();
        assert_eq!(verb, "create");
        assert_eq!(create.get_one::<Value>("name"), Some(&Value::from("Alice")));
        assert_eq!(create.get_one::<Value>("active"), None);

        let err = command.try_get_matches_from(["user", "create"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn create_has_no_primary_key_option() {
        let err = user()
            .command()
            .try_get_matches_from(["user", "create", "--name", "A", "--id", "4"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn update_takes_key_and_optional_fields() {
        let matches = user()
            .command()
            .try_get_matches_from(["user", "update", "3", "--active", "false"])
            .unwrap();
        let (_, update) = matches.subcommand().unwrap();
        assert_eq!(update.get_one::<Value>("id"), Some(&Value::Integer(3)));
        assert_eq!(update.get_one::<Value>("name"), None);
        assert_eq!(update.get_one::<Value>("active"), Some(&Value::Boolean(false)));
    }

    #[test]
    fn aliases_resolve_to_canonical_verbs() {
        let command = user().command();

        let matches = command.clone().try_get_matches_from(["user", "show", "1"]).unwrap();
        assert_eq!(matches.subcommand_name(), Some("get"));

        let matches = command
            .try_get_matches_from(["user", "edit", "1", "--name", "Bob"])
            .unwrap();
        assert_eq!(matches.subcommand_name(), Some("update"));
    }

    #[test]
    fn bad_values_are_usage_errors() {
        let command = user().command();

        let err = command
            .clone()
            .try_get_matches_from(["user", "get", "one"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert_eq!(err.exit_code(), 2);

        let err = command
            .try_get_matches_from(["user", "list", "--active", "yes"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn verbs_round_trip_through_names() {
        for verb in Verb::ALL {
            assert_eq!(Verb::from_name(verb.name()), Some(verb));
        }
        assert_eq!(Verb::from_name("show"), None);
    }
}
