use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::process;

use anyhow::Context;

use model_cli::cli::output;
use model_cli::{db, CliError, Config, ModelCli, SchemaFile};

fn init_logging(config: &Config) -> io::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(config.log_level)
        .format_timestamp_secs()
        .format_module_path(true)
        .format_target(true);

    if let Some(path) = &config.log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

async fn run(config: &Config) -> anyhow::Result<()> {
    let schema = SchemaFile::from_path(&config.schema_path).with_context(|| {
        format!(
            "Failed to load model schema from {} (set MODEL_SCHEMA to point at your models.json)",
            config.schema_path.display()
        )
    })?;
    let app = ModelCli::new(&schema.models).context("Invalid model schema")?;
    log::debug!("Loaded {} model(s)", app.groups().len());

    let (args, matches) = app.parse_from(std::env::args_os())?;

    let db_url = args.db.clone().unwrap_or_else(|| config.database_url.clone());
    log::info!("Connecting to database: {}", db_url);
    let db = db::init_db(&db_url)
        .await
        .with_context(|| format!("Database connection failed for {}", db_url))?;

    // The connection is closed whatever the outcome.
    let result = match app.register_all(&db).await {
        Ok(()) => app.run(&db, &matches).await,
        Err(e) => Err(e),
    };
    log::debug!("Closing {} connection", db.get_backend_type());
    db.close().await;

    output::print_outcome(&result?, args.json || config.json_output)?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load environment variables
    if Path::new(".env").exists() {
        dotenvy::dotenv().ok();
    }

    let mut config = Config::load();
    config.ensure_directories_exist();

    if let Err(e) = init_logging(&config) {
        eprintln!("Failed to open log file: {}", e);
    }
    for warning in &config.warnings {
        log::warn!("{}", warning);
    }

    if let Err(err) = run(&config).await {
        let code = match err.downcast_ref::<CliError>() {
            Some(CliError::Validation(e)) => e.exit(),
            Some(cli_error @ CliError::NotFound { .. }) => {
                output::print_error(&cli_error.to_string());
                cli_error.exit_code()
            }
            Some(cli_error) => {
                log::error!("{}", cli_error);
                output::print_error(&cli_error.to_string());
                cli_error.exit_code()
            }
            None => {
                log::error!("{:#}", err);
                output::print_error(&format!("{:#}", err));
                1
            }
        };
        process::exit(code);
    }
}
