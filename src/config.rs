// src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use log::LevelFilter;

const SCHEMA_FILENAME: &str = "models.json";

// Configuration for the generated command line
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // Database
    pub database_url: String,

    // Models
    pub schema_path: PathBuf,

    // Output
    pub json_output: bool,

    // Logging
    pub log_level: LevelFilter,
    pub log_file: Option<PathBuf>,

    /// Problems found while loading; logged once the logger is installed.
    pub warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./data/models.db".to_string(),
            schema_path: PathBuf::from(SCHEMA_FILENAME),
            json_output: false,
            log_level: LevelFilter::Warn,
            log_file: None,
            warnings: Vec::new(),
        }
    }
}

fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

impl Config {
    // Load configuration from environment variables
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `load` uses the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        // Database
        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }

        // Models: explicit path, then the working directory, then the user's
        // config directory.
        if let Some(path) = lookup("MODEL_SCHEMA") {
            config.schema_path = PathBuf::from(path);
        } else if !Path::new(SCHEMA_FILENAME).exists() {
            if let Some(dir) = crate::utils::get_app_config_dir() {
                let candidate = dir.join(SCHEMA_FILENAME);
                if candidate.exists() {
                    config.schema_path = candidate;
                }
            }
        }

        // Output
        if let Some(val) = lookup("OUTPUT_JSON") {
            match val.parse() {
                Ok(json) => config.json_output = json,
                Err(_) => config
                    .warnings
                    .push(format!("Ignoring OUTPUT_JSON='{}', expected true or false", val)),
            }
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            match parse_level(&level) {
                Some(level) => config.log_level = level,
                None => config
                    .warnings
                    .push(format!("Unknown log level '{}', using {}", level, config.log_level)),
            }
        }

        if let Some(file) = lookup("LOG_FILE") {
            if !file.trim().is_empty() {
                config.log_file = Some(PathBuf::from(file));
            }
        }

        config
    }

    // Create directories needed for operation
    pub fn ensure_directories_exist(&mut self) {
        if let Some(parent) = self.log_file.as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    self.warnings.push(format!("Failed to create log directory: {}", e));
                }
            }
        }
    }
}
