//! Agent settings, loaded from the environment

use std::env;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::errors::AgentError;
use crate::logs::LogLevel;

/// Agent settings
///
/// Everything the agent needs to drive the Beta environment: the API
/// credential, git credentials for the application checkout, filesystem
/// paths, and the target container/image names.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Static bearer token expected on every mutating request
    pub api_key: SecretString,

    /// Username for authenticated git remote access
    pub git_username: String,

    /// Access token for authenticated git remote access
    pub git_token: SecretString,

    /// Path to the application checkout
    pub repo_dir: PathBuf,

    /// Path to the docker compose root (defaults to the checkout)
    pub compose_dir: PathBuf,

    /// Mainline branch name
    pub main_branch: String,

    /// Application image removed and rebuilt on deploy
    pub app_image: String,

    /// Name of the running application container
    pub container_name: String,

    /// Path to the application database file inside the container
    pub db_path: String,

    /// Host to bind to
    pub bind_host: String,

    /// Port to listen on
    pub bind_port: u16,

    /// Log level
    pub log_level: LogLevel,

    /// Emit logs in JSON format
    pub log_json: bool,
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// Required: `API_KEY`, `GIT_USERNAME`, `GIT_TOKEN`, `REPO_DIR`,
    /// `APP_IMAGE`, `CONTAINER_NAME`, `DB_PATH`. The rest have defaults.
    pub fn from_env() -> Result<Self, AgentError> {
        let repo_dir = PathBuf::from(required("REPO_DIR")?);
        let compose_dir = match env::var("COMPOSE_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => repo_dir.clone(),
        };

        let bind_port = match env::var("BIND_PORT") {
            Ok(port) => port
                .parse::<u16>()
                .map_err(|_| AgentError::ConfigError(format!("BIND_PORT is not a valid port: {}", port)))?,
            Err(_) => 8080,
        };

        let log_level = match env::var("LOG_LEVEL") {
            Ok(level) => level.parse::<LogLevel>().map_err(AgentError::ConfigError)?,
            Err(_) => LogLevel::default(),
        };

        Ok(Self {
            api_key: SecretString::from(required("API_KEY")?),
            git_username: required("GIT_USERNAME")?,
            git_token: SecretString::from(required("GIT_TOKEN")?),
            repo_dir,
            compose_dir,
            main_branch: env::var("MAIN_BRANCH").unwrap_or_else(|_| "main".to_string()),
            app_image: required("APP_IMAGE")?,
            container_name: required("CONTAINER_NAME")?,
            db_path: required("DB_PATH")?,
            bind_host: env::var("BIND_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            bind_port,
            log_level,
            log_json: env::var("LOG_JSON").is_ok_and(|value| flag(&value)),
        })
    }
}

fn flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn required(name: &str) -> Result<String, AgentError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AgentError::ConfigError(format!("{} must be set", name))),
    }
}
