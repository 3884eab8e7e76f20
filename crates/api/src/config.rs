use formaction_core::config::ParseModeError;
use formaction_core::{ActionConfig, RuntimeMode};

/// Failure to read server configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got `{value}`")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("APP_ENV: {0}")]
    Mode(#[from] ParseModeError),
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Deployment flavour; development enables verbose action diagnostics.
    pub app_env: RuntimeMode,
    /// Replacement for the default message shown on unexpected failures.
    pub generic_error_message: Option<String>,
    /// Maximum number of stored contact messages (default: `1000`).
    pub contact_capacity: usize,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default        |
    /// |------------------------|----------------|
    /// | `HOST`                 | `0.0.0.0`      |
    /// | `PORT`                 | `3000`         |
    /// | `REQUEST_TIMEOUT_SECS` | `30`           |
    /// | `APP_ENV`              | `development`  |
    /// | `ACTION_GENERIC_ERROR` | (built-in)     |
    /// | `CONTACT_CAPACITY`     | `1000`         |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_var(&lookup, "PORT", "u16", 3000)?;
        let request_timeout_secs = parse_var(&lookup, "REQUEST_TIMEOUT_SECS", "u64", 30)?;
        let contact_capacity = parse_var(&lookup, "CONTACT_CAPACITY", "usize", 1000)?;

        let app_env = match lookup("APP_ENV") {
            Some(value) => value.parse()?,
            None => RuntimeMode::default(),
        };

        let generic_error_message = lookup("ACTION_GENERIC_ERROR")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            host,
            port,
            request_timeout_secs,
            app_env,
            generic_error_message,
            contact_capacity,
        })
    }

    /// Dispatcher settings derived from this configuration.
    pub fn action_config(&self) -> ActionConfig {
        let config = ActionConfig::new(self.app_env);
        match &self.generic_error_message {
            Some(message) => config.with_generic_message(message.clone()),
            None => config,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value,
        }),
    }
}
