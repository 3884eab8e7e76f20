//! Dispatcher configuration, threaded into builders at construction.

use std::fmt;
use std::str::FromStr;

/// Message shown in place of any unexpected failure.
pub const DEFAULT_GENERIC_MESSAGE: &str = "Something went wrong. We have been notified!";

/// Deployment flavour of the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    #[default]
    Development,
    Staging,
    Test,
    Production,
}

impl RuntimeMode {
    /// Development-like builds emit extra local diagnostics.
    pub fn is_development(self) -> bool {
        matches!(self, RuntimeMode::Development)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeMode::Development => "development",
            RuntimeMode::Staging => "staging",
            RuntimeMode::Test => "test",
            RuntimeMode::Production => "production",
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown runtime mode `{0}` (expected development, staging, test or production)")]
pub struct ParseModeError(String);

impl FromStr for RuntimeMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(RuntimeMode::Development),
            "staging" => Ok(RuntimeMode::Staging),
            "test" => Ok(RuntimeMode::Test),
            "production" => Ok(RuntimeMode::Production),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Settings every handler built from a builder shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionConfig {
    pub mode: RuntimeMode,
    /// Form-level message returned for unexpected failures.
    pub generic_message: String,
}

impl ActionConfig {
    pub fn new(mode: RuntimeMode) -> Self {
        Self {
            mode,
            generic_message: DEFAULT_GENERIC_MESSAGE.to_string(),
        }
    }

    pub fn with_generic_message(mut self, message: impl Into<String>) -> Self {
        self.generic_message = message.into();
        self
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self::new(RuntimeMode::default())
    }
}
