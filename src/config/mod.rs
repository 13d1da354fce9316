//! Application configuration.
//!
//! Everything is read from environment variables with the
//! `PROSPECT_CONCIERGE` prefix; nested values use `__` as the separator.
//! A `.env` file is honoured in development.
//!
//! # Example
//!
//! ```no_run
//! use prospect_concierge::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod ai;
mod assistant;
mod auth;
mod database;
mod error;
mod messaging;
mod server;

pub use ai::{AiConfig, AiProvider};
pub use assistant::AssistantConfig;
pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use messaging::MessagingConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

const ENV_PREFIX: &str = "PROSPECT_CONCIERGE";

/// Root application configuration. Load with [`AppConfig::load()`].
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Conversation and message stores
    pub database: DatabaseConfig,

    /// Agent dashboard tokens
    #[serde(default)]
    pub auth: AuthConfig,

    /// Language-model providers; optional
    #[serde(default)]
    pub ai: AiConfig,

    /// Outbound phone messages
    #[serde(default)]
    pub messaging: MessagingConfig,

    /// Persona and history window
    #[serde(default)]
    pub assistant: AssistantConfig,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// - `PROSPECT_CONCIERGE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PROSPECT_CONCIERGE__DATABASE__URL=...` -> `database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required value is missing or a value
    /// cannot be parsed into its field type.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation of every section.
    ///
    /// Missing language-model keys are accepted; the assistant degrades
    /// to its fallback reply instead.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.ai.validate()?;
        self.messaging.validate()?;
        self.assistant.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
