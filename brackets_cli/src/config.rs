//! Driver configuration management.
//!
//! Consolidates environment variable reads and command-line overrides into
//! one validated configuration.

use brackets::{
    bracket::{GrandFinalType, StageFormat, StageSettings},
    seeding::SeedingStrategy,
    stage::ManagerConfig,
    store::DatabaseConfig,
};
use std::path::PathBuf;

/// Values given on the command line; they win over the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub name: Option<String>,
    pub format: Option<String>,
    pub seeding: Option<String>,
    pub grand_final: Option<String>,
    pub matches_per_pair: Option<u32>,
    pub unbalanced_byes: bool,
    pub skip_first_round: bool,
    pub participants_file: Option<PathBuf>,
    pub results_file: Option<PathBuf>,
    pub external_id: Option<String>,
    pub postgres: bool,
}

/// Complete driver configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Stage name
    pub name: String,
    /// Bracket format
    pub format: StageFormat,
    /// Seeding strategy applied to the entrant list
    pub seeding: SeedingStrategy,
    /// Format settings
    pub settings: StageSettings,
    /// File with one entrant name per line
    pub participants_file: Option<PathBuf>,
    /// JSON file with results to replay
    pub results_file: Option<PathBuf>,
    /// External identifier to bind to the stage
    pub external_id: Option<String>,
    /// Database settings when the stage should be stored in PostgreSQL
    pub database: Option<DatabaseConfig>,
    /// Stage actor settings
    pub manager: ManagerConfig,
}

impl CliConfig {
    /// Load configuration from environment variables and overrides
    ///
    /// Environment variables:
    /// - `BRACKETS_NAME`: Stage name (default: "Tournament")
    /// - `BRACKETS_FORMAT`: Bracket format (default: single_elimination)
    /// - `BRACKETS_SEEDING`: Seeding strategy (default: natural)
    /// - `BRACKETS_GRAND_FINAL`: `simple` or `double` (default: double)
    /// - `DATABASE_URL` and `DB_*`: only read when `--postgres` is given
    ///
    /// # Errors
    ///
    /// Returns error if a value does not parse or `DATABASE_URL` is missing
    /// while PostgreSQL storage was requested.
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let name = overrides
            .name
            .or_else(|| std::env::var("BRACKETS_NAME").ok())
            .unwrap_or_else(|| "Tournament".to_string());

        let format = match overrides
            .format
            .or_else(|| std::env::var("BRACKETS_FORMAT").ok())
        {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "BRACKETS_FORMAT".to_string(),
                reason: format!(
                    "Unknown format {value:?}; expected single_elimination, double_elimination or round_robin"
                ),
            })?,
            None => StageFormat::SingleElimination,
        };

        // unknown strategies fall back to natural
        let seeding = overrides
            .seeding
            .or_else(|| std::env::var("BRACKETS_SEEDING").ok())
            .map(|value| SeedingStrategy::parse_lenient(&value))
            .unwrap_or_default();

        let grand_final = match overrides
            .grand_final
            .or_else(|| std::env::var("BRACKETS_GRAND_FINAL").ok())
            .as_deref()
        {
            None | Some("double") => GrandFinalType::Double,
            Some("simple") => GrandFinalType::Simple,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "BRACKETS_GRAND_FINAL".to_string(),
                    reason: format!("Expected simple or double, got {other:?}"),
                });
            }
        };

        let settings = StageSettings {
            seed_ordering: seeding,
            balance_byes: !overrides.unbalanced_byes,
            grand_final,
            skip_first_round: overrides.skip_first_round,
            matches_per_pair: overrides.matches_per_pair.unwrap_or(1),
        };

        let database = if overrides.postgres {
            Some(
                DatabaseConfig::from_env().map_err(|_| ConfigError::MissingRequired {
                    var: "DATABASE_URL".to_string(),
                    hint: "Set it in the environment or .env when using --postgres".to_string(),
                })?,
            )
        } else {
            None
        };

        let config = CliConfig {
            name,
            format,
            seeding,
            settings,
            participants_file: overrides.participants_file,
            results_file: overrides.results_file,
            external_id: overrides.external_id,
            database,
            manager: ManagerConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "BRACKETS_NAME".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        self.settings
            .validate(self.format)
            .map_err(|e| ConfigError::Invalid {
                var: "settings".to_string(),
                reason: e.to_string(),
            })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}
