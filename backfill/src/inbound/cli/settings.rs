//! Backfill configuration loaded via OrthoConfig.
//!
//! Values come from `BACKFILL_*` environment variables and configuration
//! files; the command line may override the two database URLs.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::{DEFAULT_ADJACENCY_WINDOW_MS, DEFAULT_ID_BLOCK_SIZE};

/// Errors raised while resolving settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A required setting was not provided.
    #[error("missing required setting `{name}`")]
    Missing {
        /// Setting name.
        name: &'static str,
    },
    /// A database URL could not be parsed or is not a PostgreSQL URL.
    #[error("setting `{name}` is not a PostgreSQL URL: {message}")]
    InvalidUrl {
        /// Setting name.
        name: &'static str,
        /// Parse or scheme failure.
        message: String,
    },
    /// A numeric setting is out of range.
    #[error("setting `{name}` must be at least 1")]
    Zero {
        /// Setting name.
        name: &'static str,
    },
}

/// Raw configuration values controlling the backfill tools.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "BACKFILL")]
pub struct BackfillSettings {
    /// Primary store holding the change log, rows and associations.
    pub database_url: Option<String>,
    /// Store allocating transaction ids.
    pub id_generator_url: Option<String>,
    /// Changes read per change-log page.
    #[ortho_config(default = 10_000)]
    pub page_size: u32,
    /// Adjacency window in milliseconds.
    #[ortho_config(default = 60_000)]
    pub adjacency_window_ms: u64,
    /// Transaction ids reserved per round-trip; 1 disables block reservation.
    #[ortho_config(default = 1_000)]
    pub id_block_size: u32,
    /// Changes listed per sweep batch.
    #[ortho_config(default = 10_000)]
    pub sweep_batch_size: u32,
    /// Maximum connections per store pool.
    #[ortho_config(default = 4)]
    pub pool_max_size: u32,
}

/// Command-line overrides for [`BackfillSettings`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    /// Replaces `database_url` when set.
    pub database_url: Option<String>,
    /// Replaces `id_generator_url` when set.
    pub id_generator_url: Option<String>,
}

/// Validated settings ready for wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    /// Primary store URL.
    pub database_url: String,
    /// Id-generation store URL.
    pub id_generator_url: String,
    /// Changes read per change-log page.
    pub page_size: u32,
    /// Adjacency window in milliseconds.
    pub adjacency_window_ms: u64,
    /// Transaction ids reserved per round-trip.
    pub id_block_size: u32,
    /// Changes listed per sweep batch.
    pub sweep_batch_size: u32,
    /// Maximum connections per store pool.
    pub pool_max_size: u32,
}

impl BackfillSettings {
    /// Apply `overrides` and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when a URL is missing or not a PostgreSQL
    /// URL, or when a size is zero.
    pub fn resolve(self, overrides: SettingsOverrides) -> Result<ResolvedSettings, SettingsError> {
        let database_url = required_postgres_url(
            "database_url",
            overrides.database_url.or(self.database_url),
        )?;
        let id_generator_url = required_postgres_url(
            "id_generator_url",
            overrides.id_generator_url.or(self.id_generator_url),
        )?;

        Ok(ResolvedSettings {
            database_url,
            id_generator_url,
            page_size: non_zero("page_size", self.page_size)?,
            adjacency_window_ms: self.adjacency_window_ms,
            id_block_size: non_zero("id_block_size", self.id_block_size)?,
            sweep_batch_size: non_zero("sweep_batch_size", self.sweep_batch_size)?,
            pool_max_size: non_zero("pool_max_size", self.pool_max_size)?,
        })
    }
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            id_generator_url: None,
            page_size: pagination::DEFAULT_PAGE_LIMIT,
            adjacency_window_ms: DEFAULT_ADJACENCY_WINDOW_MS.unsigned_abs(),
            id_block_size: DEFAULT_ID_BLOCK_SIZE,
            sweep_batch_size: pagination::DEFAULT_PAGE_LIMIT,
            pool_max_size: 4,
        }
    }
}

fn required_postgres_url(
    name: &'static str,
    raw: Option<String>,
) -> Result<String, SettingsError> {
    let raw = raw
        .filter(|value| !value.trim().is_empty())
        .ok_or(SettingsError::Missing { name })?;
    let parsed = Url::parse(raw.trim()).map_err(|err| SettingsError::InvalidUrl {
        name,
        message: err.to_string(),
    })?;
    match parsed.scheme() {
        "postgres" | "postgresql" => Ok(raw.trim().to_owned()),
        other => Err(SettingsError::InvalidUrl {
            name,
            message: format!("unsupported scheme `{other}`"),
        }),
    }
}

fn non_zero(name: &'static str, value: u32) -> Result<u32, SettingsError> {
    if value == 0 {
        return Err(SettingsError::Zero { name });
    }
    Ok(value)
}
