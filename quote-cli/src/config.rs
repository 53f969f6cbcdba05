//! `quote-builder.toml` configuration.
//!
//! Every key is optional. Command-line flags override the file, and the
//! file overrides the built-in defaults.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "quotes.db"
//!
//! [merchant]
//! name = "Northside Motors"
//!
//! [quotes]
//! vat_rate = 15
//! validity_days = 30
//!
//! [banking]
//! bank_name = "First Bank"
//! account_number = "62000000001"
//!
//! [logging]
//! level = "debug"
//! file = "quote-builder.log"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quote_core::db::DbConfig;
use quote_core::{BankingInfo, DEFAULT_VALIDITY_DAYS, DEFAULT_VAT_RATE};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Config file read from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "quote-builder.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DbConfig,
    pub merchant: MerchantConfig,
    pub quotes: QuoteDefaults,
    /// Banking details stamped onto every new quote.
    pub banking: BankingInfo,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantConfig {
    /// Printed at the top of rendered quotes.
    pub name: String,
}

/// Values applied to newly created quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteDefaults {
    /// VAT percentage, e.g. `15`.
    pub vat_rate: Decimal,
    pub validity_days: u64,
}

impl Default for QuoteDefaults {
    fn default() -> Self {
        Self {
            vat_rate: DEFAULT_VAT_RATE,
            validity_days: DEFAULT_VALIDITY_DAYS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level or `EnvFilter` directive. `RUST_LOG` takes precedence.
    pub level: Option<String>,
    /// Append log records to this file as well as stderr.
    pub file: Option<PathBuf>,
}

impl AppConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config: {e}"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Reads `path` when given. Otherwise reads [`DEFAULT_CONFIG_FILE`]
    /// from the working directory if it exists, or falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
