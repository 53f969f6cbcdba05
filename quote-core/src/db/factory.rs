//! Backend selection for quote storage.
//!
//! The `[database]` table of `quote-builder.toml` deserializes into
//! [`DbConfig`]; the binary registers every backend it was built with and
//! asks the [`RepositoryRegistry`] for a repository once at startup.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::repository::{QuoteRepository, RepositoryError};

/// The `[database]` config table.
///
/// ```toml
/// [database]
/// backend = "sqlite"
/// connection_string = "quotes.db"
/// ```
///
/// Both keys are optional and default to a `quotes.db` file in the working
/// directory. `backend` is matched case-insensitively; `connection_string`
/// is only interpreted by the chosen backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl DbConfig {
    /// Throwaway SQLite database, used by tests and dry runs.
    pub fn in_memory() -> Self {
        Self {
            connection_string: ":memory:".to_string(),
            ..Self::default()
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: "quotes.db".to_string(),
        }
    }
}

/// Opens a [`QuoteRepository`] for one backend. The returned repository
/// must have its schema in place.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Lowercase name used in `[database] backend`.
    fn backend_name(&self) -> &'static str;

    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn QuoteRepository>, RepositoryError>;
}

/// Backends compiled into the binary, keyed by name.
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A later factory with the same name replaces the earlier one.
    pub fn register(
        &mut self,
        factory: Box<dyn RepositoryFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Sorted, for error messages.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens the quote store named by `config.backend`.
    ///
    /// An unknown backend is a [`RepositoryError::Configuration`] that lists
    /// the compiled-in ones; the factory's own errors pass through.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn QuoteRepository>, RepositoryError> {
        let backend = config.backend.trim().to_ascii_lowercase();
        let Some(factory) = self.factories.get(backend.as_str()) else {
            return Err(RepositoryError::Configuration(format!(
                "unknown backend '{}' in [database]; available: {}",
                config.backend,
                self.available_backends().join(", ")
            )));
        };

        tracing::debug!(%backend, database = %config.connection_string, "opening quote store");
        factory.create(config).await
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
