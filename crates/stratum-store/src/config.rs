//! Store configuration
//!
//! Backend selection is read once from the environment at process
//! start and the chosen implementation is constructed explicitly; no
//! runtime dynamic loading. A backend that cannot be reached at
//! startup is retried exactly once after a fixed delay; a second
//! failure propagates so the process fails to start instead of
//! running degraded.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use stratum_core::StratumError;

use crate::backend::{DocumentBackend, MemoryBackend, SqliteBackend};
use crate::errors::Result;

/// Delay before the single startup retry
pub const STARTUP_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Default change-log segment size
pub const DEFAULT_SEGMENT_SIZE: usize = 100;

/// Which backend implementation to construct
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Sqlite { path: PathBuf },
}

/// Process-wide store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub segment_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            segment_size: DEFAULT_SEGMENT_SIZE,
        }
    }
}

impl StoreConfig {
    /// Read configuration from `STRATUM_BACKEND`, `STRATUM_SQLITE_PATH`,
    /// and `STRATUM_SEGMENT_SIZE`
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var("STRATUM_BACKEND").ok(),
            std::env::var("STRATUM_SQLITE_PATH").ok(),
            std::env::var("STRATUM_SEGMENT_SIZE").ok(),
        )
    }

    fn from_vars(
        backend: Option<String>,
        sqlite_path: Option<String>,
        segment_size: Option<String>,
    ) -> Result<Self> {
        let backend = match backend.as_deref() {
            None | Some("memory") => BackendKind::Memory,
            Some("sqlite") => {
                let path = sqlite_path.ok_or_else(|| {
                    StratumError::validation("STRATUM_SQLITE_PATH required for sqlite backend")
                })?;
                BackendKind::Sqlite {
                    path: PathBuf::from(path),
                }
            }
            Some(other) => {
                return Err(StratumError::validation(format!(
                    "unknown backend '{}'",
                    other
                )))
            }
        };
        let segment_size = match segment_size {
            None => DEFAULT_SEGMENT_SIZE,
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                StratumError::validation(format!("bad STRATUM_SEGMENT_SIZE '{}'", raw))
            })?,
        };
        if segment_size == 0 {
            return Err(StratumError::validation("segment size must be positive"));
        }
        Ok(Self {
            backend,
            segment_size,
        })
    }
}

/// Construct the configured backend, retrying once on
/// `BackendUnavailable` after `STARTUP_RETRY_DELAY`
pub fn connect(config: &StoreConfig) -> Result<Arc<dyn DocumentBackend>> {
    match try_connect(config) {
        Err(StratumError::BackendUnavailable { reason }) => {
            tracing::warn!(%reason, "backend unavailable, retrying once");
            std::thread::sleep(STARTUP_RETRY_DELAY);
            try_connect(config)
        }
        other => other,
    }
}

fn try_connect(config: &StoreConfig) -> Result<Arc<dyn DocumentBackend>> {
    match &config.backend {
        BackendKind::Memory => Ok(Arc::new(MemoryBackend::new())),
        BackendKind::Sqlite { path } => Ok(Arc::new(SqliteBackend::open(path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_memory_backend() {
        let config = StoreConfig::from_vars(None, None, None).unwrap();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.segment_size, DEFAULT_SEGMENT_SIZE);
    }

    #[test]
    fn test_sqlite_requires_a_path() {
        let err = StoreConfig::from_vars(Some("sqlite".into()), None, None).unwrap_err();
        assert_eq!(err.code(), "ERR_VALIDATION");

        let config = StoreConfig::from_vars(
            Some("sqlite".into()),
            Some("/tmp/stratum.db".into()),
            Some("50".into()),
        )
        .unwrap();
        assert_eq!(
            config.backend,
            BackendKind::Sqlite {
                path: PathBuf::from("/tmp/stratum.db")
            }
        );
        assert_eq!(config.segment_size, 50);
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(StoreConfig::from_vars(Some("redis".into()), None, None).is_err());
        assert!(StoreConfig::from_vars(None, None, Some("zero?".into())).is_err());
        assert!(StoreConfig::from_vars(None, None, Some("0".into())).is_err());
    }
}
