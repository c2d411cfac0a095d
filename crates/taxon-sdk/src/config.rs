use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use taxon_hierarchy::WriterConfig;

use crate::error::{SdkError, SdkResult};

/// Top-level Taxon configuration, usually read from `taxon.toml`.
///
/// Every field is optional:
///
/// ```toml
/// snapshot_path = "shop.json"
/// browse_active_only = true
///
/// [writer]
/// max_attempts = 5
/// retry_backoff_ms = 10
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonConfig {
    /// Retry policy for category writes.
    pub writer: WriterConfig,
    /// Where [`Taxon::open`](crate::Taxon::open) loads and
    /// [`Taxon::save`](crate::Taxon::save) writes state.
    pub snapshot_path: Option<PathBuf>,
    /// Default for [`BrowseFilter::active_only`](taxon_catalog::BrowseFilter).
    pub browse_active_only: bool,
}

impl Default for TaxonConfig {
    fn default() -> Self {
        Self {
            writer: WriterConfig::default(),
            snapshot_path: None,
            browse_active_only: true,
        }
    }
}

impl TaxonConfig {
    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SdkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|reason| SdkError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = TaxonConfig::from_toml_str("").unwrap();
        assert_eq!(config, TaxonConfig::default());
        assert!(config.browse_active_only);
        assert_eq!(config.writer.max_attempts, 3);
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = TaxonConfig::from_toml_str(
            r#"
            snapshot_path = "shop.json"
            browse_active_only = false

            [writer]
            max_attempts = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.snapshot_path, Some(PathBuf::from("shop.json")));
        assert!(!config.browse_active_only);
        assert_eq!(config.writer.max_attempts, 7);
        assert_eq!(config.writer.retry_backoff_ms, 5);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(TaxonConfig::from_toml_str("writer = 3").is_err());
    }

    #[test]
    fn load_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxon.toml");
        std::fs::write(&path, "browse_active_only = \"yes\"").unwrap();
        match TaxonConfig::load(&path).unwrap_err() {
            SdkError::Config { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected config error, got {other:?}"),
        }

        let missing = dir.path().join("absent.toml");
        assert!(matches!(TaxonConfig::load(&missing), Err(SdkError::Io { .. })));
    }
}
