//! JSON persistence of the full Taxon state.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use taxon_types::{Category, CategoryTreeNode, Product};

use crate::error::{SdkError, SdkResult};

/// Format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything Taxon stores: both category representations and the products.
///
/// Loading is deliberately unvalidated so that a damaged file can still be
/// opened and audited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub trees: Vec<CategoryTreeNode>,
    #[serde(default)]
    pub products: Vec<Product>,
}

fn current_version() -> u32 {
    SNAPSHOT_VERSION
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            categories: Vec::new(),
            trees: Vec::new(),
            products: Vec::new(),
        }
    }
}

impl Snapshot {
    pub fn read_from(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| SdkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|e| SdkError::Snapshot {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(SdkError::Snapshot {
                path: path.to_path_buf(),
                reason: format!(
                    "format version {} is newer than supported version {SNAPSHOT_VERSION}",
                    snapshot.version
                ),
            });
        }
        debug!(
            path = %path.display(),
            categories = snapshot.categories.len(),
            documents = snapshot.trees.len(),
            products = snapshot.products.len(),
            "snapshot read"
        );
        Ok(snapshot)
    }

    /// Write as pretty JSON, replacing any existing file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> SdkResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(self).map_err(|e| SdkError::Snapshot {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        fs::write(path, json).map_err(|source| SdkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "snapshot written");
        Ok(())
    }
}
