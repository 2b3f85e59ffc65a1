use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use relic_types::Artifact;

use crate::error::{CacheError, CacheResult};

/// The committed contents of a directory artifact.
///
/// A manifest maps entry names to child artifacts and is itself stored as
/// a cache object; the directory's checksum is the checksum of its
/// manifest bytes. Entries live in a `BTreeMap`, so the JSON encoding is
/// key-sorted and the checksum is reproducible for identical contents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirManifest {
    /// Workspace-relative path of the directory this manifest describes.
    pub path: String,
    /// Child artifacts keyed by entry name.
    pub contents: BTreeMap<String, Artifact>,
}

impl DirManifest {
    /// Create an empty manifest for a directory path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: BTreeMap::new(),
        }
    }

    /// Record a committed child artifact, keyed by its entry name.
    pub fn insert(&mut self, artifact: Artifact) {
        self.contents.insert(artifact.path.clone(), artifact);
    }

    /// Canonical byte encoding: JSON with key-sorted entries.
    pub fn to_canonical_bytes(&self) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CacheError::Manifest {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Decode a manifest read back from the cache.
    pub fn from_bytes(data: &[u8]) -> CacheResult<Self> {
        serde_json::from_slice(data).map_err(|e| CacheError::Manifest {
            path: String::new(),
            reason: e.to_string(),
        })
    }
}
