use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Content checksum for a tracked artifact.
///
/// A `Checksum` is the hex-encoded BLAKE3 digest of an artifact's content.
/// Identical content always produces the same checksum, which doubles as
/// the artifact's address inside a cache. An artifact without a checksum
/// is "uncommitted"; that state is modeled as `Option<Checksum>`, so every
/// constructed `Checksum` is non-empty hex.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Parse a checksum from a hex string.
    ///
    /// Rejects empty strings and any non-hex character. The stored form is
    /// lowercased so string comparison is canonical.
    pub fn parse(s: &str) -> TypeResult<Self> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidChecksum(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Compute the checksum of a byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_hash(*blake3::hash(data).as_bytes())
    }

    /// Build a checksum from a pre-computed BLAKE3 hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hex::encode(hash))
    }

    /// The hex digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of hex characters in the digest.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split the digest into its cache shard prefix (first two characters)
    /// and the remainder used as the object file name.
    ///
    /// Returns `None` for digests shorter than three characters, which
    /// cannot be addressed in a sharded cache.
    pub fn shard_split(&self) -> Option<(&str, &str)> {
        if self.0.len() < 3 {
            return None;
        }
        Some(self.0.split_at(2))
    }

    /// Short form for log output (first 8 characters).
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.short())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
