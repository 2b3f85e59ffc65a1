use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use relic_types::Artifact;

use crate::error::{StageError, StageResult};

/// The minimal contract the index needs from a stage format.
///
/// A stage knows how to load itself from its definition file and exposes
/// the paths it depends on (other stage files) plus the artifacts it
/// produces. Implementations must be `Clone` so the index can traverse a
/// stage's dependency list while the registry stays borrowable.
pub trait StageDefinition: Clone {
    /// Load a stage from its definition file.
    ///
    /// Fails if the file is absent or malformed; the error carries the
    /// path.
    fn from_file(path: &Path) -> StageResult<Self>
    where
        Self: Sized;

    /// Paths to the stage files this stage depends on.
    fn dependencies(&self) -> &[String];

    /// Artifacts this stage produces.
    fn outputs(&self) -> &[Artifact];
}

/// A TOML-backed stage definition.
///
/// ```toml
/// command = "python train.py"
/// dependencies = ["prepare.toml"]
///
/// [[outputs]]
/// path = "model.pkl"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Shell command that produces the outputs. Informational here; relic
    /// restores artifacts, it does not run stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Paths to stage files whose outputs must exist before this stage's.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Artifacts this stage produces.
    #[serde(default)]
    pub outputs: Vec<Artifact>,
}

impl Stage {
    /// Write the stage back to its definition file.
    ///
    /// Used after a commit so the artifacts' updated checksums persist.
    pub fn to_file(&self, path: &Path) -> StageResult<()> {
        let encoded = toml::to_string_pretty(self).map_err(|e| StageError::Serialize {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        fs::write(path, encoded).map_err(|e| StageError::Io {
            context: format!("writing stage file {path:?}"),
            source: e,
        })
    }
}

impl StageDefinition for Stage {
    fn from_file(path: &Path) -> StageResult<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StageError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => {
                return Err(StageError::Io {
                    context: format!("reading stage file {path:?}"),
                    source: err,
                });
            }
        };
        toml::from_str(&raw).map_err(|e| StageError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn outputs(&self) -> &[Artifact] {
        &self.outputs
    }
}
