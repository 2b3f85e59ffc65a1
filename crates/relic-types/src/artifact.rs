use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::error::{TypeError, TypeResult};
use crate::status::WorkspaceFileStatus;

/// A file or directory tracked by relic.
///
/// The `path` is always relative to the directory the owning stage runs
/// in. `checksum` is `None` until the artifact has been committed; after a
/// commit it doubles as the artifact's address in the cache.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Content checksum; `None` means uncommitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
    /// Workspace-relative path to the artifact.
    pub path: String,
    /// The artifact is a directory.
    #[serde(default)]
    pub is_dir: bool,
    /// The artifact is a directory tracked together with all of its
    /// sub-directories. Implies `is_dir`.
    #[serde(default)]
    pub is_recursive: bool,
    /// The artifact's content is never stored in the cache; only its
    /// checksum is tracked, and checkout is a no-op.
    #[serde(default)]
    pub skip_cache: bool,
}

impl Artifact {
    /// Create an uncommitted artifact tracking a regular file.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create an artifact from a probed workspace path.
    ///
    /// The caller probes the path and passes the result in, which keeps
    /// this constructor free of filesystem access. Absent paths, links,
    /// and special files are rejected; `recursive` only takes effect for
    /// directories.
    pub fn from_workspace(
        status: WorkspaceFileStatus,
        path: impl Into<String>,
        recursive: bool,
    ) -> TypeResult<Self> {
        let path = path.into();
        match status {
            WorkspaceFileStatus::Absent => Err(TypeError::PathAbsent(path)),
            WorkspaceFileStatus::Link | WorkspaceFileStatus::Other => {
                Err(TypeError::UnsupportedFileType { path, status })
            }
            WorkspaceFileStatus::RegularFile | WorkspaceFileStatus::Directory => {
                let is_dir = status == WorkspaceFileStatus::Directory;
                Ok(Self {
                    checksum: None,
                    path,
                    is_dir,
                    is_recursive: recursive && is_dir,
                    skip_cache: false,
                })
            }
        }
    }

    /// `true` if the artifact carries a checksum.
    pub fn has_checksum(&self) -> bool {
        self.checksum.is_some()
    }

    /// `true` if the artifacts are identical ignoring their checksums.
    pub fn is_equivalent(&self, other: &Artifact) -> bool {
        self.path == other.path
            && self.is_dir == other.is_dir
            && self.is_recursive == other.is_recursive
            && self.skip_cache == other.skip_cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_artifact_is_uncommitted() {
        let art = Artifact::new("model.pkl");
        assert_eq!(art.path, "model.pkl");
        assert!(!art.has_checksum());
        assert!(!art.is_dir);
        assert!(!art.is_recursive);
        assert!(!art.skip_cache);
    }

    #[test]
    fn from_workspace_regular_file() {
        let art =
            Artifact::from_workspace(WorkspaceFileStatus::RegularFile, "data.csv", true).unwrap();
        assert!(!art.is_dir);
        // `recursive` is meaningless for files and must not stick.
        assert!(!art.is_recursive);
    }

    #[test]
    fn from_workspace_directory() {
        let flat =
            Artifact::from_workspace(WorkspaceFileStatus::Directory, "data", false).unwrap();
        assert!(flat.is_dir);
        assert!(!flat.is_recursive);

        let deep = Artifact::from_workspace(WorkspaceFileStatus::Directory, "data", true).unwrap();
        assert!(deep.is_dir);
        assert!(deep.is_recursive);
    }

    #[test]
    fn from_workspace_rejects_absent() {
        let err = Artifact::from_workspace(WorkspaceFileStatus::Absent, "ghost", false)
            .unwrap_err();
        assert_eq!(err, TypeError::PathAbsent("ghost".to_string()));
    }

    #[test]
    fn from_workspace_rejects_links_and_other() {
        for status in [WorkspaceFileStatus::Link, WorkspaceFileStatus::Other] {
            let err = Artifact::from_workspace(status, "weird", false).unwrap_err();
            assert!(matches!(err, TypeError::UnsupportedFileType { .. }));
        }
    }

    #[test]
    fn recursive_implies_dir() {
        // The only constructor that can set is_recursive also sets is_dir.
        let art = Artifact::from_workspace(WorkspaceFileStatus::Directory, "d", true).unwrap();
        assert!(art.is_dir && art.is_recursive);
    }

    #[test]
    fn equivalence_ignores_checksum() {
        let mut a = Artifact::new("out.bin");
        let b = Artifact::new("out.bin");
        a.checksum = Some(Checksum::from_bytes(b"content"));
        assert!(a.is_equivalent(&b));
        assert!(b.is_equivalent(&a));
    }

    #[test]
    fn equivalence_respects_flags() {
        let a = Artifact::new("out.bin");
        let mut b = Artifact::new("out.bin");
        b.skip_cache = true;
        assert!(!a.is_equivalent(&b));

        let mut c = Artifact::new("out.bin");
        c.is_dir = true;
        assert!(!a.is_equivalent(&c));
    }

    #[test]
    fn toml_roundtrip() {
        let mut art = Artifact::new("data/model.pkl");
        art.checksum = Some(Checksum::from_bytes(b"weights"));
        let encoded = toml::to_string(&art).unwrap();
        let back: Artifact = toml::from_str(&encoded).unwrap();
        assert_eq!(back, art);
    }

    #[test]
    fn toml_defaults_for_missing_fields() {
        let art: Artifact = toml::from_str(r#"path = "plain.txt""#).unwrap();
        assert_eq!(art.path, "plain.txt");
        assert!(art.checksum.is_none());
        assert!(!art.is_dir && !art.is_recursive && !art.skip_cache);
    }
}
