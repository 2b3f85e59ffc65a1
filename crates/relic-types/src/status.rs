//! Artifact status signals and the status classifier.
//!
//! Status is derived, never persisted. Four independent signals are probed
//! by the cache layer ([`ArtifactStatus`]); classifying them into a
//! human-readable state is a pure function implemented as the `Display` of
//! [`ArtifactWithStatus`], so the decision table is testable without
//! touching a filesystem.

use std::fmt;

use crate::artifact::Artifact;

/// The kind of file found at an artifact's workspace path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WorkspaceFileStatus {
    /// Nothing exists at the path.
    #[default]
    Absent,
    /// A regular file.
    RegularFile,
    /// A directory.
    Directory,
    /// A symbolic link.
    Link,
    /// Anything else (device, socket, fifo).
    Other,
}

impl fmt::Display for WorkspaceFileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Absent => "absent",
            Self::RegularFile => "regular file",
            Self::Directory => "directory",
            Self::Link => "link",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// The four independent signals describing an artifact's state relative to
/// a workspace and a cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArtifactStatus {
    /// What sits at the artifact's workspace path.
    pub workspace_file_status: WorkspaceFileStatus,
    /// The artifact carries a well-formed checksum.
    pub has_checksum: bool,
    /// An object exists at the checksum's cache path.
    pub checksum_in_cache: bool,
    /// Workspace content matches the cached object. For regular files this
    /// means identical bytes; for links it means the link target is exactly
    /// the expected cache path.
    pub contents_match: bool,
}

/// An [`Artifact`] paired with its computed [`ArtifactStatus`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactWithStatus {
    pub artifact: Artifact,
    pub status: ArtifactStatus,
}

impl fmt::Display for ArtifactWithStatus {
    /// Classify the signals into exactly one displayable state.
    ///
    /// Every branch below is a required case; the match is deliberately
    /// written out rather than collapsed so each state stays independently
    /// visible and testable.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wfs = self.status.workspace_file_status;

        // Type guard first: a directory artifact backed by a non-directory
        // (or the reverse) is misclassified before anything else.
        let workspace_is_dir = wfs == WorkspaceFileStatus::Directory;
        if workspace_is_dir != self.artifact.is_dir {
            return write!(f, "incorrect file type: {wfs}");
        }
        let workspace_is_regular = wfs == WorkspaceFileStatus::RegularFile;
        if self.artifact.skip_cache && !workspace_is_regular {
            return write!(f, "incorrect file type: {wfs} (not cached)");
        }

        match wfs {
            WorkspaceFileStatus::Absent => {
                if self.status.has_checksum {
                    if self.status.checksum_in_cache {
                        write!(f, "missing from workspace")
                    } else {
                        write!(f, "missing from cache and workspace")
                    }
                } else {
                    write!(f, "unknown artifact")
                }
            }

            WorkspaceFileStatus::RegularFile | WorkspaceFileStatus::Directory => {
                if self.status.has_checksum {
                    // Skip-cache artifacts never require a cache object.
                    if self.status.checksum_in_cache || self.artifact.skip_cache {
                        if self.status.contents_match {
                            write!(f, "up-to-date")?;
                        } else {
                            write!(f, "modified")?;
                        }
                    } else {
                        write!(f, "missing from cache")?;
                    }
                } else {
                    write!(f, "uncommitted")?;
                }
                if self.artifact.skip_cache {
                    write!(f, " (not cached)")?;
                }
                Ok(())
            }

            WorkspaceFileStatus::Link => {
                if self.status.has_checksum {
                    if self.status.checksum_in_cache {
                        if self.status.contents_match {
                            write!(f, "up-to-date (link)")
                        } else {
                            write!(f, "incorrect link")
                        }
                    } else {
                        write!(f, "broken link")
                    }
                } else {
                    write!(f, "link with no checksum")
                }
            }

            WorkspaceFileStatus::Other => write!(f, "invalid file type"),
        }
    }
}
