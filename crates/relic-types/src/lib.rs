//! Foundation types for relic.
//!
//! Everything the cache and index layers agree on lives here: what a
//! tracked artifact is, how its content checksum is represented, and the
//! derived status an artifact has relative to a workspace and a cache.
//!
//! # Key Types
//!
//! - [`Artifact`] -- a tracked file or directory with an optional checksum
//! - [`Checksum`] -- validated hex digest identifying cached content
//! - [`WorkspaceFileStatus`] -- what kind of file sits at a workspace path
//! - [`ArtifactStatus`] -- the four independent status signals
//! - [`ArtifactWithStatus`] -- artifact + signals; its `Display` is the
//!   status classifier

pub mod artifact;
pub mod checksum;
pub mod error;
pub mod status;

pub use artifact::Artifact;
pub use checksum::Checksum;
pub use error::{TypeError, TypeResult};
pub use status::{ArtifactStatus, ArtifactWithStatus, WorkspaceFileStatus};
