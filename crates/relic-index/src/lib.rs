//! Stage registry and dependency-ordered checkout for relic.
//!
//! The [`Index`] maps stage-definition paths to loaded stages for the
//! duration of one command. Its `checkout` walks the stage dependency
//! graph depth-first, restoring a stage's dependencies strictly before
//! the stage's own outputs, detecting cycles, and restoring each shared
//! dependency exactly once.
//!
//! # Key Types
//!
//! - [`Index`] -- the registry + DAG checkout
//! - [`PathSet`] -- explicit set of stage paths (visited / in-progress)

pub mod error;
pub mod index;
pub mod paths;

pub use error::{IndexError, IndexResult};
pub use index::Index;
pub use paths::PathSet;
