//! Stage definitions for relic.
//!
//! A stage is a named unit of work: it declares the stage files it depends
//! on and the artifacts it produces. The index consumes stages only
//! through the [`StageDefinition`] load contract, so alternative on-disk
//! formats can be added without touching the checkout logic.
//!
//! # Key Types
//!
//! - [`StageDefinition`] -- the minimal load contract
//! - [`Stage`] -- the TOML-backed implementation

pub mod error;
pub mod stage;

pub use error::{StageError, StageResult};
pub use stage::{Stage, StageDefinition};
