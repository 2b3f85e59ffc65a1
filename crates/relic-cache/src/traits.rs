use std::path::{Path, PathBuf};

use relic_types::{Artifact, ArtifactWithStatus, Checksum};

use crate::error::CacheResult;
use crate::strategy::CheckoutStrategy;

/// Content-addressed artifact cache.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written: a cache object at a given
///   checksum is never modified, only possibly removed.
/// - Commit publishes atomically: a partially written object must never
///   be visible at its final checksum path.
/// - Checkout replaces whatever sits at the workspace path; it never
///   merges with or corrupts existing content.
/// - A checksum with no matching object is a reportable status, not an
///   error.
pub trait Cache {
    /// Commit the artifact at `working_dir/artifact.path` into the cache.
    ///
    /// On success the artifact's checksum is updated in place. Under the
    /// link strategy the workspace file is replaced by a reference to the
    /// cached object; under the copy strategy it is left untouched.
    fn commit(
        &self,
        working_dir: &Path,
        artifact: &mut Artifact,
        strategy: CheckoutStrategy,
    ) -> CacheResult<()>;

    /// Restore the cached object identified by the artifact's checksum to
    /// `working_dir/artifact.path`.
    ///
    /// A no-op for `skip_cache` artifacts: their content was never stored
    /// and the workspace copy is authoritative.
    fn checkout(
        &self,
        working_dir: &Path,
        artifact: &Artifact,
        strategy: CheckoutStrategy,
    ) -> CacheResult<()>;

    /// Compute the artifact's status signals relative to the workspace
    /// and this cache.
    fn status(&self, working_dir: &Path, artifact: &Artifact) -> CacheResult<ArtifactWithStatus>;

    /// The expected location of the object with the given checksum.
    ///
    /// Pure: no filesystem access. Checksums shorter than three
    /// characters cannot be sharded and are rejected.
    fn path_for_checksum(&self, checksum: &Checksum) -> CacheResult<PathBuf>;
}
