//! The stage registry and the dependency-ordered checkout walk.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use relic_cache::{Cache, CheckoutStrategy};
use relic_stage::{Stage, StageDefinition};

use crate::error::{IndexError, IndexResult};
use crate::paths::PathSet;

/// Registry of the stages known to a project, keyed by stage-file path.
///
/// Constructed empty (or from the persisted path list) and populated by
/// loading stage files on demand; held for one command invocation. Only
/// the set of known paths is ever persisted.
#[derive(Clone, Debug, Default)]
pub struct Index<S: StageDefinition = Stage> {
    /// Every stage-file path the index knows about.
    registered: PathSet,
    /// Stages that have actually been loaded this invocation.
    loaded: BTreeMap<String, S>,
}

impl<S: StageDefinition> Index<S> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            registered: PathSet::new(),
            loaded: BTreeMap::new(),
        }
    }

    /// Number of registered stage paths.
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// `true` if no stage paths are registered.
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// `true` if the path is registered.
    pub fn contains(&self, path: &str) -> bool {
        self.registered.contains(path)
    }

    /// Iterate over the registered stage paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.registered.iter()
    }

    /// Get a stage if it has been loaded this invocation.
    pub fn get(&self, path: &str) -> Option<&S> {
        self.loaded.get(path)
    }

    /// Load the stage at `path` and register it.
    ///
    /// Fails if the file cannot be parsed into a stage; nothing is
    /// registered in that case.
    pub fn add(&mut self, path: &str) -> IndexResult<()> {
        let stage = S::from_file(Path::new(path))?;
        self.registered.insert(path);
        self.loaded.insert(path.to_string(), stage);
        debug!(path, "registered stage");
        Ok(())
    }

    /// Register a path without loading it yet.
    pub fn register(&mut self, path: &str) {
        self.registered.insert(path);
    }

    /// Read the persisted index: one stage-file path per line, blank
    /// lines and `#` comments ignored. Stages are loaded lazily later.
    pub fn from_file(path: &Path) -> IndexResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| IndexError::Io {
            context: format!("reading index file {path:?}"),
            source: e,
        })?;
        let mut index = Self::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            index.registered.insert(line);
        }
        Ok(index)
    }

    /// Persist the registered stage paths, one per line, sorted.
    pub fn to_file(&self, path: &Path) -> IndexResult<()> {
        let mut out = String::new();
        for stage_path in self.registered.iter() {
            out.push_str(stage_path);
            out.push('\n');
        }
        fs::write(path, out).map_err(|e| IndexError::Io {
            context: format!("writing index file {path:?}"),
            source: e,
        })
    }

    /// Fetch a stage, loading (and registering) it on first use.
    fn load(&mut self, path: &str) -> IndexResult<S> {
        if let Some(stage) = self.loaded.get(path) {
            return Ok(stage.clone());
        }
        let stage = S::from_file(Path::new(path))?;
        self.registered.insert(path);
        self.loaded.insert(path.to_string(), stage.clone());
        Ok(stage)
    }

    /// Restore the outputs of the stage at `path`, dependencies first.
    ///
    /// The walk is depth-first: with `recursive` set, every dependency
    /// stage is fully checked out before this stage's own outputs are
    /// touched. `checked_out` records stages already fully processed, so
    /// a diamond-shaped graph restores each shared artifact exactly once;
    /// `in_progress` holds the stages currently on the traversal stack,
    /// and meeting one of them again is a cycle, reported immediately
    /// with the offending path and never retried.
    #[allow(clippy::too_many_arguments)]
    pub fn checkout(
        &mut self,
        path: &str,
        cache: &dyn Cache,
        working_dir: &Path,
        strategy: CheckoutStrategy,
        recursive: bool,
        checked_out: &mut PathSet,
        in_progress: &mut PathSet,
    ) -> IndexResult<()> {
        if checked_out.contains(path) {
            return Ok(());
        }
        if in_progress.contains(path) {
            return Err(IndexError::DependencyCycle(path.to_string()));
        }

        let stage = self.load(path)?;
        in_progress.insert(path);

        if recursive {
            for dependency in stage.dependencies() {
                self.checkout(
                    dependency,
                    cache,
                    working_dir,
                    strategy,
                    recursive,
                    checked_out,
                    in_progress,
                )?;
            }
        }

        for artifact in stage.outputs() {
            cache.checkout(working_dir, artifact, strategy)?;
        }

        in_progress.remove(path);
        checked_out.insert(path);
        debug!(path, outputs = stage.outputs().len(), "checked out stage");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;

    use relic_cache::{CacheError, CacheResult};
    use relic_types::{Artifact, ArtifactStatus, ArtifactWithStatus, Checksum};
    use tempfile::TempDir;

    /// A cache that records checkout order instead of touching disk.
    #[derive(Default)]
    struct RecordingCache {
        checkouts: RefCell<Vec<String>>,
    }

    impl Cache for RecordingCache {
        fn commit(
            &self,
            _working_dir: &Path,
            _artifact: &mut Artifact,
            _strategy: CheckoutStrategy,
        ) -> CacheResult<()> {
            Ok(())
        }

        fn checkout(
            &self,
            _working_dir: &Path,
            artifact: &Artifact,
            _strategy: CheckoutStrategy,
        ) -> CacheResult<()> {
            self.checkouts.borrow_mut().push(artifact.path.clone());
            Ok(())
        }

        fn status(
            &self,
            _working_dir: &Path,
            artifact: &Artifact,
        ) -> CacheResult<ArtifactWithStatus> {
            Ok(ArtifactWithStatus {
                artifact: artifact.clone(),
                status: ArtifactStatus::default(),
            })
        }

        fn path_for_checksum(&self, checksum: &Checksum) -> CacheResult<PathBuf> {
            checksum
                .shard_split()
                .map(|(shard, rest)| PathBuf::from(shard).join(rest))
                .ok_or_else(|| CacheError::InvalidChecksum(checksum.to_string()))
        }
    }

    /// Write a stage file producing one artifact named after the stage.
    fn write_stage(dir: &Path, name: &str, deps: &[&str]) -> String {
        let path = dir.join(format!("{name}.toml"));
        let mut body = String::new();
        if !deps.is_empty() {
            let list: Vec<String> = deps
                .iter()
                .map(|d| format!("{:?}", dir.join(format!("{d}.toml")).display().to_string()))
                .collect();
            body.push_str(&format!("dependencies = [{}]\n", list.join(", ")));
        }
        body.push_str(&format!("\n[[outputs]]\npath = \"{name}.out\"\n"));
        fs::write(&path, body).unwrap();
        path.display().to_string()
    }

    fn checkout(
        index: &mut Index<Stage>,
        path: &str,
        cache: &RecordingCache,
        recursive: bool,
        checked_out: &mut PathSet,
    ) -> IndexResult<()> {
        let mut in_progress = PathSet::new();
        index.checkout(
            path,
            cache,
            Path::new("/workspace"),
            CheckoutStrategy::Link,
            recursive,
            checked_out,
            &mut in_progress,
        )
    }

    #[test]
    fn add_loads_and_registers() {
        let dir = TempDir::new().unwrap();
        let path = write_stage(dir.path(), "a", &[]);
        let mut index: Index<Stage> = Index::new();
        index.add(&path).unwrap();
        assert!(index.contains(&path));
        assert!(index.get(&path).is_some());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn add_malformed_stage_fails_and_registers_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "outputs = 3").unwrap();
        let mut index: Index<Stage> = Index::new();
        let err = index.add(&path.display().to_string()).unwrap_err();
        assert!(matches!(err, IndexError::Stage(_)));
        assert!(index.is_empty());
    }

    #[test]
    fn index_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let index_path = dir.path().join("index");
        fs::write(
            &index_path,
            "# stages\nstages/train.toml\n\nstages/prepare.toml\n",
        )
        .unwrap();

        let index: Index<Stage> = Index::from_file(&index_path).unwrap();
        let paths: Vec<&str> = index.paths().collect();
        assert_eq!(paths, ["stages/prepare.toml", "stages/train.toml"]);

        let out_path = dir.path().join("index2");
        index.to_file(&out_path).unwrap();
        let reread: Index<Stage> = Index::from_file(&out_path).unwrap();
        assert_eq!(
            reread.paths().collect::<Vec<_>>(),
            index.paths().collect::<Vec<_>>()
        );
    }

    #[test]
    fn non_recursive_checkout_restores_only_own_outputs() {
        let dir = TempDir::new().unwrap();
        let _dep = write_stage(dir.path(), "dep", &[]);
        let top = write_stage(dir.path(), "top", &["dep"]);

        let mut index: Index<Stage> = Index::new();
        let cache = RecordingCache::default();
        let mut checked_out = PathSet::new();
        checkout(&mut index, &top, &cache, false, &mut checked_out).unwrap();

        assert_eq!(*cache.checkouts.borrow(), ["top.out"]);
    }

    #[test]
    fn recursive_checkout_restores_dependencies_first() {
        let dir = TempDir::new().unwrap();
        let _a = write_stage(dir.path(), "a", &[]);
        let _b = write_stage(dir.path(), "b", &["a"]);
        let c = write_stage(dir.path(), "c", &["b"]);

        let mut index: Index<Stage> = Index::new();
        let cache = RecordingCache::default();
        let mut checked_out = PathSet::new();
        checkout(&mut index, &c, &cache, true, &mut checked_out).unwrap();

        assert_eq!(*cache.checkouts.borrow(), ["a.out", "b.out", "c.out"]);
        assert_eq!(checked_out.len(), 3);
    }

    #[test]
    fn diamond_dependency_restores_shared_stage_once() {
        // top depends on left and right; both depend on base.
        let dir = TempDir::new().unwrap();
        let _base = write_stage(dir.path(), "base", &[]);
        let _left = write_stage(dir.path(), "left", &["base"]);
        let _right = write_stage(dir.path(), "right", &["base"]);
        let top = write_stage(dir.path(), "top", &["left", "right"]);

        let mut index: Index<Stage> = Index::new();
        let cache = RecordingCache::default();
        let mut checked_out = PathSet::new();
        checkout(&mut index, &top, &cache, true, &mut checked_out).unwrap();

        let checkouts = cache.checkouts.borrow();
        assert_eq!(
            checkouts.iter().filter(|p| p.as_str() == "base.out").count(),
            1
        );
        assert_eq!(*checkouts, ["base.out", "left.out", "right.out", "top.out"]);
    }

    #[test]
    fn cycle_fails_with_offending_path() {
        // a -> b -> c -> a
        let dir = TempDir::new().unwrap();
        let a_path = dir.path().join("a.toml").display().to_string();
        let b_path = dir.path().join("b.toml").display().to_string();
        let c_path = dir.path().join("c.toml").display().to_string();
        fs::write(
            &a_path,
            format!("dependencies = [{b_path:?}]\n\n[[outputs]]\npath = \"a.out\"\n"),
        )
        .unwrap();
        fs::write(
            &b_path,
            format!("dependencies = [{c_path:?}]\n\n[[outputs]]\npath = \"b.out\"\n"),
        )
        .unwrap();
        fs::write(
            &c_path,
            format!("dependencies = [{a_path:?}]\n\n[[outputs]]\npath = \"c.out\"\n"),
        )
        .unwrap();

        let mut index: Index<Stage> = Index::new();
        let cache = RecordingCache::default();
        let mut checked_out = PathSet::new();
        let err = checkout(&mut index, &a_path, &cache, true, &mut checked_out).unwrap_err();

        match err {
            IndexError::DependencyCycle(path) => assert_eq!(path, a_path),
            other => panic!("expected DependencyCycle, got {other:?}"),
        }
        // Nothing was marked fully checked out.
        assert!(checked_out.is_empty());
    }

    #[test]
    fn checked_out_set_is_shared_across_roots() {
        // Two roots share one dependency; restoring both roots in one
        // command restores the shared artifact once.
        let dir = TempDir::new().unwrap();
        let _shared = write_stage(dir.path(), "shared", &[]);
        let one = write_stage(dir.path(), "one", &["shared"]);
        let two = write_stage(dir.path(), "two", &["shared"]);

        let mut index: Index<Stage> = Index::new();
        let cache = RecordingCache::default();
        let mut checked_out = PathSet::new();
        checkout(&mut index, &one, &cache, true, &mut checked_out).unwrap();
        checkout(&mut index, &two, &cache, true, &mut checked_out).unwrap();

        let checkouts = cache.checkouts.borrow();
        assert_eq!(
            checkouts
                .iter()
                .filter(|p| p.as_str() == "shared.out")
                .count(),
            1
        );
    }

    #[test]
    fn checkout_lazily_loads_and_registers() {
        let dir = TempDir::new().unwrap();
        let path = write_stage(dir.path(), "solo", &[]);
        let mut index: Index<Stage> = Index::new();
        let cache = RecordingCache::default();
        let mut checked_out = PathSet::new();
        checkout(&mut index, &path, &cache, true, &mut checked_out).unwrap();
        assert!(index.contains(&path));
        assert!(index.get(&path).is_some());
    }

    #[test]
    fn checkout_missing_stage_file_fails() {
        let mut index: Index<Stage> = Index::new();
        let cache = RecordingCache::default();
        let mut checked_out = PathSet::new();
        let err =
            checkout(&mut index, "/nope/missing.toml", &cache, true, &mut checked_out).unwrap_err();
        assert!(matches!(err, IndexError::Stage(_)));
    }
}
