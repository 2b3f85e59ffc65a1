//! The local-filesystem cache backend.

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use relic_types::{
    Artifact, ArtifactStatus, ArtifactWithStatus, Checksum, WorkspaceFileStatus,
};

use crate::error::{CacheError, CacheResult};
use crate::fsutil;
use crate::manifest::DirManifest;
use crate::strategy::CheckoutStrategy;
use crate::traits::Cache;

/// Permission bits for published cache objects.
const OBJECT_MODE: u32 = 0o444;
/// Permission bits for independently-writable checkout copies.
const COPY_MODE: u32 = 0o644;

/// A [`Cache`] backed by a directory on the local filesystem.
///
/// The cache has no state beyond its root directory: every operation is a
/// function of the directory layout and the artifact's checksum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    /// Create a cache rooted at `dir`. The path is absolutized so that
    /// link targets remain valid regardless of the caller's working
    /// directory; it is not required to exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let dir = dir.into();
        if dir.as_os_str().is_empty() {
            return Err(CacheError::EmptyCacheDir);
        }
        let dir = if dir.is_absolute() {
            dir
        } else {
            let cwd = std::env::current_dir()
                .map_err(|e| CacheError::io("resolving current directory", e))?;
            cwd.join(dir)
        };
        Ok(Self { dir })
    }

    /// The cache root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn object_path(&self, checksum: &Checksum) -> CacheResult<PathBuf> {
        let (shard, rest) = checksum
            .shard_split()
            .ok_or_else(|| CacheError::InvalidChecksum(checksum.to_string()))?;
        Ok(self.dir.join(shard).join(rest))
    }

    /// Publish a temp file at its checksum path: create the shard
    /// directory, rename, chmod read-only. The rename is the only point
    /// at which the object becomes visible.
    fn publish(&self, tmp: NamedTempFile, checksum: &Checksum) -> CacheResult<PathBuf> {
        let (shard, rest) = checksum
            .shard_split()
            .ok_or_else(|| CacheError::InvalidChecksum(checksum.to_string()))?;
        let shard_dir = self.dir.join(shard);
        let object_path = shard_dir.join(rest);
        if object_exists(&object_path)? {
            // Idempotent: identical content is already published.
            return Ok(object_path);
        }
        fs::create_dir_all(&shard_dir)
            .map_err(|e| CacheError::io(format!("creating shard directory {shard_dir:?}"), e))?;
        tmp.persist(&object_path).map_err(|e| {
            CacheError::io(format!("renaming temp file to {object_path:?}"), e.error)
        })?;
        fs::set_permissions(&object_path, fs::Permissions::from_mode(OBJECT_MODE))
            .map_err(|e| CacheError::io(format!("chmod {object_path:?}"), e))?;
        debug!(checksum = checksum.short(), "published cache object");
        Ok(object_path)
    }

    /// Write raw bytes (a directory manifest) into the cache.
    fn commit_bytes(&self, data: &[u8]) -> CacheResult<Checksum> {
        let checksum = Checksum::from_bytes(data);
        fs::create_dir_all(&self.dir)
            .map_err(|e| CacheError::io(format!("creating cache root {:?}", self.dir), e))?;
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| CacheError::io(format!("creating temp file in {:?}", self.dir), e))?;
        tmp.write_all(data)
            .map_err(|e| CacheError::io("writing manifest temp file".to_string(), e))?;
        self.publish(tmp, &checksum)?;
        Ok(checksum)
    }

    fn commit_file(
        &self,
        working_dir: &Path,
        artifact: &mut Artifact,
        strategy: CheckoutStrategy,
    ) -> CacheResult<()> {
        let src_path = working_dir.join(&artifact.path);
        let status = fsutil::file_status(&src_path)
            .map_err(|e| CacheError::io(format!("probing {src_path:?}"), e))?;
        match status {
            WorkspaceFileStatus::Absent => {
                return Err(CacheError::SourceNotFound { path: src_path })
            }
            WorkspaceFileStatus::RegularFile => {}
            _ => return Err(CacheError::NotARegularFile { path: src_path }),
        }

        if artifact.skip_cache {
            let checksum = fsutil::checksum_of_file(&src_path)
                .map_err(|e| CacheError::io(format!("checksum of {src_path:?}"), e))?;
            artifact.checksum = Some(checksum);
            return Ok(());
        }

        let mut src = File::open(&src_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CacheError::SourceNotFound {
                    path: src_path.clone(),
                }
            } else {
                CacheError::io(format!("opening {src_path:?}"), e)
            }
        })?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| CacheError::io(format!("creating cache root {:?}", self.dir), e))?;
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| CacheError::io(format!("creating temp file in {:?}", self.dir), e))?;
        let checksum = fsutil::checksum_and_copy(&mut src, tmp.as_file_mut())
            .map_err(|e| CacheError::io(format!("checksum of {src_path:?}"), e))?;
        self.publish(tmp, &checksum)?;
        debug!(path = %artifact.path, checksum = checksum.short(), "committed file");
        artifact.checksum = Some(checksum);

        // Under the link strategy the workspace must end up referencing
        // the immutable object, not holding a second writable copy.
        if strategy == CheckoutStrategy::Link {
            fs::remove_file(&src_path)
                .map_err(|e| CacheError::io(format!("removing {src_path:?}"), e))?;
            self.checkout_file(working_dir, artifact, strategy)?;
        }
        Ok(())
    }

    fn commit_dir(
        &self,
        working_dir: &Path,
        artifact: &mut Artifact,
        strategy: CheckoutStrategy,
    ) -> CacheResult<()> {
        let dir_path = working_dir.join(&artifact.path);
        let status = fsutil::file_status(&dir_path)
            .map_err(|e| CacheError::io(format!("probing {dir_path:?}"), e))?;
        match status {
            WorkspaceFileStatus::Absent => {
                return Err(CacheError::SourceNotFound { path: dir_path })
            }
            WorkspaceFileStatus::Directory => {}
            _ => return Err(CacheError::NotADirectory { path: dir_path }),
        }

        let mut manifest = DirManifest::new(&artifact.path);
        for child in read_dir_entries(&dir_path)? {
            let (name, entry_status) = child;
            match entry_status {
                WorkspaceFileStatus::RegularFile => {
                    let mut child_artifact = Artifact {
                        skip_cache: artifact.skip_cache,
                        ..Artifact::new(name)
                    };
                    self.commit_file(&dir_path, &mut child_artifact, strategy)?;
                    manifest.insert(child_artifact);
                }
                WorkspaceFileStatus::Directory => {
                    // Non-recursive directory artifacts track only the
                    // plain files directly inside the directory.
                    if artifact.is_recursive {
                        let mut child_artifact = Artifact {
                            is_dir: true,
                            is_recursive: true,
                            skip_cache: artifact.skip_cache,
                            ..Artifact::new(name)
                        };
                        self.commit_dir(&dir_path, &mut child_artifact, strategy)?;
                        manifest.insert(child_artifact);
                    }
                }
                status => {
                    return Err(CacheError::UnsupportedFileType {
                        path: dir_path.join(name),
                        status,
                    })
                }
            }
        }

        let bytes = manifest.to_canonical_bytes()?;
        let checksum = if artifact.skip_cache {
            Checksum::from_bytes(&bytes)
        } else {
            self.commit_bytes(&bytes)?
        };
        artifact.checksum = Some(checksum);
        debug!(
            path = %artifact.path,
            entries = manifest.contents.len(),
            "committed directory"
        );
        Ok(())
    }

    /// Recompute the manifest checksum a directory would commit to,
    /// without writing anything. Used for skip-cache directory status.
    fn hash_dir(&self, dir_path: &Path, artifact: &Artifact) -> CacheResult<Checksum> {
        let mut manifest = DirManifest::new(&artifact.path);
        for (name, entry_status) in read_dir_entries(dir_path)? {
            match entry_status {
                WorkspaceFileStatus::RegularFile => {
                    let entry_path = dir_path.join(&name);
                    let mut child = Artifact {
                        skip_cache: artifact.skip_cache,
                        ..Artifact::new(name)
                    };
                    child.checksum = Some(
                        fsutil::checksum_of_file(&entry_path)
                            .map_err(|e| CacheError::io(format!("checksum of {entry_path:?}"), e))?,
                    );
                    manifest.insert(child);
                }
                WorkspaceFileStatus::Directory => {
                    if artifact.is_recursive {
                        let mut child = Artifact {
                            is_dir: true,
                            is_recursive: true,
                            skip_cache: artifact.skip_cache,
                            ..Artifact::new(name.clone())
                        };
                        child.checksum = Some(self.hash_dir(&dir_path.join(&name), &child)?);
                        manifest.insert(child);
                    }
                }
                status => {
                    return Err(CacheError::UnsupportedFileType {
                        path: dir_path.join(name),
                        status,
                    })
                }
            }
        }
        Ok(Checksum::from_bytes(&manifest.to_canonical_bytes()?))
    }

    fn checkout_file(
        &self,
        working_dir: &Path,
        artifact: &Artifact,
        strategy: CheckoutStrategy,
    ) -> CacheResult<()> {
        let (checksum, object_path) = self.require_object(artifact)?;
        let work_path = working_dir.join(&artifact.path);
        if let Some(parent) = work_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CacheError::io(format!("creating directory {parent:?}"), e))?;
        }
        // Replace, never merge: clear whatever occupies the target path.
        match fsutil::file_status(&work_path)
            .map_err(|e| CacheError::io(format!("probing {work_path:?}"), e))?
        {
            WorkspaceFileStatus::Absent => {}
            WorkspaceFileStatus::Directory => {
                return Err(CacheError::UnsupportedFileType {
                    path: work_path,
                    status: WorkspaceFileStatus::Directory,
                })
            }
            _ => {
                fs::remove_file(&work_path)
                    .map_err(|e| CacheError::io(format!("removing {work_path:?}"), e))?;
            }
        }
        match strategy {
            CheckoutStrategy::Link => {
                std::os::unix::fs::symlink(&object_path, &work_path).map_err(|e| {
                    CacheError::io(format!("linking {work_path:?} to {object_path:?}"), e)
                })?;
            }
            CheckoutStrategy::Copy => {
                fs::copy(&object_path, &work_path).map_err(|e| {
                    CacheError::io(format!("copying {object_path:?} to {work_path:?}"), e)
                })?;
                // The object is read-only; the copy must be writable.
                fs::set_permissions(&work_path, fs::Permissions::from_mode(COPY_MODE))
                    .map_err(|e| CacheError::io(format!("chmod {work_path:?}"), e))?;
            }
        }
        debug!(path = %artifact.path, checksum = checksum.short(), %strategy, "checked out file");
        Ok(())
    }

    fn checkout_dir(
        &self,
        working_dir: &Path,
        artifact: &Artifact,
        strategy: CheckoutStrategy,
    ) -> CacheResult<()> {
        let (_, object_path) = self.require_object(artifact)?;
        let bytes = fs::read(&object_path)
            .map_err(|e| CacheError::io(format!("reading manifest {object_path:?}"), e))?;
        let manifest = DirManifest::from_bytes(&bytes)?;
        let dir_path = working_dir.join(&artifact.path);
        fs::create_dir_all(&dir_path)
            .map_err(|e| CacheError::io(format!("creating directory {dir_path:?}"), e))?;
        for child in manifest.contents.values() {
            if child.is_dir {
                self.checkout_dir(&dir_path, child, strategy)?;
            } else {
                self.checkout_file(&dir_path, child, strategy)?;
            }
        }
        Ok(())
    }

    /// Resolve the artifact's checksum to an existing cache object.
    fn require_object(&self, artifact: &Artifact) -> CacheResult<(Checksum, PathBuf)> {
        let checksum = artifact
            .checksum
            .clone()
            .ok_or_else(|| CacheError::MissingChecksum {
                path: artifact.path.clone(),
            })?;
        let object_path = self.object_path(&checksum)?;
        if !object_exists(&object_path)? {
            return Err(CacheError::MissingCacheObject {
                checksum: checksum.to_string(),
                path: artifact.path.clone(),
            });
        }
        Ok((checksum, object_path))
    }

    /// `true` if the directory's tracked children all match the cache and
    /// nothing untracked has appeared.
    fn dir_contents_match(
        &self,
        dir_path: &Path,
        artifact: &Artifact,
        manifest_path: &Path,
    ) -> CacheResult<bool> {
        let bytes = fs::read(manifest_path)
            .map_err(|e| CacheError::io(format!("reading manifest {manifest_path:?}"), e))?;
        let manifest = DirManifest::from_bytes(&bytes)?;

        for child in manifest.contents.values() {
            let child_status = self.status(dir_path, child)?;
            if !child_status.status.contents_match {
                return Ok(false);
            }
        }
        for (name, entry_status) in read_dir_entries(dir_path)? {
            if manifest.contents.contains_key(&name) {
                continue;
            }
            // Untracked sub-directories are expected for non-recursive
            // artifacts; anything else is a workspace change.
            if entry_status == WorkspaceFileStatus::Directory && !artifact.is_recursive {
                continue;
            }
            return Ok(false);
        }
        Ok(true)
    }
}

impl Cache for LocalCache {
    fn commit(
        &self,
        working_dir: &Path,
        artifact: &mut Artifact,
        strategy: CheckoutStrategy,
    ) -> CacheResult<()> {
        if artifact.is_dir {
            self.commit_dir(working_dir, artifact, strategy)
        } else {
            self.commit_file(working_dir, artifact, strategy)
        }
    }

    fn checkout(
        &self,
        working_dir: &Path,
        artifact: &Artifact,
        strategy: CheckoutStrategy,
    ) -> CacheResult<()> {
        if artifact.skip_cache {
            return Ok(());
        }
        if artifact.is_dir {
            self.checkout_dir(working_dir, artifact, strategy)
        } else {
            self.checkout_file(working_dir, artifact, strategy)
        }
    }

    fn status(&self, working_dir: &Path, artifact: &Artifact) -> CacheResult<ArtifactWithStatus> {
        let work_path = working_dir.join(&artifact.path);
        let mut status = ArtifactStatus::default();

        let object_path = match &artifact.checksum {
            // A checksum too short to shard counts as no checksum at all.
            Some(checksum) => match self.object_path(checksum) {
                Ok(path) => {
                    status.has_checksum = true;
                    Some(path)
                }
                Err(_) => None,
            },
            None => None,
        };
        if let Some(object_path) = &object_path {
            if !artifact.skip_cache {
                status.checksum_in_cache = object_exists(object_path)?;
            }
        }

        status.workspace_file_status = fsutil::file_status(&work_path)
            .map_err(|e| CacheError::io(format!("probing {work_path:?}"), e))?;

        match status.workspace_file_status {
            WorkspaceFileStatus::RegularFile if !artifact.is_dir => {
                if artifact.skip_cache && status.has_checksum {
                    let actual = fsutil::checksum_of_file(&work_path)
                        .map_err(|e| CacheError::io(format!("checksum of {work_path:?}"), e))?;
                    status.contents_match = artifact.checksum.as_ref() == Some(&actual);
                } else if status.checksum_in_cache {
                    if let Some(object_path) = &object_path {
                        status.contents_match = fsutil::same_contents(&work_path, object_path)
                            .map_err(|e| {
                                CacheError::io(format!("comparing {work_path:?}"), e)
                            })?;
                    }
                }
            }
            WorkspaceFileStatus::Link => {
                if status.checksum_in_cache {
                    if let Some(object_path) = &object_path {
                        let target = fs::read_link(&work_path)
                            .map_err(|e| CacheError::io(format!("readlink {work_path:?}"), e))?;
                        // Exact path comparison: the link must point at
                        // this cache's object, not merely equal content.
                        status.contents_match = &target == object_path;
                    }
                }
            }
            WorkspaceFileStatus::Directory if artifact.is_dir => {
                if artifact.skip_cache && status.has_checksum {
                    let recomputed = self.hash_dir(&work_path, artifact)?;
                    status.contents_match = artifact.checksum.as_ref() == Some(&recomputed);
                } else if status.checksum_in_cache {
                    if let Some(object_path) = &object_path {
                        status.contents_match =
                            self.dir_contents_match(&work_path, artifact, object_path)?;
                    }
                }
            }
            _ => {}
        }

        Ok(ArtifactWithStatus {
            artifact: artifact.clone(),
            status,
        })
    }

    fn path_for_checksum(&self, checksum: &Checksum) -> CacheResult<PathBuf> {
        self.object_path(checksum)
    }
}

fn object_exists(path: &Path) -> CacheResult<bool> {
    path.try_exists()
        .map_err(|e| CacheError::io(format!("probing cache object {path:?}"), e))
}

/// Read a directory's entries as (name, probed status) pairs.
fn read_dir_entries(dir_path: &Path) -> CacheResult<Vec<(String, WorkspaceFileStatus)>> {
    let entries = fs::read_dir(dir_path)
        .map_err(|e| CacheError::io(format!("reading directory {dir_path:?}"), e))?;
    let mut out = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| CacheError::io(format!("reading directory {dir_path:?}"), e))?;
        let name = entry.file_name().into_string().map_err(|name| {
            CacheError::Manifest {
                path: dir_path.display().to_string(),
                reason: format!("non-UTF-8 entry name {name:?}"),
            }
        })?;
        let entry_status = fsutil::file_status(&entry.path())
            .map_err(|e| CacheError::io(format!("probing {:?}", entry.path()), e))?;
        out.push((name, entry_status));
    }
    Ok(out)
}
