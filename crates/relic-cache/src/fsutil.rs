//! Filesystem probing and hashing helpers shared by the cache backend.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use relic_types::{Checksum, WorkspaceFileStatus};

/// Probe what kind of file sits at a path, without following links.
pub fn file_status(path: &Path) -> io::Result<WorkspaceFileStatus> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(WorkspaceFileStatus::Absent)
        }
        Err(err) => return Err(err),
    };
    let file_type = meta.file_type();
    let status = if file_type.is_symlink() {
        WorkspaceFileStatus::Link
    } else if file_type.is_file() {
        WorkspaceFileStatus::RegularFile
    } else if file_type.is_dir() {
        WorkspaceFileStatus::Directory
    } else {
        WorkspaceFileStatus::Other
    };
    Ok(status)
}

/// Stream `reader` into `writer`, returning the checksum of the bytes.
///
/// This is the single pass a commit makes over a source file: the same
/// bytes that land in the cache temp file feed the hasher, so the
/// published object is exactly what was hashed.
pub fn checksum_and_copy<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> io::Result<Checksum> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        writer.write_all(&buf[..n])?;
    }
    writer.flush()?;
    Ok(Checksum::from_hash(*hasher.finalize().as_bytes()))
}

/// Compute the checksum of a file's contents.
pub fn checksum_of_file(path: &Path) -> io::Result<Checksum> {
    let mut file = File::open(path)?;
    checksum_and_copy(&mut file, &mut io::sink())
}

/// `true` if two files hold identical bytes, via checksum recomputation.
pub fn same_contents(a: &Path, b: &Path) -> io::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }
    Ok(checksum_of_file(a)? == checksum_of_file(b)?)
}
