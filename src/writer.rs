use crate::error::SimError;
use crate::reading::Reading;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Atomically writes the collected readings to `path` as a JSON array.
///
/// The document is serialized into a temporary file in the destination
/// directory and then renamed into place, so a reader never observes a
/// partial document and a crash mid-write leaves any prior file untouched.
/// A pre-existing file at `path` is replaced on success; nothing is written
/// on failure. Missing parent directories are created first.
pub fn write_readings(path: &Path, readings: &[Reading]) -> Result<(), SimError> {
    let parent = parent_directory(path);
    fs::create_dir_all(&parent)?;

    let mut staged = NamedTempFile::new_in(&parent)?;
    serde_json::to_writer(staged.as_file_mut(), readings)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| SimError::Io(err.error))?;
    Ok(())
}

/// The directory the temporary file must live in so the final rename stays
/// on one filesystem.
fn parent_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
