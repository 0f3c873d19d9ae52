//! Idempotent removal of intermediate files.

use std::io;
use std::path::Path;

/// Removes `path`; a file that is already gone is not an error.
/// Returns whether a file was actually removed.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Removes every path, logging (not propagating) failures other than absence.
/// Returns the number of paths that could not be removed.
pub fn remove_intermediates<'a, I>(paths: I) -> usize
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut failures = 0;
    for path in paths {
        match remove_if_exists(path) {
            Ok(true) => tracing::debug!(path = %path.display(), "removed intermediate file"),
            Ok(false) => {}
            Err(e) => {
                failures += 1;
                tracing::warn!(path = %path.display(), "could not remove intermediate file: {}", e);
            }
        }
    }
    failures
}
