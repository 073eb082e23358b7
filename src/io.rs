use std::path::Path;

use tempfile::NamedTempFile;
use tracing::warn;

use crate::result::Result;

/// Create a named temporary file with the given suffix and return its handle.
///
/// The file destructor will be called at the handle drop.
/// **As such, one must not simply get the file path and drop the handle.**
pub fn named_tempfile(suffix: &str) -> Result<NamedTempFile> {
    Ok(tempfile::Builder::new().suffix(suffix).tempfile()?)
}

/// Best-effort removal of the file at `path`.
///
/// A missing file is not an error. Any other failure is logged and swallowed,
/// it must never abort the attempt that asked for the cleanup.
pub fn remove_existing(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove file {}: {err}", path.display());
        }
    }
}
