use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// `true` if the file starts with a zip local-file or end-of-central-directory
/// signature.
pub fn is_zip(path: &Path) -> Result<bool> {
    let mut magic = [0u8; 4];
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let n = file
        .read(&mut magic)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(n == 4 && (magic == *b"PK\x03\x04" || magic == *b"PK\x05\x06"))
}

/// Extract every entry of the zip at `archive` into `dest`.
///
/// Returns the number of entries in the archive.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize> {
    let file =
        File::open(archive).with_context(|| format!("failed to open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("failed to read ZIP archive {}", archive.display()))?;

    let entries = zip.len();
    zip.extract(dest)
        .with_context(|| format!("failed to extract {} into {}", archive.display(), dest.display()))?;

    debug!(archive = %archive.display(), entries, "archive extracted");
    Ok(entries)
}
