//! Zip extraction for the scan-cli archive.
//!
//! Entries are walked in stream order and written under the destination
//! directory, overwriting existing files. The optional no-parent mode strips
//! the first path segment of every entry name, which flattens archives that
//! wrap their content in a single versioned top-level directory.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path};
use tracing::{debug, info};

/// Extracts a zip archive into `dest_dir`.
///
/// With `strip_top_level`, the first path segment (up to and including the
/// first `/`) is removed from every entry name; names without a `/` are left
/// unchanged. Any failure aborts extraction with an error naming the source
/// zip; partially extracted files are left in place.
pub fn extract_zip(zip_path: &Path, dest_dir: &Path, strip_top_level: bool) -> Result<()> {
    info!(
        "Extracting '{}' to '{}'",
        zip_path.display(),
        dest_dir.display()
    );
    extract_entries(zip_path, dest_dir, strip_top_level)
        .with_context(|| format!("Unable to unzip {}", zip_path.display()))
}

fn extract_entries(zip_path: &Path, dest_dir: &Path, strip_top_level: bool) -> Result<()> {
    let file = File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    fs::create_dir_all(dest_dir)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        let relative = if strip_top_level {
            strip_first_segment(&name)
        } else {
            &name
        };
        // The top-level directory entry itself strips to nothing.
        if relative.is_empty() {
            continue;
        }
        if !is_safe_relative(relative) {
            debug!("Skipping unsafe zip entry name: {}", name);
            continue;
        }

        let dest_path = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&dest_path)?;
        io::copy(&mut entry, &mut outfile)?;

        #[cfg(unix)]
        set_unix_permissions(&dest_path, entry.unix_mode())?;
    }

    debug!("Extraction of {} complete", zip_path.display());
    Ok(())
}

/// Removes everything up to and including the first `/`. A name without a
/// `/` is returned unchanged.
fn strip_first_segment(name: &str) -> &str {
    match name.find('/') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn is_safe_relative(name: &str) -> bool {
    let path = Path::new(name);
    !path.is_absolute()
        && path
            .components()
            .all(|c| !matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}

#[cfg(unix)]
fn set_unix_permissions(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        if mode & 0o111 != 0 {
            fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o755))
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }
    }
    Ok(())
}
