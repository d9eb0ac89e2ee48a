use std::fs;
use std::io;
use std::path::Path;

use zip::ZipArchive;

use crate::error::MetaprepError;

pub fn validate_zip(zip_path: &Path) -> Result<(), MetaprepError> {
    let mut archive = open_archive(zip_path)?;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        io::copy(&mut entry, &mut io::sink())
            .map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
    }
    Ok(())
}

pub fn extract_zip(zip_path: &Path, target_dir: &Path) -> Result<(), MetaprepError> {
    let mut archive = open_archive(zip_path)?;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
        let entry_path = entry
            .enclosed_name()
            .map(|path| target_dir.join(path))
            .ok_or_else(|| {
                MetaprepError::Filesystem("zip entry path traversal detected".to_string())
            })?;

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
        }
        let mut outfile = fs::File::create(&entry_path)
            .map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
    }
    Ok(())
}

fn open_archive(zip_path: &Path) -> Result<ZipArchive<fs::File>, MetaprepError> {
    let file = fs::File::open(zip_path).map_err(|err| {
        MetaprepError::Filesystem(format!("open zip {}: {err}", zip_path.display()))
    })?;
    ZipArchive::new(file).map_err(|err| MetaprepError::Filesystem(err.to_string()))
}
