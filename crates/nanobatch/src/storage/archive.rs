use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::StorageError;

/// Packs the given files into one zip, each stored under its base name.
pub fn pack<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<u8>, StorageError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for path in paths {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::Archive(format!("unnamed entry: {}", path.display())))?;

        let bytes = std::fs::read(path).map_err(|e| StorageError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        zip.start_file(name, options)
            .map_err(|e| StorageError::Archive(e.to_string()))?;
        zip.write_all(&bytes)
            .map_err(|e| StorageError::Archive(e.to_string()))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| StorageError::Archive(e.to_string()))?;
    Ok(cursor.into_inner())
}
