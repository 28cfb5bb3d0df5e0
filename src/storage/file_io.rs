//! JSON file helpers with atomic writes

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::ForecastError;

/// Read JSON from a file, returning the default value if the file is absent
pub fn read_json<T, P>(path: P) -> Result<T, ForecastError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path)
        .map_err(|e| ForecastError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ForecastError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write JSON to a sibling temp file, sync it, then rename over the target
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), ForecastError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ForecastError::Storage(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    let temp_path = path.with_extension("json.tmp");
    let write = || -> Result<(), ForecastError> {
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        serde_json::to_writer_pretty(&mut writer, data)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    };

    if let Err(e) = write().and_then(|_| fs::rename(&temp_path, path).map_err(Into::into)) {
        let _ = fs::remove_file(&temp_path);
        return Err(ForecastError::Storage(format!(
            "Failed to write {}: {}",
            path.display(),
            e
        )));
    }

    Ok(())
}
