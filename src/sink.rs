use crate::errors::SinkError;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError + '_ {
    move |source| SinkError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Writes `records` as a JSON array to `<dir>/<name>.json`, replacing any
/// previous run's file. The data lands in a sibling temp file first and is
/// renamed into place, so a crash never leaves a half-written destination.
///
/// Returns `Ok(None)` and touches nothing when `records` is empty.
pub fn write_records<T: Serialize>(
    dir: &Path,
    name: &str,
    records: &[T],
) -> Result<Option<PathBuf>, SinkError> {
    if records.is_empty() {
        return Ok(None);
    }

    fs::create_dir_all(dir).map_err(io_error(dir))?;
    let path = dir.join(format!("{name}.json"));
    let tmp = dir.join(format!("{name}.json.tmp"));

    if let Err(e) = write_json(&tmp, records) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, &path).map_err(io_error(&path))?;
    Ok(Some(path))
}

fn write_json<T: Serialize>(tmp: &Path, records: &[T]) -> Result<(), SinkError> {
    let file = File::create(tmp).map_err(io_error(tmp))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush().map_err(io_error(tmp))?;
    writer
        .into_inner()
        .map_err(|e| io_error(tmp)(e.into_error()))?
        .sync_all()
        .map_err(io_error(tmp))
}

#[cfg(test)]
pub fn read_records<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, SinkError> {
    let file = File::open(path).map_err(io_error(path))?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}
