//! Job result files

use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Path of the dump file for `job_id` inside `dir`
pub fn dump_path(dir: &Path, job_id: i64) -> PathBuf {
    dir.join(format!("{}-dump.json", job_id))
}

/// Writes the records of one job as a JSON array
///
/// Creates `dir` if needed and replaces an existing dump of the same job.
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written file
/// * `Err(GcrawlError)` - The directory or file could not be written
pub fn write_dump<T: Serialize>(dir: &Path, job_id: i64, records: &[T]) -> crate::Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let path = dump_path(dir, job_id);
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;

    tracing::debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(path)
}
