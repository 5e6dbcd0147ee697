//! Merging staged feed files into the validated intermediate CSV.
//!
//! The merger concatenates every non-hidden file in the staging directory
//! (in name order) under a fixed header, validates the result's structure,
//! and only then moves it over the live merged CSV — keeping the previous
//! one as `.backup`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use cordon_core::{SourceRange, MERGED_HEADER};
use tracing::{info, warn};

use crate::error::{EngineError, Result};

/// How many data lines the validator inspects.
const VALIDATE_LINES: usize = 10;

/// Merge all staged files into `merged_csv`. Returns the number of data
/// lines written.
pub fn merge_staging(staging_dir: &Path, merged_csv: &Path) -> Result<usize> {
    let temp = temp_path(merged_csv);
    let lines = match write_merged(staging_dir, &temp) {
        Ok(lines) => lines,
        Err(err) => {
            let _ = std::fs::remove_file(&temp);
            return Err(err);
        }
    };

    if let Err(err) = validate_merged(&temp) {
        let _ = std::fs::remove_file(&temp);
        return Err(err);
    }

    // Keep the previous merged CSV as a backup, then swap the new one in.
    if merged_csv.exists() {
        let backup = merged_csv.with_extension("csv.backup");
        std::fs::rename(merged_csv, &backup)?;
    }
    std::fs::rename(&temp, merged_csv)?;

    info!(lines = lines, path = %merged_csv.display(), "merged staging files");
    Ok(lines)
}

/// The temporary path the merger writes before validation.
pub fn temp_path(merged_csv: &Path) -> PathBuf {
    let mut name = merged_csv
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("merged.csv"));
    name.push_str(".tmp");
    merged_csv.with_file_name(name)
}

fn write_merged(staging_dir: &Path, temp: &Path) -> Result<usize> {
    if let Some(parent) = temp.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(staging_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && !path
                    .file_name()
                    .map(|n| n.to_string_lossy().starts_with('.'))
                    .unwrap_or(true)
        })
        .collect();
    entries.sort();

    let mut writer = BufWriter::new(File::create(temp)?);
    writer.write_all(MERGED_HEADER.as_bytes())?;
    writer.write_all(b"\n")?;

    let mut lines = 0usize;
    for path in &entries {
        let mut content = String::new();
        File::open(path)?.read_to_string(&mut content)?;
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            lines += 1;
        }
    }
    writer.flush()?;

    info!(files = entries.len(), lines = lines, "concatenated staging files");
    Ok(lines)
}

/// Structural validation of a merged file: present, larger than the bare
/// header, carries the header, and its first data lines are well-formed
/// canonical triples.
pub fn validate_merged(path: &Path) -> Result<()> {
    let invalid = |reason: String| EngineError::MergeValidation(reason);

    let meta = std::fs::metadata(path)
        .map_err(|e| invalid(format!("merged file missing: {e}")))?;
    if meta.len() <= (MERGED_HEADER.len() + 1) as u64 {
        return Err(invalid("merged file has no data".into()));
    }

    let mut reader = BufReader::new(File::open(path)?);
    let mut header = String::new();
    reader.read_line(&mut header)?;
    if header.trim_end() != MERGED_HEADER {
        return Err(invalid(format!("bad header: {:?}", header.trim_end())));
    }

    let mut checked = 0usize;
    for line in reader.lines().take(VALIDATE_LINES) {
        let line = line?;
        if line.trim().is_empty() {
            warn!(line = %line, "blank line in merged file");
            continue;
        }
        SourceRange::from_line(&line)
            .map_err(|e| invalid(format!("malformed data line: {e}")))?;
        checked += 1;
    }
    if checked == 0 {
        return Err(invalid("no data lines after header".into()));
    }
    Ok(())
}
