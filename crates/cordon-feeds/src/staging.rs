//! Staging-file output shared by all feed plugins.
//!
//! Each plugin writes one file of canonical `start|end|tag_json` lines into
//! the staging directory. The merger later concatenates every non-hidden
//! file it finds there.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use cordon_core::SourceRange;
use tracing::info;

use crate::error::{FeedError, Result};

/// How many leading lines the validator parses.
const VALIDATE_LINES: usize = 10;

/// A plugin's staged output: where it landed and how many ranges it holds.
#[derive(Debug, Clone)]
pub struct StagedFeed {
    /// The feed that produced the file
    pub name: String,
    /// Path of the staged file inside the staging directory
    pub path: PathBuf,
    /// Number of canonical lines written
    pub ranges: usize,
}

/// Write a feed's ranges as canonical lines to `<staging_dir>/<name>.csv`.
pub fn stage_ranges(
    staging_dir: &Path,
    name: &str,
    ranges: impl IntoIterator<Item = SourceRange>,
) -> Result<StagedFeed> {
    std::fs::create_dir_all(staging_dir)?;
    let path = staging_dir.join(format!("{name}.csv"));

    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    let mut count = 0usize;
    for range in ranges {
        writer.write_all(range.to_line().as_bytes())?;
        writer.write_all(b"\n")?;
        count += 1;
    }
    writer.flush()?;

    info!(feed = %name, ranges = count, path = %path.display(), "staged feed");
    Ok(StagedFeed {
        name: name.to_string(),
        path,
        ranges: count,
    })
}

/// Check a staged file is non-empty and structurally plausible: it exists,
/// has at least one line, and its first lines parse as canonical ranges.
pub fn validate_staged(staged: &StagedFeed) -> Result<()> {
    let invalid = |reason: String| FeedError::Validation {
        feed: staged.name.clone(),
        reason,
    };

    let meta = std::fs::metadata(&staged.path)
        .map_err(|e| invalid(format!("missing staged file: {e}")))?;
    if meta.len() == 0 {
        return Err(invalid("staged file is empty".into()));
    }

    let reader = BufReader::new(File::open(&staged.path)?);
    let mut seen = 0usize;
    for line in reader.lines().take(VALIDATE_LINES) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        SourceRange::from_line(&line)
            .map_err(|e| invalid(format!("unparseable line: {e}")))?;
        seen += 1;
    }
    if seen == 0 {
        return Err(invalid("staged file has no data lines".into()));
    }
    Ok(())
}
