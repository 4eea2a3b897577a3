//! Safe persistence for normalized files.
//!
//! The envelope is the only component that touches disk. Dry runs never
//! write. Real writes back up the original bytes first, then replace the
//! file atomically (temp file plus rename), so a failure at any point
//! leaves the original intact. Files with unresolved conflict markers are
//! refused unless the caller overrides.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::utils::error::NormalizeError;
use crate::utils::report::NormalizationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyMode {
    #[default]
    DryRun,
    Apply,
}

/// Outcome of one envelope invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// No changes; nothing written, no backup created.
    Unchanged,
    /// Dry run with pending changes; nothing written.
    Previewed,
    /// Changes written after backing up the original bytes.
    Written { backup: PathBuf },
    /// Unresolved conflict markers and no override; file untouched.
    Blocked { conflict_lines: Vec<usize> },
}

#[derive(Debug, Clone)]
pub struct EnvelopeConfig {
    pub mode: ApplyMode,
    pub allow_conflict_override: bool,
    pub backup_suffix: String,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            mode: ApplyMode::DryRun,
            allow_conflict_override: false,
            backup_suffix: ".orig".to_string(),
        }
    }
}

fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Persist `new_text` for `path` according to the report and mode.
pub fn apply(
    path: &Path,
    original: &[u8],
    new_text: &str,
    report: &NormalizationReport,
    cfg: &EnvelopeConfig,
) -> Result<ApplyOutcome, NormalizeError> {
    if !report.has_changes() {
        return Ok(ApplyOutcome::Unchanged);
    }
    if cfg.mode == ApplyMode::DryRun {
        return Ok(ApplyOutcome::Previewed);
    }
    if report.has_conflicts() && !cfg.allow_conflict_override {
        return Ok(ApplyOutcome::Blocked {
            conflict_lines: report.conflict_lines(),
        });
    }

    let backup = backup_path(path, &cfg.backup_suffix);
    fs::write(&backup, original)?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(new_text.as_bytes())?;
    // The rename happens only after the temp write fully succeeded.
    tmp.persist(path)
        .map_err(|e| NormalizeError::io(e.to_string()))?;

    Ok(ApplyOutcome::Written { backup })
}
