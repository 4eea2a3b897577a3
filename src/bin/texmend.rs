//! Texmend CLI - repository-wide normalization front door.
//!
//! Walks the given paths, runs the pure pipeline per file and persists
//! results through the safety envelope. Default mode is a dry-run preview.

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::Serialize;
#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use texmend::{
    normalize, AggregateSummary, ApplyMode, ApplyOutcome, Diagnostic, DiagnosticSeverity,
    EnvelopeConfig, NormalizationReport, NormalizeError, NormalizeOptions, PassName,
    SourceEncoding,
};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "texmend")]
#[command(version)]
#[command(about = "Texmend - Normalization and de-escaping for converter-generated LaTeX", long_about = None)]
struct Cli {
    /// Files or directories to process (defaults to the current directory)
    paths: Vec<PathBuf>,

    /// Write changes to disk (default is a dry-run preview)
    #[arg(short, long)]
    apply: bool,

    /// Proceed with writes even if merge-conflict markers are present
    #[arg(long)]
    allow_conflicts: bool,

    /// File extensions to visit (repeatable; replaces the default allow-list)
    #[arg(short, long, value_name = "EXT")]
    ext: Vec<String>,

    /// Directory names to skip (repeatable; replaces the default skip-list)
    #[arg(long, value_name = "DIR")]
    skip_dir: Vec<String>,

    /// Suffix for the backup copy written before a change
    #[arg(long, default_value = ".orig")]
    backup_suffix: String,

    /// Disable a pipeline step (repeatable)
    #[arg(long, value_name = "PASS")]
    disable: Vec<String>,

    /// Emit machine-readable JSON instead of text output
    #[arg(long)]
    json: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[cfg(feature = "cli")]
const DEFAULT_EXTENSIONS: [&str; 8] = ["tex", "sty", "py", "md", "sh", "yml", "yaml", "txt"];

#[cfg(feature = "cli")]
const DEFAULT_SKIP_DIRS: [&str; 4] = [".git", "build", "node_modules", "target"];

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct FileEntry {
    outcome: String,
    encoding: SourceEncoding,
    report: NormalizationReport,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct JsonOutput<'a> {
    files: &'a [FileEntry],
    summary: &'a AggregateSummary,
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    let use_color = !cli.no_color;

    let mut opts = NormalizeOptions::default();
    for name in &cli.disable {
        match PassName::parse(name) {
            Some(pass) => opts = opts.disable(pass),
            None => {
                eprintln!("Unknown pass '{}'. Known passes:", name);
                for pass in PassName::ALL {
                    eprintln!("  {}", pass.as_str());
                }
                std::process::exit(1);
            }
        }
    }

    let extensions: Vec<String> = if cli.ext.is_empty() {
        DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    } else {
        cli.ext
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect()
    };
    let skip_dirs: Vec<String> = if cli.skip_dir.is_empty() {
        DEFAULT_SKIP_DIRS.iter().map(|d| d.to_string()).collect()
    } else {
        cli.skip_dir.clone()
    };

    let roots = if cli.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        cli.paths.clone()
    };

    let mut files: Vec<PathBuf> = Vec::new();
    for root in &roots {
        if let Err(err) = collect_files(root, &extensions, &skip_dirs, &mut files) {
            eprintln!("Cannot read {}: {}", root.display(), err);
            std::process::exit(1);
        }
    }
    files.sort();
    files.dedup();

    let cfg = EnvelopeConfig {
        mode: if cli.apply {
            ApplyMode::Apply
        } else {
            ApplyMode::DryRun
        },
        allow_conflict_override: cli.allow_conflicts,
        backup_suffix: cli.backup_suffix.clone(),
    };

    let mut summary = AggregateSummary::default();
    let mut entries: Vec<FileEntry> = Vec::new();
    let mut failures = 0usize;

    for path in &files {
        summary.files_visited += 1;
        match process_file(path, &opts, &cfg) {
            Ok(entry) => {
                summary.fold(&entry.report);
                if entry.report.has_changes() {
                    summary.files_changed += 1;
                }
                if entry.outcome == "blocked" {
                    summary.files_blocked += 1;
                }
                if !cli.json {
                    print_file(&entry, use_color);
                }
                entries.push(entry);
            }
            Err(err) => {
                failures += 1;
                summary.files_failed += 1;
                let diag = Diagnostic::new(DiagnosticSeverity::Error, "error", err.to_string())
                    .with_location(path.display().to_string());
                print_diag(&diag, use_color);
            }
        }
    }

    if cli.json {
        let output = JsonOutput {
            files: &entries,
            summary: &summary,
        };
        match serde_json::to_string_pretty(&output) {
            Ok(serialized) => println!("{}", serialized),
            Err(err) => {
                eprintln!("Failed to serialize report: {}", err);
                std::process::exit(1);
            }
        }
    } else {
        print_summary(&summary, use_color, cli.apply);
    }

    if failures > 0 {
        std::process::exit(1);
    }
    if cli.apply && summary.files_blocked > 0 {
        std::process::exit(2);
    }
}

/// Recursively collect files to visit, in sorted order. Explicitly named
/// files are visited regardless of extension.
#[cfg(feature = "cli")]
fn collect_files(
    path: &Path,
    extensions: &[String],
    skip_dirs: &[String],
    files: &mut Vec<PathBuf>,
) -> io::Result<()> {
    if !path.is_dir() {
        files.push(path.to_path_buf());
        return Ok(());
    }
    let mut dir_entries: Vec<_> = fs::read_dir(path)?.collect::<Result<Vec<_>, _>>()?;
    dir_entries.sort_by_key(|e| e.file_name());
    for entry in dir_entries {
        let child = entry.path();
        if child.is_dir() {
            let skip = child
                .file_name()
                .and_then(|n| n.to_str())
                .map(|name| skip_dirs.iter().any(|s| s == name))
                .unwrap_or(false);
            if !skip {
                collect_files(&child, extensions, skip_dirs, files)?;
            }
        } else if has_allowed_extension(&child, extensions) {
            files.push(child);
        }
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lowered = e.to_ascii_lowercase();
            extensions.iter().any(|allowed| *allowed == lowered)
        })
        .unwrap_or(false)
}

#[cfg(feature = "cli")]
fn process_file(
    path: &Path,
    opts: &NormalizeOptions,
    cfg: &EnvelopeConfig,
) -> Result<FileEntry, NormalizeError> {
    let raw = fs::read(path)?;
    let file_id = path.display().to_string();
    let result = normalize(&raw, &file_id, opts)?;
    let outcome = texmend::apply(path, &raw, &result.text, &result.report, cfg)?;
    Ok(FileEntry {
        outcome: outcome_label(&outcome).to_string(),
        encoding: result.encoding,
        report: result.report,
    })
}

#[cfg(feature = "cli")]
fn outcome_label(outcome: &ApplyOutcome) -> &'static str {
    match outcome {
        ApplyOutcome::Unchanged => "unchanged",
        ApplyOutcome::Previewed => "previewed",
        ApplyOutcome::Written { .. } => "written",
        ApplyOutcome::Blocked { .. } => "blocked",
    }
}

#[cfg(feature = "cli")]
fn print_diag(diag: &Diagnostic, color: bool) {
    if color {
        eprintln!("{}{}\x1b[0m", diag.color_code(), diag);
    } else {
        eprintln!("{}", diag);
    }
}

#[cfg(feature = "cli")]
fn print_file(entry: &FileEntry, color: bool) {
    if entry.report.records.is_empty() {
        return;
    }
    println!("{} ({})", entry.report.file_id, entry.outcome);
    for (kind, count) in entry.report.summary_by_kind() {
        println!("  {} x{}", kind, count);
    }
    if entry.report.has_conflicts() {
        let lines: Vec<String> = entry
            .report
            .conflict_lines()
            .iter()
            .map(|l| l.to_string())
            .collect();
        let severity = if entry.outcome == "blocked" {
            DiagnosticSeverity::Error
        } else {
            DiagnosticSeverity::Warning
        };
        let diag = Diagnostic::new(
            severity,
            "conflict",
            format!("unresolved merge markers on line(s) {}", lines.join(", ")),
        )
        .with_location(entry.report.file_id.clone());
        print_diag(&diag, color);
    }
}

#[cfg(feature = "cli")]
fn print_summary(summary: &AggregateSummary, color: bool, applying: bool) {
    println!();
    println!(
        "files visited: {}, changed: {}, blocked: {}, failed: {}",
        summary.files_visited, summary.files_changed, summary.files_blocked, summary.files_failed
    );
    for entry in &summary.changes_by_kind {
        println!("  {} x{}", entry.kind, entry.count);
    }
    if !summary.conflict_files.is_empty() {
        let diag = Diagnostic::new(
            DiagnosticSeverity::Warning,
            "conflict",
            format!(
                "{} file(s) contain unresolved merge markers",
                summary.conflict_files.len()
            ),
        );
        print_diag(&diag, color);
        for file in &summary.conflict_files {
            eprintln!("  {}", file);
        }
    }
    if !applying && summary.files_changed > 0 {
        let diag = Diagnostic::new(
            DiagnosticSeverity::Info,
            "dry-run",
            "no files were written; re-run with --apply to persist changes",
        );
        print_diag(&diag, color);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with --features cli");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  cargo install texmend --features cli");
    eprintln!("  texmend [OPTIONS] [PATHS]...");
}
