//! Change records and per-file normalization reports.

use indexmap::IndexMap;
use serde::Serialize;

/// Pass label for records produced by the byte/line repair pass.
pub const BYTE_PASS: &str = "byte-repair";
/// Pass label for records produced by the markup de-escaping pass.
pub const MARKUP_PASS: &str = "de-escape";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    BomRemoved,
    EncodingRecovered,
    LineEndingNormalized,
    TrailingWhitespaceTrimmed,
    ControlCharRemoved,
    CharReplaced,
    ConflictMarkerFound,
    EscapeCollapsed,
    LabelRegenerated,
    WrapperCollapsed,
    BlankLinesCollapsed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::BomRemoved => "bom_removed",
            ChangeKind::EncodingRecovered => "encoding_recovered",
            ChangeKind::LineEndingNormalized => "line_ending_normalized",
            ChangeKind::TrailingWhitespaceTrimmed => "trailing_whitespace_trimmed",
            ChangeKind::ControlCharRemoved => "control_char_removed",
            ChangeKind::CharReplaced => "char_replaced",
            ChangeKind::ConflictMarkerFound => "conflict_marker_found",
            ChangeKind::EscapeCollapsed => "escape_collapsed",
            ChangeKind::LabelRegenerated => "label_regenerated",
            ChangeKind::WrapperCollapsed => "wrapper_collapsed",
            ChangeKind::BlankLinesCollapsed => "blank_lines_collapsed",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One mutation (or blocking finding) observed during a pass.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    pub pass: &'static str,
    pub kind: ChangeKind,
    /// 1-based line number; 0 marks a file-wide change.
    pub line: usize,
    pub before: String,
    pub after: String,
    /// Occurrence count for aggregated kinds (affected lines, grouped chars).
    pub count: usize,
}

impl ChangeRecord {
    pub fn new(
        pass: &'static str,
        kind: ChangeKind,
        line: usize,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            pass,
            kind,
            line,
            before: before.into(),
            after: after.into(),
            count: 1,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Conflict markers are findings, not mutations; everything else changes text.
    pub fn is_mutation(&self) -> bool {
        self.kind != ChangeKind::ConflictMarkerFound
    }
}

/// Aggregated view of one file's normalization run. Pure data, no I/O.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizationReport {
    pub file_id: String,
    pub records: Vec<ChangeRecord>,
    pub lines_before: usize,
    pub lines_after: usize,
    pub bytes_before: usize,
    pub bytes_after: usize,
}

impl NormalizationReport {
    pub fn has_changes(&self) -> bool {
        self.records.iter().any(|r| r.is_mutation())
    }

    pub fn has_conflicts(&self) -> bool {
        self.records
            .iter()
            .any(|r| r.kind == ChangeKind::ConflictMarkerFound)
    }

    pub fn conflict_lines(&self) -> Vec<usize> {
        self.records
            .iter()
            .filter(|r| r.kind == ChangeKind::ConflictMarkerFound)
            .map(|r| r.line)
            .collect()
    }

    /// Occurrence totals per kind, in first-seen order.
    pub fn summary_by_kind(&self) -> IndexMap<ChangeKind, usize> {
        let mut summary: IndexMap<ChangeKind, usize> = IndexMap::new();
        for record in &self.records {
            *summary.entry(record.kind).or_insert(0) += record.count;
        }
        summary
    }
}

/// One kind/count pair in an aggregate summary.
#[derive(Debug, Clone, Serialize)]
pub struct KindCount {
    pub kind: ChangeKind,
    pub count: usize,
}

/// Cross-file summary accumulated by the CLI layer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateSummary {
    pub files_visited: usize,
    pub files_changed: usize,
    pub files_blocked: usize,
    pub files_failed: usize,
    pub changes_by_kind: Vec<KindCount>,
    pub conflict_files: Vec<String>,
}

impl AggregateSummary {
    pub fn fold(&mut self, report: &NormalizationReport) {
        for (kind, count) in report.summary_by_kind() {
            match self.changes_by_kind.iter_mut().find(|e| e.kind == kind) {
                Some(entry) => entry.count += count,
                None => self.changes_by_kind.push(KindCount { kind, count }),
            }
        }
        if report.has_conflicts() {
            self.conflict_files.push(report.file_id.clone());
        }
    }
}
