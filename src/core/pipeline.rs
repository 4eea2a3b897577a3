//! Pipeline driver composing the repair passes.
//!
//! One entry point, `normalize`, takes raw bytes for a single file and
//! returns repaired text plus the change report. The pipeline is pure; the
//! safety envelope owns all disk I/O.

use crate::core::byteline::{self, ByteRepair, SourceEncoding};
use crate::core::deescape;
use crate::utils::error::NormalizeError;
use crate::utils::report::NormalizationReport;

/// Individually toggleable pipeline steps. The de-escape pass toggles as a
/// whole, never rule by rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassName {
    BomStrip,
    CharMap,
    LineEndings,
    ConflictScan,
    ControlStrip,
    TrailingWhitespace,
    FinalNewline,
    DeEscape,
}

impl PassName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassName::BomStrip => "bom-strip",
            PassName::CharMap => "char-map",
            PassName::LineEndings => "line-endings",
            PassName::ConflictScan => "conflict-scan",
            PassName::ControlStrip => "control-strip",
            PassName::TrailingWhitespace => "trailing-whitespace",
            PassName::FinalNewline => "final-newline",
            PassName::DeEscape => "de-escape",
        }
    }

    pub fn parse(name: &str) -> Option<PassName> {
        match name {
            "bom-strip" => Some(PassName::BomStrip),
            "char-map" => Some(PassName::CharMap),
            "line-endings" => Some(PassName::LineEndings),
            "conflict-scan" => Some(PassName::ConflictScan),
            "control-strip" => Some(PassName::ControlStrip),
            "trailing-whitespace" => Some(PassName::TrailingWhitespace),
            "final-newline" => Some(PassName::FinalNewline),
            "de-escape" => Some(PassName::DeEscape),
            _ => None,
        }
    }

    pub const ALL: [PassName; 8] = [
        PassName::BomStrip,
        PassName::CharMap,
        PassName::LineEndings,
        PassName::ConflictScan,
        PassName::ControlStrip,
        PassName::TrailingWhitespace,
        PassName::FinalNewline,
        PassName::DeEscape,
    ];
}

/// Step toggles plus the slug allow-list.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub strip_bom: bool,
    pub map_chars: bool,
    pub normalize_line_endings: bool,
    pub scan_conflicts: bool,
    pub strip_controls: bool,
    pub trim_trailing_whitespace: bool,
    pub ensure_final_newline: bool,
    pub de_escape: bool,
    /// Characters beyond `[a-z0-9-]` that survive in regenerated labels.
    pub slug_allowed: Vec<char>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            strip_bom: true,
            map_chars: true,
            normalize_line_endings: true,
            scan_conflicts: true,
            strip_controls: true,
            trim_trailing_whitespace: true,
            ensure_final_newline: true,
            de_escape: true,
            slug_allowed: vec!['ä', 'ö', 'ü', 'ß'],
        }
    }
}

impl NormalizeOptions {
    /// Disable one step; all other steps keep their current setting.
    pub fn disable(mut self, pass: PassName) -> Self {
        match pass {
            PassName::BomStrip => self.strip_bom = false,
            PassName::CharMap => self.map_chars = false,
            PassName::LineEndings => self.normalize_line_endings = false,
            PassName::ConflictScan => self.scan_conflicts = false,
            PassName::ControlStrip => self.strip_controls = false,
            PassName::TrailingWhitespace => self.trim_trailing_whitespace = false,
            PassName::FinalNewline => self.ensure_final_newline = false,
            PassName::DeEscape => self.de_escape = false,
        }
        self
    }

    pub fn is_enabled(&self, pass: PassName) -> bool {
        match pass {
            PassName::BomStrip => self.strip_bom,
            PassName::CharMap => self.map_chars,
            PassName::LineEndings => self.normalize_line_endings,
            PassName::ConflictScan => self.scan_conflicts,
            PassName::ControlStrip => self.strip_controls,
            PassName::TrailingWhitespace => self.trim_trailing_whitespace,
            PassName::FinalNewline => self.ensure_final_newline,
            PassName::DeEscape => self.de_escape,
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug)]
pub struct Normalization {
    pub text: String,
    pub encoding: SourceEncoding,
    pub report: NormalizationReport,
}

/// Run the full pipeline over one file's raw bytes.
pub fn normalize(
    raw: &[u8],
    file_id: &str,
    opts: &NormalizeOptions,
) -> Result<Normalization, NormalizeError> {
    let ByteRepair {
        text,
        encoding,
        mut records,
        lines_before,
    } = byteline::repair_bytes(raw, opts)?;

    let text = if opts.de_escape {
        let (rewritten, mut de_records) = deescape::de_escape(&text, opts);
        records.append(&mut de_records);
        rewritten
    } else {
        text
    };

    let report = NormalizationReport {
        file_id: file_id.to_string(),
        lines_before,
        lines_after: text.lines().count(),
        bytes_before: raw.len(),
        bytes_after: text.len(),
        records,
    };

    Ok(Normalization {
        text,
        encoding,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_name_round_trip() {
        for pass in PassName::ALL {
            assert_eq!(PassName::parse(pass.as_str()), Some(pass));
        }
        assert_eq!(PassName::parse("nonsense"), None);
    }

    #[test]
    fn test_disable_is_scoped_to_one_pass() {
        let opts = NormalizeOptions::default().disable(PassName::DeEscape);
        assert!(!opts.is_enabled(PassName::DeEscape));
        assert!(opts.is_enabled(PassName::CharMap));
    }

    #[test]
    fn test_clean_input_produces_no_records() {
        let norm = normalize(b"clean text\n", "t.tex", &NormalizeOptions::default()).unwrap();
        assert_eq!(norm.text, "clean text\n");
        assert!(!norm.report.has_changes());
        assert!(norm.report.records.is_empty());
    }

    #[test]
    fn test_disabled_de_escape_keeps_wrappers() {
        let opts = NormalizeOptions::default().disable(PassName::DeEscape);
        let input = b"\\texorpdfstring{Results}{Results}\n";
        let norm = normalize(input, "t.tex", &opts).unwrap();
        assert_eq!(norm.text, "\\texorpdfstring{Results}{Results}\n");
    }
}
