//! Byte- and line-level repair for raw file contents.
//!
//! Steps run in a fixed order: BOM strip, decoding, character mapping,
//! line-ending normalization, merge-conflict scan, control-character strip,
//! trailing-whitespace trim, final-newline enforcement. Conflict detection
//! never mutates; resolving a real conflict needs human judgment.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::core::charmap;
use crate::core::pipeline::NormalizeOptions;
use crate::utils::error::NormalizeError;
use crate::utils::report::{ChangeKind, ChangeRecord, BYTE_PASS};

/// Detected source encoding of a repaired document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    Latin1Fallback,
}

impl SourceEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceEncoding::Utf8 => "utf-8",
            SourceEncoding::Utf8Bom => "utf-8-bom",
            SourceEncoding::Utf16Le => "utf-16-le",
            SourceEncoding::Utf16Be => "utf-16-be",
            SourceEncoding::Latin1Fallback => "latin-1-fallback",
        }
    }
}

/// Output of the byte/line repair pass.
#[derive(Debug)]
pub struct ByteRepair {
    pub text: String,
    pub encoding: SourceEncoding,
    pub records: Vec<ChangeRecord>,
    /// Line count right after decoding, before any mutation.
    pub lines_before: usize,
}

lazy_static! {
    static ref CONFLICT_MARKER: Regex = Regex::new(r"^(?:<{7}|={7}|>{7})(?:\s|$)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BomKind {
    Utf8,
    Utf16Le,
    Utf16Be,
}

fn detect_bom(raw: &[u8]) -> Option<(BomKind, usize)> {
    if raw.starts_with(&[0xEF, 0xBB, 0xBF]) {
        Some((BomKind::Utf8, 3))
    } else if raw.starts_with(&[0xFF, 0xFE]) {
        Some((BomKind::Utf16Le, 2))
    } else if raw.starts_with(&[0xFE, 0xFF]) {
        Some((BomKind::Utf16Be, 2))
    } else {
        None
    }
}

/// Attempt UTF-8, falling back to Latin-1 with an `encoding_recovered`
/// record. The fallback never discards bytes, so a repaired file stays
/// auditable byte for byte.
fn decode_utf8_or_latin1(raw: &[u8], records: &mut Vec<ChangeRecord>) -> (String, bool) {
    match std::str::from_utf8(raw) {
        Ok(text) => (text.to_string(), false),
        Err(_) => {
            records.push(ChangeRecord::new(
                BYTE_PASS,
                ChangeKind::EncodingRecovered,
                0,
                "invalid UTF-8",
                "latin-1",
            ));
            (raw.iter().map(|&b| b as char).collect(), true)
        }
    }
}

fn decode_utf16(raw: &[u8], little_endian: bool) -> Result<String, NormalizeError> {
    if raw.len() % 2 != 0 {
        return Err(NormalizeError::decode("odd byte length in UTF-16 stream"));
    }
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    char::decode_utf16(units.into_iter())
        .collect::<Result<String, _>>()
        .map_err(|_| NormalizeError::decode("unpaired surrogate in UTF-16 stream"))
}

/// Rewrite CRLF and lone CR to LF. Returns the affected line count.
fn normalize_line_endings(text: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut affected = 0usize;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            affected += 1;
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(ch);
        }
    }
    (out, affected)
}

fn scan_conflict_markers(text: &str, records: &mut Vec<ChangeRecord>) {
    for (idx, line) in text.lines().enumerate() {
        if CONFLICT_MARKER.is_match(line) {
            records.push(ChangeRecord::new(
                BYTE_PASS,
                ChangeKind::ConflictMarkerFound,
                idx + 1,
                line.to_string(),
                line.to_string(),
            ));
        }
    }
}

fn flush_control_line(
    line: usize,
    first: &mut Option<char>,
    stripped: &mut usize,
    records: &mut Vec<ChangeRecord>,
) {
    if let Some(ch) = first.take() {
        records.push(
            ChangeRecord::new(
                BYTE_PASS,
                ChangeKind::ControlCharRemoved,
                line,
                ch.escape_default().to_string(),
                "",
            )
            .with_count(*stripped),
        );
    }
    *stripped = 0;
}

/// Strip C0 controls other than tab, LF and CR. Only the first occurrence
/// per line is detailed, but all occurrences are removed and counted.
fn strip_control_chars(text: &str, records: &mut Vec<ChangeRecord>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut line = 1usize;
    let mut first: Option<char> = None;
    let mut stripped = 0usize;

    for ch in text.chars() {
        if ch == '\n' {
            flush_control_line(line, &mut first, &mut stripped, records);
            line += 1;
            out.push(ch);
            continue;
        }
        if (ch as u32) < 0x20 && ch != '\t' && ch != '\r' {
            if first.is_none() {
                first = Some(ch);
            }
            stripped += 1;
            continue;
        }
        out.push(ch);
    }
    flush_control_line(line, &mut first, &mut stripped, records);
    out
}

/// Trim trailing spaces and tabs from every line. Returns the affected
/// line count.
fn trim_trailing_whitespace(text: &str) -> (String, usize) {
    let ends_with_newline = text.ends_with('\n');
    let mut affected = 0usize;
    let mut lines: Vec<&str> = text.split('\n').collect();
    if ends_with_newline {
        lines.pop();
    }
    let mut out = String::with_capacity(text.len());
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_end_matches([' ', '\t']);
        if trimmed.len() != line.len() {
            affected += 1;
        }
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(trimmed);
    }
    if ends_with_newline {
        out.push('\n');
    }
    (out, affected)
}

/// Run the full byte/line repair pass over raw file bytes.
pub fn repair_bytes(raw: &[u8], opts: &NormalizeOptions) -> Result<ByteRepair, NormalizeError> {
    let mut records = Vec::new();

    let bom = detect_bom(raw);
    let (mut text, encoding) = match bom {
        None => {
            let (text, recovered) = decode_utf8_or_latin1(raw, &mut records);
            let encoding = if recovered {
                SourceEncoding::Latin1Fallback
            } else {
                SourceEncoding::Utf8
            };
            (text, encoding)
        }
        Some((BomKind::Utf8, len)) => {
            let body = if opts.strip_bom {
                records.push(ChangeRecord::new(
                    BYTE_PASS,
                    ChangeKind::BomRemoved,
                    0,
                    "UTF-8 BOM",
                    "",
                ));
                &raw[len..]
            } else {
                raw
            };
            let (text, recovered) = decode_utf8_or_latin1(body, &mut records);
            let encoding = if recovered {
                SourceEncoding::Latin1Fallback
            } else {
                SourceEncoding::Utf8Bom
            };
            (text, encoding)
        }
        Some((kind, len)) => {
            let little_endian = kind == BomKind::Utf16Le;
            let decoded = decode_utf16(&raw[len..], little_endian)?;
            // The BOM is consumed by decoding either way; without the strip
            // step it is re-emitted as a leading U+FEFF so no byte goes
            // unaccounted.
            let text = if opts.strip_bom {
                records.push(ChangeRecord::new(
                    BYTE_PASS,
                    ChangeKind::BomRemoved,
                    0,
                    if little_endian {
                        "UTF-16LE BOM"
                    } else {
                        "UTF-16BE BOM"
                    },
                    "",
                ));
                decoded
            } else {
                format!("\u{FEFF}{}", decoded)
            };
            let encoding = if little_endian {
                SourceEncoding::Utf16Le
            } else {
                SourceEncoding::Utf16Be
            };
            (text, encoding)
        }
    };

    let lines_before = text.lines().count();

    if opts.map_chars {
        let (mapped, mut char_records) = charmap::map_chars(&text);
        records.append(&mut char_records);
        text = mapped;
    }

    if opts.normalize_line_endings {
        let (normalized, affected) = normalize_line_endings(&text);
        if affected > 0 {
            records.push(
                ChangeRecord::new(BYTE_PASS, ChangeKind::LineEndingNormalized, 0, "CRLF", "LF")
                    .with_count(affected),
            );
            text = normalized;
        }
    }

    if opts.scan_conflicts {
        scan_conflict_markers(&text, &mut records);
    }

    if opts.strip_controls {
        text = strip_control_chars(&text, &mut records);
    }

    if opts.trim_trailing_whitespace {
        let (trimmed, affected) = trim_trailing_whitespace(&text);
        if affected > 0 {
            records.push(
                ChangeRecord::new(
                    BYTE_PASS,
                    ChangeKind::TrailingWhitespaceTrimmed,
                    0,
                    "trailing whitespace",
                    "",
                )
                .with_count(affected),
            );
            text = trimmed;
        }
    }

    if opts.ensure_final_newline && !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
        records.push(ChangeRecord::new(
            BYTE_PASS,
            ChangeKind::LineEndingNormalized,
            0,
            "",
            "\n",
        ));
    }

    Ok(ByteRepair {
        text,
        encoding,
        records,
        lines_before,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::NormalizeOptions;

    fn defaults() -> NormalizeOptions {
        NormalizeOptions::default()
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let raw = b"\xEF\xBB\xBFhello\n";
        let repaired = repair_bytes(raw, &defaults()).unwrap();
        assert_eq!(repaired.text, "hello\n");
        assert_eq!(repaired.encoding, SourceEncoding::Utf8Bom);
        assert_eq!(repaired.records[0].kind, ChangeKind::BomRemoved);
    }

    #[test]
    fn test_utf16le_decoded() {
        let mut raw = vec![0xFF, 0xFE];
        for unit in "ok\n".encode_utf16() {
            raw.extend_from_slice(&unit.to_le_bytes());
        }
        let repaired = repair_bytes(&raw, &defaults()).unwrap();
        assert_eq!(repaired.text, "ok\n");
        assert_eq!(repaired.encoding, SourceEncoding::Utf16Le);
    }

    #[test]
    fn test_utf16_odd_length_rejected() {
        let raw = [0xFF, 0xFE, 0x41];
        let err = repair_bytes(&raw, &defaults()).unwrap_err();
        assert!(matches!(err, NormalizeError::Decode { .. }));
    }

    #[test]
    fn test_latin1_fallback_recorded() {
        // 0xDF is 'ß' in Latin-1 and invalid as a standalone UTF-8 byte.
        let raw = b"Stra\xDFe\n";
        let repaired = repair_bytes(raw, &defaults()).unwrap();
        assert_eq!(repaired.encoding, SourceEncoding::Latin1Fallback);
        assert_eq!(repaired.text, "Straße\n");
        assert!(repaired
            .records
            .iter()
            .any(|r| r.kind == ChangeKind::EncodingRecovered));
    }

    #[test]
    fn test_line_endings_normalized_once_with_count() {
        let raw = b"a\r\nb\rc\n";
        let repaired = repair_bytes(raw, &defaults()).unwrap();
        assert_eq!(repaired.text, "a\nb\nc\n");
        let record = repaired
            .records
            .iter()
            .find(|r| r.kind == ChangeKind::LineEndingNormalized)
            .unwrap();
        assert_eq!(record.count, 2);
        assert_eq!(record.line, 0);
    }

    #[test]
    fn test_conflict_markers_reported_not_rewritten() {
        let raw = b"<<<<<<< HEAD\nours\n=======\ntheirs\n>>>>>>> branch\n";
        let repaired = repair_bytes(raw, &defaults()).unwrap();
        assert_eq!(repaired.text, std::str::from_utf8(raw).unwrap());
        let lines: Vec<usize> = repaired
            .records
            .iter()
            .filter(|r| r.kind == ChangeKind::ConflictMarkerFound)
            .map(|r| r.line)
            .collect();
        assert_eq!(lines, vec![1, 3, 5]);
    }

    #[test]
    fn test_short_marker_runs_ignored() {
        let raw = b"<<<<<< six\n====== six\n";
        let repaired = repair_bytes(raw, &defaults()).unwrap();
        assert!(!repaired
            .records
            .iter()
            .any(|r| r.kind == ChangeKind::ConflictMarkerFound));
    }

    #[test]
    fn test_control_chars_stripped_first_detailed() {
        let raw = b"a\x07b\x07c\nclean\n";
        let repaired = repair_bytes(raw, &defaults()).unwrap();
        assert_eq!(repaired.text, "abc\nclean\n");
        let record = repaired
            .records
            .iter()
            .find(|r| r.kind == ChangeKind::ControlCharRemoved)
            .unwrap();
        assert_eq!(record.line, 1);
        assert_eq!(record.count, 2);
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        let raw = b"a  \nb\t\nc\n";
        let repaired = repair_bytes(raw, &defaults()).unwrap();
        assert_eq!(repaired.text, "a\nb\nc\n");
        let record = repaired
            .records
            .iter()
            .find(|r| r.kind == ChangeKind::TrailingWhitespaceTrimmed)
            .unwrap();
        assert_eq!(record.count, 2);
    }

    #[test]
    fn test_final_newline_appended() {
        let raw = b"no newline";
        let repaired = repair_bytes(raw, &defaults()).unwrap();
        assert_eq!(repaired.text, "no newline\n");
    }

    #[test]
    fn test_empty_input_stays_empty() {
        let repaired = repair_bytes(b"", &defaults()).unwrap();
        assert_eq!(repaired.text, "");
        assert!(repaired.records.is_empty());
    }
}
