//! Hypertarget/label pairing repair.
//!
//! Converters anchor headings as
//! `\hypertarget{id}{% \section{Title}\label{id}}`, sometimes with the
//! label trailing the closing brace instead. Once the label is stable the
//! wrapper is redundant, so the pair collapses to the bare heading followed
//! by its label on the next line. Titles may carry one nested brace group,
//! which is why this is a depth-counted scan and not a regex.

use super::line_of;
use super::rules::read_group;
use crate::utils::report::{ChangeKind, ChangeRecord, MARKUP_PASS};

const HEADINGS: [&str; 4] = ["section", "subsection", "subsubsection", "paragraph"];

struct HypertargetMatch {
    end: usize,
    replacement: String,
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i] as char).is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Scan a simple brace group (no nesting, no commands, single line).
fn read_simple_group(text: &str, open: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'}' => return Some((&text[open + 1..i], i + 1)),
            b'{' | b'\\' | b'\n' => return None,
            _ => i += 1,
        }
    }
    None
}

fn read_label(text: &str, start: usize) -> Option<(&str, usize)> {
    const LABEL: &str = "\\label";
    if !text[start..].starts_with(LABEL) {
        return None;
    }
    read_simple_group(text, start + LABEL.len())
}

fn match_hypertarget(text: &str, start: usize) -> Option<HypertargetMatch> {
    let bytes = text.as_bytes();
    let mut i = start + "\\hypertarget".len();

    let (id, after_id) = read_simple_group(text, i)?;
    i = after_id;

    if bytes.get(i) != Some(&b'{') {
        return None;
    }
    i += 1;
    if bytes.get(i) == Some(&b'%') {
        i += 1;
    }
    i = skip_ws(bytes, i);

    if bytes.get(i) != Some(&b'\\') {
        return None;
    }
    let cmd_start = i + 1;
    let mut j = cmd_start;
    while j < bytes.len() && bytes[j].is_ascii_alphabetic() {
        j += 1;
    }
    let cmd = &text[cmd_start..j];
    if !HEADINGS.contains(&cmd) {
        return None;
    }
    let starred = bytes.get(j) == Some(&b'*');
    if starred {
        j += 1;
    }
    i = skip_ws(bytes, j);

    // Title with at most one nested brace group.
    let (title, after_title) = read_group(text, i, 2)?;
    i = skip_ws(bytes, after_title);

    // The label sits either inside the wrapper argument or right after it.
    let mut label: Option<&str> = None;
    if let Some((found, next)) = read_label(text, i) {
        label = Some(found);
        i = skip_ws(bytes, next);
    }
    if bytes.get(i) != Some(&b'}') {
        return None;
    }
    i += 1;
    if label.is_none() {
        let k = skip_ws(bytes, i);
        if let Some((found, next)) = read_label(text, k) {
            label = Some(found);
            i = next;
        }
    }
    let label = label?;
    if label != id {
        return None;
    }

    let star = if starred { "*" } else { "" };
    let replacement = format!("\\{}{}{{{}}}\n\\label{{{}}}", cmd, star, title, id);
    Some(HypertargetMatch {
        end: i,
        replacement,
    })
}

/// Collapse matching hypertarget/heading/label triples across the text.
pub fn repair_hypertargets(text: &str, records: &mut Vec<ChangeRecord>) -> String {
    const CMD: &str = "\\hypertarget";
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'\\' && text[i..].starts_with(CMD) {
            if let Some(found) = match_hypertarget(text, i) {
                records.push(ChangeRecord::new(
                    MARKUP_PASS,
                    ChangeKind::WrapperCollapsed,
                    line_of(text, i),
                    text[i..found.end].to_string(),
                    found.replacement.clone(),
                ));
                out.extend_from_slice(found.replacement.as_bytes());
                i = found.end;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_outside_wrapper() {
        let mut records = Vec::new();
        let input = "\\hypertarget{id}{%\\section{A \\textbf{B} C}}\\label{id}";
        let out = repair_hypertargets(input, &mut records);
        assert_eq!(out, "\\section{A \\textbf{B} C}\n\\label{id}");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::WrapperCollapsed);
    }

    #[test]
    fn test_label_inside_wrapper_with_newline() {
        let mut records = Vec::new();
        let input = "\\hypertarget{intro}{%\n\\section{Introduction}\\label{intro}}\nBody.\n";
        let out = repair_hypertargets(input, &mut records);
        assert_eq!(out, "\\section{Introduction}\n\\label{intro}\nBody.\n");
    }

    #[test]
    fn test_starred_heading_kept() {
        let mut records = Vec::new();
        let input = "\\hypertarget{pre}{%\n\\section*{Preface}\\label{pre}}";
        let out = repair_hypertargets(input, &mut records);
        assert_eq!(out, "\\section*{Preface}\n\\label{pre}");
    }

    #[test]
    fn test_id_mismatch_untouched() {
        let mut records = Vec::new();
        let input = "\\hypertarget{one}{%\\section{T}}\\label{two}";
        let out = repair_hypertargets(input, &mut records);
        assert_eq!(out, input);
        assert!(records.is_empty());
    }

    #[test]
    fn test_deep_nesting_untouched() {
        let mut records = Vec::new();
        let input = "\\hypertarget{x}{%\\section{A \\textbf{B \\emph{C}}}}\\label{x}";
        let out = repair_hypertargets(input, &mut records);
        assert_eq!(out, input);
        assert!(records.is_empty());
    }

    #[test]
    fn test_non_heading_wrapper_untouched() {
        let mut records = Vec::new();
        let input = "\\hypertarget{x}{%\\textbf{not a heading}}\\label{x}";
        let out = repair_hypertargets(input, &mut records);
        assert_eq!(out, input);
        assert!(records.is_empty());
    }
}
