//! Markup de-escaping for over-escaped converter output.
//!
//! Rules run in a fixed order, each in a single pass over the text:
//! escaped-command collapsing, ampersand repair, hypertarget/label pairing,
//! auto-label regeneration, wrapper collapsing, blank-line collapsing.
//! A rule never re-consumes its own output; the pipeline as a whole is
//! idempotent, so a second run reports no changes.

mod hypertarget;
mod labels;
mod rules;

pub use labels::slugify;

use regex::{Captures, Regex};

use crate::core::pipeline::NormalizeOptions;
use crate::utils::report::{ChangeKind, ChangeRecord, MARKUP_PASS};

/// Run the de-escaping pass over already-repaired text.
pub fn de_escape(text: &str, opts: &NormalizeOptions) -> (String, Vec<ChangeRecord>) {
    let mut records = Vec::new();
    let mut out = rules::collapse_escaped_commands(text, &mut records);
    out = rules::fix_double_backslash_ampersand(&out, &mut records);
    out = hypertarget::repair_hypertargets(&out, &mut records);
    out = labels::regenerate_auto_labels(&out, &opts.slug_allowed, &mut records);
    out = rules::collapse_redundant_wrappers(&out, &mut records);
    out = collapse_blank_lines(&out, &mut records);
    (out, records)
}

/// 1-based line number of a byte offset.
pub(crate) fn line_of(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Stitch non-overlapping matches back together, letting the callback veto
/// individual matches by returning `None`.
pub(crate) fn rewrite_matches(
    re: &Regex,
    text: &str,
    mut rewrite: impl FnMut(&Captures, usize) -> Option<String>,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0usize;
    for caps in re.captures_iter(text) {
        let m = caps.get(0).unwrap();
        out.push_str(&text[last..m.start()]);
        match rewrite(&caps, m.start()) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(m.as_str()),
        }
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Collapse runs of three or more blank lines to exactly two.
fn collapse_blank_lines(text: &str, records: &mut Vec<ChangeRecord>) -> String {
    let ends_with_newline = text.ends_with('\n');
    let mut lines: Vec<&str> = text.split('\n').collect();
    if ends_with_newline {
        lines.pop();
    }

    let is_blank = |line: &str| line.chars().all(|c| c == ' ' || c == '\t');

    let mut out_lines: Vec<&str> = Vec::with_capacity(lines.len());
    let mut i = 0usize;
    while i < lines.len() {
        if is_blank(lines[i]) {
            let run_start = i;
            while i < lines.len() && is_blank(lines[i]) {
                i += 1;
            }
            let run_len = i - run_start;
            let kept = run_len.min(2);
            for line in &lines[run_start..run_start + kept] {
                out_lines.push(line);
            }
            if run_len > 2 {
                records.push(
                    ChangeRecord::new(
                        MARKUP_PASS,
                        ChangeKind::BlankLinesCollapsed,
                        run_start + 1,
                        format!("{} blank lines", run_len),
                        "2 blank lines",
                    )
                    .with_count(run_len - 2),
                );
            }
            continue;
        }
        out_lines.push(lines[i]);
        i += 1;
    }

    let mut out = out_lines.join("\n");
    if ends_with_newline {
        out.push('\n');
    }
    out
}
