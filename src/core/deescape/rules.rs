//! Flat-shaped de-escaping rules.
//!
//! These rules undo the backslash/brace over-escaping that lossy converters
//! apply to markup they should have passed through. Unknown command names
//! are left untouched so content that merely looks like markup survives.

use lazy_static::lazy_static;
use phf::phf_set;
use regex::Regex;

use super::{line_of, rewrite_matches};
use crate::utils::report::{ChangeKind, ChangeRecord, MARKUP_PASS};

/// Commands the collapsing rules are allowed to touch.
static KNOWN_COMMANDS: phf::Set<&'static str> = phf_set! {
    // structural
    "chapter", "section", "subsection", "subsubsection", "paragraph",
    // text style
    "textbf", "textit", "texttt", "textsc", "emph", "underline",
    // lists
    "begin", "end", "item",
    // labeling
    "label", "ref", "eqref", "cite", "caption", "footnote",
};

lazy_static! {
    static ref ESCAPED_PREFIX: Regex = Regex::new(r"\\textbackslash\{\}([A-Za-z]+)").unwrap();
    static ref ESCAPED_BRACES: Regex = Regex::new(r"\\([A-Za-z]+)\\\{([^{}]*)\\\}").unwrap();
    // The leading capture keeps a preceding backslash from matching, so
    // literal backslash runs never decay one step per invocation.
    static ref DOUBLE_AMP: Regex = Regex::new(r"(^|[^\\])\\\\[ \t]*&").unwrap();
}

/// Collapse `\textbackslash{}cmd` prefixes and `\cmd\{arg\}` brace escapes
/// back to plain command invocations, for known command names only.
pub fn collapse_escaped_commands(text: &str, records: &mut Vec<ChangeRecord>) -> String {
    let unprefixed = rewrite_matches(&ESCAPED_PREFIX, text, |caps, start| {
        let name = &caps[1];
        if !KNOWN_COMMANDS.contains(name) {
            return None;
        }
        let replacement = format!("\\{}", name);
        records.push(ChangeRecord::new(
            MARKUP_PASS,
            ChangeKind::EscapeCollapsed,
            line_of(text, start),
            caps[0].to_string(),
            replacement.clone(),
        ));
        Some(replacement)
    });

    let unbraced = rewrite_matches(&ESCAPED_BRACES, &unprefixed, |caps, start| {
        let name = &caps[1];
        if !KNOWN_COMMANDS.contains(name) {
            return None;
        }
        let replacement = format!("\\{}{{{}}}", name, &caps[2]);
        records.push(ChangeRecord::new(
            MARKUP_PASS,
            ChangeKind::EscapeCollapsed,
            line_of(&unprefixed, start),
            caps[0].to_string(),
            replacement.clone(),
        ));
        Some(replacement)
    });

    unbraced
}

/// Rewrite a doubled backslash before an ampersand to a single escaped
/// ampersand, absorbing horizontal space between the two.
pub fn fix_double_backslash_ampersand(text: &str, records: &mut Vec<ChangeRecord>) -> String {
    rewrite_matches(&DOUBLE_AMP, text, |caps, start| {
        let replacement = format!("{}\\&", &caps[1]);
        records.push(ChangeRecord::new(
            MARKUP_PASS,
            ChangeKind::EscapeCollapsed,
            line_of(text, start),
            caps[0].to_string(),
            replacement.clone(),
        ));
        Some(replacement)
    })
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

/// Read a brace group starting at `open`, tolerating escaped braces and at
/// most `max_depth` levels of nesting. Returns the inner slice and the index
/// past the closing brace.
pub(super) fn read_group(text: &str, open: usize, max_depth: i32) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }
    let mut depth = 0i32;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => {
                depth += 1;
                if depth > max_depth {
                    return None;
                }
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&text[open + 1..i], i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn is_plain_text(s: &str) -> bool {
    !s.contains('\\') && !s.contains('{') && !s.contains('}') && !s.contains('$')
}

/// Decide whether a `\texorpdfstring{tex}{pdf}` pair is redundant. Returns
/// the surviving argument when the pdf form merely duplicates the text.
fn collapse_wrapper_args(tex: &str, pdf: &str) -> Option<String> {
    let tex = tex.trim();
    let pdf = pdf.trim();
    if !is_plain_text(pdf) {
        return None;
    }
    if is_plain_text(tex) {
        return (tex == pdf).then(|| tex.to_string());
    }
    for cmd in ["textbf", "textit", "emph"] {
        let prefix = format!("\\{}{{", cmd);
        if let Some(rest) = tex.strip_prefix(&prefix) {
            if let Some(inner) = rest.strip_suffix('}') {
                if is_plain_text(inner) && inner.trim() == pdf {
                    return Some(tex.to_string());
                }
            }
        }
    }
    None
}

/// Collapse `\texorpdfstring{X}{x}` to `X` when the bookmark text is a plain
/// duplicate of the rendered text. Anything nested or mathematical stays.
pub fn collapse_redundant_wrappers(text: &str, records: &mut Vec<ChangeRecord>) -> String {
    const WRAPPER: &str = "\\texorpdfstring";
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'\\' && text[i..].starts_with(WRAPPER) {
            let after = i + WRAPPER.len();
            let named_something_else =
                after < bytes.len() && bytes[after].is_ascii_alphabetic();
            if !named_something_else {
                let attempt = read_group(text, skip_ws(bytes, after), 2).and_then(
                    |(tex_arg, end_tex)| {
                        read_group(text, skip_ws(bytes, end_tex), 2)
                            .and_then(|(pdf_arg, end_pdf)| {
                                collapse_wrapper_args(tex_arg, pdf_arg)
                                    .map(|kept| (kept, end_pdf))
                            })
                    },
                );
                if let Some((kept, end)) = attempt {
                    records.push(ChangeRecord::new(
                        MARKUP_PASS,
                        ChangeKind::WrapperCollapsed,
                        line_of(text, i),
                        text[i..end].to_string(),
                        kept.clone(),
                    ));
                    out.extend_from_slice(kept.as_bytes());
                    i = end;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| text.to_string())
}
