//! Character classification for converter-generated text.
//!
//! Maps problematic code points to canonical ASCII replacements. Exact
//! entries win over the range buckets; ASCII and a fixed set of precomposed
//! Latin letters pass through unchanged.

use fxhash::FxHashMap;
use phf::{phf_map, phf_set};
use serde::Serialize;

use crate::utils::report::{ChangeKind, ChangeRecord, BYTE_PASS};

/// Category of a replaced character, carried into the change records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CharCategory {
    Invisible,
    Typographic,
    Symbol,
    Emoji,
    CjkOrHigh,
    Control,
}

/// Resolution for one scalar value. `classify` is total: every `char`
/// resolves to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharDecision {
    Keep,
    Replace {
        text: &'static str,
        category: CharCategory,
    },
}

/// Exact code-point replacements. A specific entry always beats the bucket
/// that contains it.
static EXACT: phf::Map<char, (&'static str, CharCategory)> = phf_map! {
    // Zero-width and joiner characters
    '\u{00AD}' => ("", CharCategory::Invisible),
    '\u{200B}' => ("", CharCategory::Invisible),
    '\u{200C}' => ("", CharCategory::Invisible),
    '\u{200D}' => ("", CharCategory::Invisible),
    '\u{2060}' => ("", CharCategory::Invisible),
    '\u{FEFF}' => ("", CharCategory::Invisible),
    // Space variants
    '\u{00A0}' => (" ", CharCategory::Typographic),
    '\u{2002}' => (" ", CharCategory::Typographic),
    '\u{2003}' => (" ", CharCategory::Typographic),
    '\u{2009}' => (" ", CharCategory::Typographic),
    '\u{202F}' => (" ", CharCategory::Typographic),
    '\u{3000}' => (" ", CharCategory::Typographic),
    // Quotes and apostrophes
    '\u{00B4}' => ("'", CharCategory::Typographic),
    '\u{2018}' => ("'", CharCategory::Typographic),
    '\u{2019}' => ("'", CharCategory::Typographic),
    '\u{201A}' => ("'", CharCategory::Typographic),
    '\u{201B}' => ("'", CharCategory::Typographic),
    '\u{201C}' => ("\"", CharCategory::Typographic),
    '\u{201D}' => ("\"", CharCategory::Typographic),
    '\u{201E}' => ("\"", CharCategory::Typographic),
    '\u{00AB}' => ("\"", CharCategory::Typographic),
    '\u{00BB}' => ("\"", CharCategory::Typographic),
    '\u{2032}' => ("'", CharCategory::Typographic),
    '\u{2033}' => ("\"", CharCategory::Typographic),
    // Hyphens and dashes
    '\u{2010}' => ("-", CharCategory::Typographic),
    '\u{2011}' => ("-", CharCategory::Typographic),
    '\u{2012}' => ("-", CharCategory::Typographic),
    '\u{2013}' => ("-", CharCategory::Typographic),
    '\u{2014}' => ("--", CharCategory::Typographic),
    '\u{2015}' => ("--", CharCategory::Typographic),
    '\u{2212}' => ("-", CharCategory::Typographic),
    // Punctuation and common symbols
    '\u{2026}' => ("...", CharCategory::Typographic),
    '\u{2022}' => ("*", CharCategory::Symbol),
    '\u{00B7}' => (".", CharCategory::Symbol),
    '\u{00D7}' => ("x", CharCategory::Symbol),
    '\u{00F7}' => ("/", CharCategory::Symbol),
    '\u{2044}' => ("/", CharCategory::Symbol),
    '\u{2190}' => ("<-", CharCategory::Symbol),
    '\u{2192}' => ("->", CharCategory::Symbol),
    '\u{21D2}' => ("=>", CharCategory::Symbol),
};

/// Precomposed Latin letters that survive unchanged.
static ALLOWED_ACCENTS: phf::Set<char> = phf_set! {
    'ä', 'ö', 'ü', 'Ä', 'Ö', 'Ü', 'ß',
    'à', 'á', 'â', 'ã', 'å', 'æ', 'ç', 'è', 'é', 'ê', 'ë',
    'ì', 'í', 'î', 'ï', 'ñ', 'ò', 'ó', 'ô', 'õ', 'ø', 'œ',
    'ù', 'ú', 'û', 'ý',
    'À', 'Á', 'Â', 'Ã', 'Å', 'Æ', 'Ç', 'È', 'É', 'Ê', 'Ë',
    'Ì', 'Í', 'Î', 'Ï', 'Ñ', 'Ò', 'Ó', 'Ô', 'Õ', 'Ø', 'Œ',
    'Ù', 'Ú', 'Û', 'Ý',
};

/// Classify one scalar value. Total, pure, deterministic.
///
/// Resolution order: exact entry, control strip, ASCII pass-through, accent
/// allow-list, then the range buckets (`emoji >= U+1F000`, `symbols
/// U+2000..=U+2FFF`, `cjk >= U+3000`, generic above U+00FF). Remaining
/// Latin-1 scalars pass through.
pub fn classify(ch: char) -> CharDecision {
    if let Some(&(text, category)) = EXACT.get(&ch) {
        return CharDecision::Replace { text, category };
    }
    if ch == '\t' || ch == '\n' || ch == '\r' {
        return CharDecision::Keep;
    }
    if ch.is_control() {
        return CharDecision::Replace {
            text: "",
            category: CharCategory::Control,
        };
    }
    if ch.is_ascii() {
        return CharDecision::Keep;
    }
    if ALLOWED_ACCENTS.contains(&ch) {
        return CharDecision::Keep;
    }
    let cp = ch as u32;
    if cp >= 0x1F000 {
        CharDecision::Replace {
            text: "(emoji)",
            category: CharCategory::Emoji,
        }
    } else if (0x2000..=0x2FFF).contains(&cp) {
        CharDecision::Replace {
            text: "(symbol)",
            category: CharCategory::Symbol,
        }
    } else if cp >= 0x3000 {
        CharDecision::Replace {
            text: "(cjk)",
            category: CharCategory::CjkOrHigh,
        }
    } else if cp > 0xFF {
        CharDecision::Replace {
            text: "(unicode)",
            category: CharCategory::CjkOrHigh,
        }
    } else {
        CharDecision::Keep
    }
}

// Flush order for grouped records; a fixed order keeps reports stable.
const CATEGORY_ORDER: [CharCategory; 6] = [
    CharCategory::Invisible,
    CharCategory::Typographic,
    CharCategory::Symbol,
    CharCategory::Emoji,
    CharCategory::CjkOrHigh,
    CharCategory::Control,
];

#[derive(Default)]
struct Group {
    before: String,
    after: String,
    count: usize,
}

fn flush_line(
    line: usize,
    groups: &mut FxHashMap<CharCategory, Group>,
    records: &mut Vec<ChangeRecord>,
) {
    for category in CATEGORY_ORDER {
        if let Some(group) = groups.remove(&category) {
            let kind = if category == CharCategory::Control {
                ChangeKind::ControlCharRemoved
            } else {
                ChangeKind::CharReplaced
            };
            records.push(
                ChangeRecord::new(BYTE_PASS, kind, line, group.before, group.after)
                    .with_count(group.count),
            );
        }
    }
}

/// Apply `classify` to every scalar above U+007F. ASCII is never remapped
/// here; C0 control handling belongs to the dedicated strip step.
///
/// Replacements are reported once per line and category, with the group's
/// originals and replacements concatenated in occurrence order.
pub fn map_chars(text: &str) -> (String, Vec<ChangeRecord>) {
    let mut out = String::with_capacity(text.len());
    let mut records = Vec::new();
    let mut groups: FxHashMap<CharCategory, Group> = FxHashMap::default();
    let mut line = 1usize;

    for ch in text.chars() {
        if ch == '\n' {
            flush_line(line, &mut groups, &mut records);
            line += 1;
            out.push(ch);
            continue;
        }
        if ch.is_ascii() {
            out.push(ch);
            continue;
        }
        match classify(ch) {
            CharDecision::Keep => out.push(ch),
            CharDecision::Replace { text: rep, category } => {
                let group = groups.entry(category).or_default();
                group.before.push(ch);
                group.after.push_str(rep);
                group.count += 1;
                out.push_str(rep);
            }
        }
    }
    flush_line(line, &mut groups, &mut records);

    (out, records)
}
