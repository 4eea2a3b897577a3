//! Auto-generated label regeneration.
//!
//! Converters emit positional labels like `section-7` that reshuffle on
//! every regeneration. A label of that shape attached to a heading is
//! replaced with a slug derived from the heading title, prefixed by a tag
//! for the heading level. An empty slug keeps the original label.

use lazy_static::lazy_static;
use regex::Regex;

use super::{line_of, rewrite_matches};
use crate::utils::report::{ChangeKind, ChangeRecord, MARKUP_PASS};

lazy_static! {
    // Title allows escaped characters and one nested brace group. The label
    // may sit on the same line or the next, which is where the hypertarget
    // repair leaves it.
    static ref AUTO_LABEL: Regex = Regex::new(
        r"\\(section|subsection|subsubsection)(\*?)\{((?:[^{}\\]|\\.|\{[^{}]*\})*)\}([ \t]*\n?[ \t]*)\\label\{((?:section|subsection|subsubsection|unnumbered)-[0-9]+)\}"
    )
    .unwrap();
}

/// Derive a stable slug from a heading title. Lowercases, maps everything
/// outside `[a-z0-9-]` and the allow-list to `-`, collapses runs, and trims.
pub fn slugify(title: &str, allowed: &[char]) -> String {
    let mut out = String::with_capacity(title.len());
    let mut prev_dash = false;
    for ch in title.to_lowercase().chars() {
        let keep = ch.is_ascii_lowercase()
            || ch.is_ascii_digit()
            || ch == '-'
            || allowed.contains(&ch);
        let mapped = if keep { ch } else { '-' };
        if mapped == '-' {
            if prev_dash {
                continue;
            }
            prev_dash = true;
        } else {
            prev_dash = false;
        }
        out.push(mapped);
    }
    out.trim_matches('-').to_string()
}

fn level_tag(heading: &str) -> &'static str {
    match heading {
        "subsection" => "subsec:",
        "subsubsection" => "subsubsec:",
        _ => "sec:",
    }
}

/// Replace positional auto-labels on headings with title-derived slugs.
pub fn regenerate_auto_labels(
    text: &str,
    allowed: &[char],
    records: &mut Vec<ChangeRecord>,
) -> String {
    rewrite_matches(&AUTO_LABEL, text, |caps, start| {
        let heading = &caps[1];
        let star = &caps[2];
        let title = &caps[3];
        let separator = &caps[4];
        let old_label = &caps[5];

        let slug = slugify(title, allowed);
        if slug.is_empty() {
            return None;
        }
        let new_label = format!("{}{}", level_tag(heading), slug);
        records.push(ChangeRecord::new(
            MARKUP_PASS,
            ChangeKind::LabelRegenerated,
            line_of(text, start),
            old_label.to_string(),
            new_label.clone(),
        ));
        Some(format!(
            "\\{}{}{{{}}}{}\\label{{{}}}",
            heading, star, title, separator, new_label
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const UMLAUTS: [char; 4] = ['ä', 'ö', 'ü', 'ß'];

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Getting Started", &UMLAUTS), "getting-started");
        assert_eq!(slugify("  Spaces  everywhere ", &UMLAUTS), "spaces-everywhere");
        assert_eq!(slugify("v2.0 (beta)", &UMLAUTS), "v2-0-beta");
    }

    #[test]
    fn test_slugify_keeps_allowed_umlauts() {
        assert_eq!(slugify("Übung Eins", &UMLAUTS), "übung-eins");
        assert_eq!(slugify("Maße & Gewichte", &UMLAUTS), "maße-gewichte");
    }

    #[test]
    fn test_slugify_empty_for_symbols_only() {
        assert_eq!(slugify("!!!", &UMLAUTS), "");
        assert_eq!(slugify("---", &UMLAUTS), "");
    }

    #[test]
    fn test_section_label_regenerated() {
        let mut records = Vec::new();
        let out = regenerate_auto_labels(
            "\\section{Übung Eins}\\label{section-7}",
            &UMLAUTS,
            &mut records,
        );
        assert_eq!(out, "\\section{Übung Eins}\\label{sec:übung-eins}");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].before, "section-7");
        assert_eq!(records[0].after, "sec:übung-eins");
    }

    #[test]
    fn test_subsection_tag_and_newline_separator() {
        let mut records = Vec::new();
        let out = regenerate_auto_labels(
            "\\subsection{Setup}\n\\label{unnumbered-3}",
            &UMLAUTS,
            &mut records,
        );
        assert_eq!(out, "\\subsection{Setup}\n\\label{subsec:setup}");
    }

    #[test]
    fn test_stable_label_untouched() {
        let mut records = Vec::new();
        let input = "\\section{Intro}\\label{sec:intro}";
        let out = regenerate_auto_labels(input, &UMLAUTS, &mut records);
        assert_eq!(out, input);
        assert!(records.is_empty());
    }

    #[test]
    fn test_empty_slug_keeps_original_label() {
        let mut records = Vec::new();
        let input = "\\section{!!!}\\label{section-2}";
        let out = regenerate_auto_labels(input, &UMLAUTS, &mut records);
        assert_eq!(out, input);
        assert!(records.is_empty());
    }

    #[test]
    fn test_regeneration_is_deterministic() {
        let mut first = Vec::new();
        let mut second = Vec::new();
        let input = "\\section{Übung Eins}\\label{section-7}";
        let once = regenerate_auto_labels(input, &UMLAUTS, &mut first);
        let twice = regenerate_auto_labels(&once, &UMLAUTS, &mut second);
        assert_eq!(once, twice);
        assert!(second.is_empty());
    }
}
