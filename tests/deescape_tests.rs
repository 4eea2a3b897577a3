//! Integration tests for the markup de-escaping pass.

use texmend::{de_escape, ChangeKind, NormalizeOptions};

fn run(input: &str) -> (String, Vec<texmend::ChangeRecord>) {
    de_escape(input, &NormalizeOptions::default())
}

// ============================================================================
// Escaped-command collapsing
// ============================================================================

mod escaped_commands {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_structural_command_restored() {
        let (out, records) = run("\\textbackslash{}subsection\\{Aufbau\\}");
        assert_eq!(out, "\\subsection{Aufbau}");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_labeling_command_restored() {
        let (out, _) = run("see \\ref\\{sec:intro\\}");
        assert_eq!(out, "see \\ref{sec:intro}");
    }

    #[test]
    fn test_unknown_command_is_conservatively_kept() {
        let input = "\\frobnicate\\{x\\} and \\textbackslash{}widget";
        let (out, records) = run(input);
        assert_eq!(out, input);
        assert!(records.is_empty());
    }

    #[test]
    fn test_nested_escaped_braces_not_crossed() {
        // Content containing brace characters stays untouched; the rule only
        // rewrites flat argument shapes.
        let input = "\\section\\{a {nested} b\\}";
        let (out, _) = run(input);
        assert_eq!(out, input);
    }
}

// ============================================================================
// Ampersand repair
// ============================================================================

mod ampersand {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_doubled_backslash_fixed() {
        let (out, records) = run("Meier \\\\& Co.");
        assert_eq!(out, "Meier \\& Co.");
        assert_eq!(records[0].kind, ChangeKind::EscapeCollapsed);
    }

    #[test]
    fn test_space_between_backslashes_and_ampersand_absorbed() {
        let (out, _) = run("A\\\\ & B");
        assert_eq!(out, "A\\& B");
    }

    #[test]
    fn test_already_escaped_ampersand_stable() {
        let (out, records) = run("Meier \\& Co.");
        assert_eq!(out, "Meier \\& Co.");
        assert!(records.is_empty());
    }
}

// ============================================================================
// Hypertarget pairing
// ============================================================================

mod hypertarget {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_braces_in_title_do_not_truncate() {
        let (out, records) = run("\\hypertarget{id}{%\\section{A \\textbf{B} C}}\\label{id}");
        assert_eq!(out, "\\section{A \\textbf{B} C}\n\\label{id}");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::WrapperCollapsed);
    }

    #[test]
    fn test_pandoc_multiline_shape() {
        let input = "\\hypertarget{aufbau}{%\n\\subsection{Aufbau}\\label{aufbau}}\n\nInhalt.\n";
        let (out, _) = run(input);
        assert_eq!(out, "\\subsection{Aufbau}\n\\label{aufbau}\n\nInhalt.\n");
    }

    #[test]
    fn test_mismatched_ids_left_alone() {
        let input = "\\hypertarget{a}{%\\section{T}}\\label{b}";
        let (out, records) = run(input);
        assert_eq!(out, input);
        assert!(records.is_empty());
    }
}

// ============================================================================
// Label regeneration
// ============================================================================

mod labels {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_umlaut_title_slug() {
        let (out, records) = run("\\section{Übung Eins}\\label{section-7}");
        assert_eq!(out, "\\section{Übung Eins}\\label{sec:übung-eins}");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::LabelRegenerated);
    }

    #[test]
    fn test_repeated_runs_are_deterministic() {
        let input = "\\section{Übung Eins}\\label{section-7}";
        let (once, _) = run(input);
        let (twice, records) = run(&once);
        assert_eq!(once, twice);
        assert!(records.is_empty());
    }

    #[test]
    fn test_unnumbered_shape_recognized() {
        let (out, _) = run("\\subsubsection{Edge Cases}\\label{unnumbered-3}");
        assert_eq!(out, "\\subsubsection{Edge Cases}\\label{subsubsec:edge-cases}");
    }

    #[test]
    fn test_hand_written_label_untouched() {
        let input = "\\section{Intro}\\label{my-intro}";
        let (out, records) = run(input);
        assert_eq!(out, input);
        assert!(records.is_empty());
    }

    #[test]
    fn test_empty_slug_is_a_noop() {
        let input = "\\section{!!!}\\label{section-9}";
        let (out, records) = run(input);
        assert_eq!(out, input);
        assert!(records.is_empty());
    }

    #[test]
    fn test_custom_allow_list() {
        let mut opts = NormalizeOptions::default();
        opts.slug_allowed = vec![];
        let (out, _) = de_escape("\\section{Maße}\\label{section-2}", &opts);
        assert_eq!(out, "\\section{Maße}\\label{sec:ma-e}");
    }
}

// ============================================================================
// Wrapper collapsing and blank lines
// ============================================================================

mod wrappers_and_blanks {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_redundant_wrapper_collapsed() {
        let (out, records) = run("\\section{\\texorpdfstring{\\textbf{Fazit}}{Fazit}}");
        assert_eq!(out, "\\section{\\textbf{Fazit}}");
        assert_eq!(records[0].kind, ChangeKind::WrapperCollapsed);
    }

    #[test]
    fn test_math_wrapper_preserved() {
        let input = "\\texorpdfstring{$E=mc^2$}{E=mc2}";
        let (out, records) = run(input);
        assert_eq!(out, input);
        assert!(records.is_empty());
    }

    #[test]
    fn test_blank_runs_collapse() {
        let (out, records) = run("para one\n\n\n\n\npara two\n");
        assert_eq!(out, "para one\n\n\npara two\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::BlankLinesCollapsed);
    }

    #[test]
    fn test_paragraph_break_preserved() {
        let input = "para one\n\npara two\n";
        let (out, records) = run(input);
        assert_eq!(out, input);
        assert!(records.is_empty());
    }
}

// ============================================================================
// Rule chaining
// ============================================================================

mod chaining {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_document_converges_in_one_invocation() {
        let input = "\\hypertarget{section-1}{%\n\
                     \\section{Ergebnisse}\\label{section-1}}\n\
                     \n\
                     \n\
                     \n\
                     Meier \\\\& Co. liefert \\textbackslash{}textbf\\{alles\\}.\n";
        let (once, records) = run(input);
        assert!(!records.is_empty());
        assert_eq!(
            once,
            "\\section{Ergebnisse}\n\\label{sec:ergebnisse}\n\n\nMeier \\& Co. liefert \\textbf{alles}.\n"
        );
        let (twice, second_records) = run(&once);
        assert_eq!(once, twice);
        assert!(second_records.is_empty());
    }
}
