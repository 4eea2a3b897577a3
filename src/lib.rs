//! Texmend - Normalization and de-escaping engine for converter-generated LaTeX
//!
//! The engine is a pure per-file pipeline: byte/line repair (encoding
//! recovery, BOM and control-character removal, line-ending normalization,
//! conflict-marker detection) followed by markup de-escaping (over-escaped
//! commands, hypertarget wrappers, auto-generated labels). Every mutation is
//! accounted for by a change record, repeated runs are no-ops, and
//! persistence goes through a safety envelope with dry-run, backup and
//! atomic replace.
//!
//! ```
//! use texmend::{normalize, NormalizeOptions};
//!
//! let raw = "Bad \u{2014} dash\r\n".as_bytes();
//! let result = normalize(raw, "doc.tex", &NormalizeOptions::default()).unwrap();
//! assert_eq!(result.text, "Bad -- dash\n");
//! assert!(result.report.has_changes());
//! ```

pub mod core;
pub mod envelope;
pub mod utils;

// Re-export the public surface
pub use self::core::byteline::{repair_bytes, ByteRepair, SourceEncoding};
pub use self::core::charmap::{classify, map_chars, CharCategory, CharDecision};
pub use self::core::deescape::{de_escape, slugify};
pub use self::core::pipeline::{normalize, Normalization, NormalizeOptions, PassName};
pub use self::envelope::{apply, ApplyMode, ApplyOutcome, EnvelopeConfig};
pub use self::utils::error::{
    Diagnostic, DiagnosticSeverity, NormalizeError, NormalizeResult,
};
pub use self::utils::report::{
    AggregateSummary, ChangeKind, ChangeRecord, KindCount, NormalizationReport,
};
