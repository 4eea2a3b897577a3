//! Error handling for normalization operations
//!
//! This module provides the per-file error type used by the pipeline and the
//! safety envelope, plus the diagnostic type the CLI prints.

use std::fmt;

/// Normalization error type
#[derive(Debug, Clone)]
pub enum NormalizeError {
    /// No viable decoding exists for the input bytes, even with fallback
    Decode { message: String },
    /// Backup or write failure; the original file is left intact
    Io { message: String },
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::Decode { message } => {
                write!(f, "Decode error: {}", message)
            }
            NormalizeError::Io { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for NormalizeError {}

impl From<std::io::Error> for NormalizeError {
    fn from(err: std::io::Error) -> Self {
        NormalizeError::Io {
            message: err.to_string(),
        }
    }
}

// Convenience constructors
impl NormalizeError {
    pub fn decode(message: impl Into<String>) -> Self {
        NormalizeError::Decode {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        NormalizeError::Io {
            message: message.into(),
        }
    }
}

/// Result type for normalization operations
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Severity level for CLI diagnostics (determines coloring and exit behavior).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    /// Critical errors (red) - e.g., undecodable file, failed write
    Error,
    /// Warnings (yellow) - e.g., unresolved conflict markers
    Warning,
    /// Informational (cyan) - e.g., dry-run previews
    Info,
}

/// Diagnostic line for CLI output.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level (for coloring and exit status)
    pub severity: DiagnosticSeverity,
    /// Finding kind as string (e.g., "conflict", "decode-error")
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Location context (e.g., a path or "line 10")
    pub location: Option<String>,
}

impl Diagnostic {
    pub fn new(
        severity: DiagnosticSeverity,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind: kind.into(),
            message: message.into(),
            location: None,
        }
    }

    /// Add location context.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Get ANSI color code for this diagnostic's severity.
    pub fn color_code(&self) -> &'static str {
        match self.severity {
            DiagnosticSeverity::Error => "\x1b[31m",   // red
            DiagnosticSeverity::Warning => "\x1b[33m", // yellow
            DiagnosticSeverity::Info => "\x1b[36m",    // cyan
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref loc) = self.location {
            write!(f, "[{}] {}: {}", self.kind, loc, self.message)
        } else {
            write!(f, "[{}] {}", self.kind, self.message)
        }
    }
}
