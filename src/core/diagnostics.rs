//! Append-only diagnostic sink shared by every gate.
//!
//! Gates receive `&mut DiagnosticSink` and may only append. The exit code is
//! derived from the recorded severities and is the contract CI depends on:
//! errors dominate warnings, warnings dominate a clean run.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Pass,
}

impl Severity {
    /// Fixed-width tag used by the plain-text summary.
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
            Severity::Info => "INFO ",
            Severity::Pass => "OK   ",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Pass => "pass",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: String,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Default, Clone)]
pub struct DiagnosticSink {
    diags: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, category: &str, message: impl Into<String>) {
        self.diags.push(Diagnostic {
            category: category.to_string(),
            message: message.into(),
            severity,
        });
    }

    pub fn error(&mut self, category: &str, message: impl Into<String>) {
        self.push(Severity::Error, category, message);
    }

    pub fn warn(&mut self, category: &str, message: impl Into<String>) {
        self.push(Severity::Warning, category, message);
    }

    pub fn note(&mut self, category: &str, message: impl Into<String>) {
        self.push(Severity::Info, category, message);
    }

    pub fn pass(&mut self, category: &str, message: impl Into<String>) {
        self.push(Severity::Pass, category, message);
    }

    /// Moves every diagnostic from a worker-local buffer into this sink,
    /// keeping the buffer's order.
    pub fn absorb(&mut self, other: DiagnosticSink) {
        self.diags.extend(other.diags);
    }

    /// All diagnostics in insertion order.
    pub fn all(&self) -> &[Diagnostic] {
        &self.diags
    }

    /// Diagnostics of one severity, in insertion order.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diags.iter().filter(move |d| d.severity == severity)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.with_severity(severity).count()
    }

    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn passes(&self) -> usize {
        self.count(Severity::Pass)
    }

    /// `1` if any error, else `2` if any warning, else `0`.
    pub fn exit_code(&self) -> i32 {
        if self.errors() > 0 {
            1
        } else if self.warnings() > 0 {
            2
        } else {
            0
        }
    }

    /// True when an error or warning in `category` names `card_type`.
    /// Per-card messages quote the type in backticks, so `pod` never matches
    /// a finding about `pod_status`.
    pub fn has_issue(&self, category: &str, card_type: &str) -> bool {
        let quoted = format!("`{}`", card_type);
        self.diags.iter().any(|d| {
            matches!(d.severity, Severity::Error | Severity::Warning)
                && d.category == category
                && d.message.contains(&quoted)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diags.len()
    }
}
