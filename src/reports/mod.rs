/*!
Diagnostics for a translation unit.

Every diagnostic carries a severity, a primary message with an optional
source location, and zero or more supplementary messages (e.g. the far end of
a cyclic dependency).

The report accumulates diagnostics across the pipeline.
Errors abort compilation at the end of the transformer which noted them,
warnings are kept until the end of the run, and info diagnostics are
suppressed unless explicitly requested.
*/

use serde::{Deserialize, Serialize};

/// A location in the Datalog source handed over by the frontend.
///
/// The frontend is required to place locations on every node it produces.
/// Synthesized nodes default to an unknown location.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrcLocation {
    /// The file the node was read from, when known.
    pub file: Option<String>,

    /// One-based line of the start of the node, zero when unknown.
    pub line: u32,

    /// One-based column of the start of the node, zero when unknown.
    pub column: u32,
}

impl SrcLocation {
    pub fn known(&self) -> bool {
        self.line != 0
    }
}

impl std::fmt::Display for SrcLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.known() {
            return write!(f, "<unknown>");
        }
        match &self.file {
            Some(file) => write!(f, "{file}:{}:{}", self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// The severity of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Suppressed by default.
    Info,

    /// Reported at the end of a run.
    Warning,

    /// Aborts the pipeline at the end of the current pass.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Warning => write!(f, "Warning"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// A message together with the location it concerns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    pub message: String,
    pub location: Option<SrcLocation>,
}

impl DiagnosticMessage {
    pub fn at(message: impl Into<String>, location: SrcLocation) -> Self {
        DiagnosticMessage {
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn free(message: impl Into<String>) -> Self {
        DiagnosticMessage {
            message: message.into(),
            location: None,
        }
    }
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) if loc.known() => write!(f, "{} in {}", self.message, loc),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// A diagnostic: a primary message and any supplementary messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub primary: DiagnosticMessage,
    pub additional: Vec<DiagnosticMessage>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity, self.primary)?;
        for message in &self.additional {
            write!(f, "\n  {message}")?;
        }
        Ok(())
    }
}

/// The accumulated diagnostics of a compilation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorReport {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorReport {
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn add_error(&mut self, message: impl Into<String>, location: SrcLocation) {
        self.add(Diagnostic {
            severity: Severity::Error,
            primary: DiagnosticMessage::at(message, location),
            additional: Vec::default(),
        });
    }

    pub fn add_warning(&mut self, message: impl Into<String>, location: SrcLocation) {
        self.add(Diagnostic {
            severity: Severity::Warning,
            primary: DiagnosticMessage::at(message, location),
            additional: Vec::default(),
        });
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}
