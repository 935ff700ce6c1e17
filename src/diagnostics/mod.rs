//! The error sink which every pass reports user facing diagnostics to.
//!
//! Reporting never stops a pass: the sink only records and counts what it is
//! given so that a pass can keep going and find further problems.  The driver
//! checks [`ErrorHandler::error_occurred`] before moving on to code
//! generation.

use log::{error, warn};
use serde::Serialize;

use crate::compiler::{CompilerError, Location};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// A single message reported by a compiler pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<Location>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.location {
            Some(loc) => f.write_fmt(format_args!("{}: {}: {}", loc, self.severity, self.message)),
            None => f.write_fmt(format_args!("{}: {}", self.severity, self.message)),
        }
    }
}

#[derive(Debug, Default)]
pub struct ErrorHandler {
    diagnostics: Vec<Diagnostic>,
    n_errors: usize,
    n_warnings: usize,
}

impl ErrorHandler {
    pub fn new() -> ErrorHandler {
        ErrorHandler::default()
    }

    pub fn report(&mut self, severity: Severity, message: String, location: Option<Location>) {
        match severity {
            Severity::Error => {
                error!("{}", message);
                self.n_errors += 1;
            }
            Severity::Warning => {
                warn!("{}", message);
                self.n_warnings += 1;
            }
        }
        self.diagnostics.push(Diagnostic {
            severity,
            message,
            location,
        });
    }

    pub fn error<M: std::fmt::Display>(&mut self, location: Option<Location>, msg: M) {
        self.report(Severity::Error, msg.to_string(), location)
    }

    pub fn warn<M: std::fmt::Display>(&mut self, location: Option<Location>, msg: M) {
        self.report(Severity::Warning, msg.to_string(), location)
    }

    /// Record a typed user error.
    pub fn report_error<E: std::fmt::Display>(&mut self, e: CompilerError<E>) {
        let location = e.location();
        self.report(Severity::Error, e.inner().to_string(), location)
    }

    pub fn error_occurred(&self) -> bool {
        self.n_errors > 0
    }

    pub fn num_errors(&self) -> usize {
        self.n_errors
    }

    pub fn num_warnings(&self) -> usize {
        self.n_warnings
    }

    /// All diagnostics in the order they were reported.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }
}
