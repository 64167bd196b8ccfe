//! Diagnostic sink and pass `Context`, replacing the reference compiler's
//! process-global error count and verbosity flag (see the "Global mutable
//! state" design note) with an explicit object threaded through every pass.

use std::fmt::{self, Display};

use crate::lexer::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(message: impl ToString, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.to_string(),
            span,
        }
    }

    pub fn warning(message: impl ToString, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.to_string(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Diagnostic {
    /// `<file>:<line>:<column>: <severity>: <message>` (§6.3).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.span.file,
            self.span.start.0 + 1,
            self.span.start.1 + 1,
            self.severity,
            self.message
        )
    }
}

/// State threaded through every pass instead of process-global mutable
/// state: a diagnostic sink and a verbosity knob (§4.K, §6.4).
#[derive(Debug, Clone, Default)]
pub struct Context {
    diagnostics: Vec<Diagnostic>,
    pub verbose: bool,
}

impl Context {
    pub fn new(verbose: bool) -> Self {
        Context {
            diagnostics: vec![],
            verbose,
        }
    }

    pub fn error(&mut self, message: impl ToString, span: Span) {
        if self.verbose {
            log::trace!("recording error at {span:?}: {}", message.to_string());
        }
        self.diagnostics.push(Diagnostic::error(message, span));
    }

    pub fn warning(&mut self, message: impl ToString, span: Span) {
        if self.verbose {
            log::trace!("recording warning at {span:?}: {}", message.to_string());
        }
        self.diagnostics.push(Diagnostic::warning(message, span));
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}
