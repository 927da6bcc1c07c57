// diag.rs — Unified diagnostics model
//
// Shared diagnostic types used across all scheduler passes. The core sees
// no source text, so diagnostics carry no spans; context goes into the
// message and hint.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0100`, `W0500`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different semantic
/// meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable diagnostic codes.
pub mod codes {
    use super::DiagCode;

    /// Ill-formed iteration or data space (interval with `lower > upper`).
    pub const E0100: DiagCode = DiagCode("E0100");
    /// Ill-formed conditional annotation (modulo factor of zero).
    pub const E0101: DiagCode = DiagCode("E0101");
    /// Direction-conflict resolution entered an empty cluster group.
    pub const E0200: DiagCode = DiagCode("E0200");
    /// Cyclic dependence graph in topological ordering.
    pub const E0300: DiagCode = DiagCode("E0300");
    /// Direction conflict forced a cluster-group split.
    pub const W0500: DiagCode = DiagCode("W0500");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by any pass. Errors are hard and non-recoverable;
/// warnings accumulate alongside the result.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code or hint.
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            message: message.into(),
            hint: None,
        }
    }

    /// Shorthand for an error-level diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, message)
    }

    /// Shorthand for a warning-level diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, message)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_code() {
        let d = Diagnostic::error("something failed");
        assert_eq!(format!("{d}"), "error: something failed");
    }

    #[test]
    fn display_with_code() {
        let d = Diagnostic::warning("group split").with_code(codes::W0500);
        assert_eq!(format!("{d}"), "warning[W0500]: group split");
    }

    #[test]
    fn builder_chain() {
        let d = Diagnostic::error("cyclic dependence")
            .with_code(codes::E0300)
            .with_hint("check the upstream equation construction");

        assert_eq!(d.code, Some(codes::E0300));
        assert_eq!(d.hint.as_deref(), Some("check the upstream equation construction"));
        assert_eq!(d.level, DiagLevel::Error);
    }
}
