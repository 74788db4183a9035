//! The analyzer's per-block verdict, modeled as a tagged variant so that
//! callers cannot read diagnostic fields meaningless for a given status.
//!
//! Replaces a single struct mixing status and diagnostics with a tagged
//! `{Success(...), Warning(...), Error(...)}` enum so callers cannot read
//! fields meaningless for a given status.

/// One block's analysis outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchVerdict {
    pub filename: String,
    pub kind: VerdictKind,
}

/// The three-valued classification and its status-specific diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum VerdictKind {
    /// Safe to apply as-is.
    Success {
        message: String,
        diff_preview: String,
        line_number: Option<usize>,
        similarity_score: f64,
    },
    /// Applicable, but review is recommended before doing so.
    Warning {
        message: String,
        diff_preview: String,
        line_number: Option<usize>,
        similarity_score: f64,
        suggestions: Vec<String>,
    },
    /// Cannot apply without operator action.
    Error {
        message: String,
        suggestions: Vec<String>,
        error_context: Option<String>,
    },
}

impl PatchVerdict {
    pub fn success(
        filename: impl Into<String>,
        message: impl Into<String>,
        diff_preview: impl Into<String>,
        line_number: Option<usize>,
        similarity_score: f64,
    ) -> Self {
        Self {
            filename: filename.into(),
            kind: VerdictKind::Success {
                message: message.into(),
                diff_preview: diff_preview.into(),
                line_number,
                similarity_score,
            },
        }
    }

    pub fn warning(
        filename: impl Into<String>,
        message: impl Into<String>,
        diff_preview: impl Into<String>,
        line_number: Option<usize>,
        similarity_score: f64,
        suggestions: Vec<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            kind: VerdictKind::Warning {
                message: message.into(),
                diff_preview: diff_preview.into(),
                line_number,
                similarity_score,
                suggestions,
            },
        }
    }

    pub fn error(
        filename: impl Into<String>,
        message: impl Into<String>,
        suggestions: Vec<String>,
        error_context: Option<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            kind: VerdictKind::Error {
                message: message.into(),
                suggestions,
                error_context,
            },
        }
    }

    /// Three-level status marker: ✅ success, ⚠ warning, ❌ error.
    pub fn status_marker(&self) -> &'static str {
        match self.kind {
            VerdictKind::Success { .. } => "\u{2705}",
            VerdictKind::Warning { .. } => "\u{26A0}",
            VerdictKind::Error { .. } => "\u{274C}",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.kind, VerdictKind::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, VerdictKind::Error { .. })
    }

    pub fn message(&self) -> &str {
        match &self.kind {
            VerdictKind::Success { message, .. }
            | VerdictKind::Warning { message, .. }
            | VerdictKind::Error { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_marker() {
        let v = PatchVerdict::success("a.txt", "ok", "", Some(1), 100.0);
        assert_eq!(v.status_marker(), "\u{2705}");
        assert!(v.is_success());
    }

    #[test]
    fn test_error_no_diff_field() {
        let v = PatchVerdict::error("a.txt", "no match", vec![], None);
        assert!(v.is_error());
        assert_eq!(v.message(), "no match");
    }
}
