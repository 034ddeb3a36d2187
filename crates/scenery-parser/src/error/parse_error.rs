//! The ParseError type for wrapping loading diagnostics.
//!
//! [`ParseError`] wraps every [`Diagnostic`] collected while loading a scene
//! (markup reading, recording, expansion and attribute validation).

use std::fmt;

use crate::error::Diagnostic;

/// Error type for a failed load.
///
/// Wraps one or more diagnostics, at least one of which is an error.
#[derive(Debug)]
pub struct ParseError {
    diagnostics: Vec<Diagnostic>,
}

impl ParseError {
    /// Create a new parse error from diagnostics.
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Get all diagnostics in this error.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Render every diagnostic in the `file:line:column: severity: message` form.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(first) = self.diagnostics.first() {
            write!(f, "{}", first)?;
            if self.diagnostics.len() > 1 {
                write!(f, " (+{} more)", self.diagnostics.len() - 1)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl From<Diagnostic> for ParseError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

impl From<Vec<Diagnostic>> for ParseError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use scenery_core::location::Location;

    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_parse_error_from_diagnostic() {
        let diag = Diagnostic::error("test error").with_code(ErrorCode::E200);
        let err: ParseError = diag.into();

        assert_eq!(err.diagnostics().len(), 1);
        assert_eq!(err.diagnostics()[0].message(), "test error");
    }

    #[test]
    fn test_parse_error_display_single() {
        let diag = Diagnostic::error("Looping reference \"a\"")
            .in_file("scene.scn")
            .with_location(Location::new(4, 9));
        let err: ParseError = diag.into();

        assert_eq!(
            err.to_string(),
            "scene.scn:4:9: error: Looping reference \"a\""
        );
    }

    #[test]
    fn test_parse_error_display_multiple() {
        let diags = vec![
            Diagnostic::error("first error").in_file("a.scn"),
            Diagnostic::error("second error").in_file("a.scn"),
            Diagnostic::error("third error").in_file("a.scn"),
        ];
        let err: ParseError = diags.into();

        assert_eq!(err.to_string(), "a.scn: error: first error (+2 more)");
        assert_eq!(err.messages().len(), 3);
    }
}
