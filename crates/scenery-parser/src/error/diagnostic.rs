//! The core diagnostic type for the Scenery error system.
//!
//! A [`Diagnostic`] represents a single error or note together with
//! the file and position it refers to.

use std::fmt;

use scenery_core::location::Location;

use crate::error::{Severity, error_code::ErrorCode};

/// A diagnostic message with provenance information.
///
/// Diagnostics carry:
/// - A severity level
/// - An optional error code for documentation and searchability
/// - A primary message describing the issue
/// - The file name (relative to the directory of the root file)
/// - A line/column location, either of which may be unknown
/// - Optional help text with suggestions
///
/// # Example
///
/// ```text
/// robot.scn:10:3: error: Duplicated name "wheel"
/// parts/wheel.scn:2:1: note: Defined here
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    severity: Severity,
    code: Option<ErrorCode>,
    message: String,
    file: String,
    location: Location,
    help: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    ///
    /// # Example
    ///
    /// ```
    /// # use scenery_parser::error::{Diagnostic, ErrorCode};
    /// # use scenery_core::location::Location;
    ///
    /// let diag = Diagnostic::error("Unresolvable reference \"arm\"")
    ///     .with_code(ErrorCode::E200)
    ///     .with_location(Location::new(3, 7))
    ///     .with_help("define a top-level element named \"arm\" first");
    /// assert!(diag.severity().is_error());
    /// ```
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a note diagnostic.
    ///
    /// Notes accompany the diagnostic emitted right before them.
    pub fn note(message: impl Into<String>) -> Self {
        Self::new(Severity::Note, message)
    }

    /// Get the severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Get the error code, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// Get the primary message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the name of the file this diagnostic refers to.
    ///
    /// Empty until the diagnostic has been emitted into a collector or
    /// explicitly assigned a file.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Get the location within the file.
    pub fn location(&self) -> Location {
        self.location
    }

    /// Get the help text, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Set the error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Set the location.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Set the file name.
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Set help text for this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub(crate) fn has_file(&self) -> bool {
        !self.file.is_empty()
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            file: String::new(),
            location: Location::unknown(),
            help: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}: {}: {}",
            self.file, self.location, self.severity, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_diagnostic() {
        let diag = Diagnostic::error("test error");
        assert_eq!(diag.severity(), Severity::Error);
        assert_eq!(diag.message(), "test error");
        assert!(diag.code().is_none());
        assert!(!diag.location().is_known());
        assert!(diag.help().is_none());
    }

    #[test]
    fn test_note_diagnostic() {
        let diag = Diagnostic::note("Defined here");
        assert!(diag.severity().is_note());
    }

    #[test]
    fn test_diagnostic_builder() {
        let diag = Diagnostic::error("Unexpected element \"Wheel\"")
            .with_code(ErrorCode::E101)
            .in_file("robot.scn")
            .with_location(Location::new(7, 3))
            .with_help("remove the element");

        assert_eq!(diag.code(), Some(ErrorCode::E101));
        assert_eq!(diag.file(), "robot.scn");
        assert_eq!(diag.location(), Location::new(7, 3));
        assert_eq!(diag.help(), Some("remove the element"));
    }

    #[test]
    fn test_display_with_full_location() {
        let diag = Diagnostic::error("Looping reference \"a\"")
            .in_file("scene.scn")
            .with_location(Location::new(12, 4));
        assert_eq!(
            diag.to_string(),
            "scene.scn:12:4: error: Looping reference \"a\""
        );
    }

    #[test]
    fn test_display_with_line_only() {
        let diag = Diagnostic::note("Defined here")
            .in_file("scene.scn")
            .with_location(Location::at_line(3));
        assert_eq!(diag.to_string(), "scene.scn:3: note: Defined here");
    }

    #[test]
    fn test_display_without_location() {
        let diag = Diagnostic::error("Could not load file").in_file("scene.scn");
        assert_eq!(diag.to_string(), "scene.scn: error: Could not load file");
    }
}
