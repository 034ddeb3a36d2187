//! Source provenance for markup constructs.

use std::fmt;

/// A position in a scene file.
///
/// Both parts are optional. A location without a line carries no precise
/// position and is rendered as the bare file name in diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Location {
    line: Option<u32>,
    column: Option<u32>,
}

impl Location {
    /// Create a location pointing at a line and column (both 1-based).
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            line: Some(line),
            column: Some(column),
        }
    }

    /// Create a location that only knows its line.
    pub fn at_line(line: u32) -> Self {
        Self {
            line: Some(line),
            column: None,
        }
    }

    /// A location without any position information.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// The 1-based line, if known.
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// The 1-based column, if known.
    ///
    /// A column is only meaningful together with a line.
    pub fn column(&self) -> Option<u32> {
        self.line.and(self.column)
    }

    /// Whether this location carries a line number.
    pub fn is_known(&self) -> bool {
        self.line.is_some()
    }
}

/// Renders the location suffix used in diagnostics: `:line:column`,
/// `:line`, or nothing.
impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
            if let Some(column) = self.column {
                write!(f, ":{column}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        assert_eq!(Location::new(3, 14).to_string(), ":3:14");
        assert_eq!(Location::at_line(7).to_string(), ":7");
        assert_eq!(Location::unknown().to_string(), "");
    }

    #[test]
    fn test_column_requires_line() {
        let location = Location {
            line: None,
            column: Some(4),
        };
        assert_eq!(location.column(), None);
        assert!(!location.is_known());
    }
}
