//! Collector for accumulating diagnostics while loading a scene.
//!
//! The [`DiagnosticCollector`] allows every phase to report multiple errors
//! instead of failing on the first error encountered. It also
//! tracks the file currently being read or expanded so that diagnostics are
//! attributed to the right file without every caller passing it along.

use std::rc::Rc;

use scenery_core::location::Location;

use crate::{
    attribute::Attribute,
    error::{Diagnostic, ErrorCode},
};

/// A collector for accumulating diagnostics.
#[derive(Debug)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    file: Rc<str>,
}

impl DiagnosticCollector {
    /// Create a new empty collector attributing diagnostics to `file`.
    pub fn new(file: impl Into<Rc<str>>) -> Self {
        Self {
            diagnostics: Vec::new(),
            error_count: 0,
            file: file.into(),
        }
    }

    /// Emit a diagnostic to this collector.
    ///
    /// Diagnostics without a file are attributed to the current file.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        let diagnostic = if diagnostic.has_file() {
            diagnostic
        } else {
            diagnostic.in_file(&*self.file)
        };
        if diagnostic.severity().is_error() {
            self.error_count += 1;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Emit an error with a code at a location in the current file.
    pub fn error(&mut self, code: ErrorCode, location: Location, message: impl Into<String>) {
        self.emit(
            Diagnostic::error(message)
                .with_code(code)
                .with_location(location),
        );
    }

    /// Emit `diagnostic` at `attribute`, in the file that defines it.
    pub fn emit_at(&mut self, attribute: &Attribute, diagnostic: Diagnostic) {
        let diagnostic = diagnostic.with_location(attribute.location());
        match attribute.file() {
            Some(file) => self.emit(diagnostic.in_file(&**file)),
            None => self.emit(diagnostic),
        }
    }

    /// Emit an error with a code at `attribute`.
    pub fn error_at(
        &mut self,
        code: ErrorCode,
        attribute: &Attribute,
        message: impl Into<String>,
    ) {
        self.emit_at(attribute, Diagnostic::error(message).with_code(code));
    }

    /// Switch the current file, returning the previous one.
    pub fn set_file(&mut self, file: Rc<str>) -> Rc<str> {
        std::mem::replace(&mut self.file, file)
    }

    /// The file diagnostics are currently attributed to.
    pub fn file(&self) -> &Rc<str> {
        &self.file
    }

    /// Number of error-severity diagnostics emitted so far.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Consume the collector and return every diagnostic in emission order.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeSet;

    #[test]
    fn test_collector_attributes_current_file() {
        let mut collector = DiagnosticCollector::new("scene.scn");
        collector.error(ErrorCode::E101, Location::new(1, 1), "Unexpected element");

        let previous = collector.set_file(Rc::from("parts/arm.scn"));
        assert_eq!(previous.as_ref(), "scene.scn");
        collector.error(ErrorCode::E103, Location::new(2, 5), "Unexpected text");

        let diagnostics = collector.into_diagnostics();
        assert_eq!(diagnostics[0].file(), "scene.scn");
        assert_eq!(diagnostics[1].file(), "parts/arm.scn");
    }

    #[test]
    fn test_collector_keeps_explicit_file() {
        let mut collector = DiagnosticCollector::new("scene.scn");
        collector.emit(Diagnostic::note("Defined here").in_file("other.scn"));

        let diagnostics = collector.into_diagnostics();
        assert_eq!(diagnostics[0].file(), "other.scn");
    }

    #[test]
    fn test_error_count() {
        let mut collector = DiagnosticCollector::new("scene.scn");
        assert!(collector.is_empty());
        collector.error(ErrorCode::E200, Location::unknown(), "an error");
        collector.emit(Diagnostic::note("Defined here"));

        assert!(collector.has_errors());
        assert_eq!(collector.error_count(), 1);
        assert_eq!(collector.into_diagnostics().len(), 2);
    }

    #[test]
    fn test_error_at_inherited_attribute() {
        let mut defined = AttributeSet::new();
        defined.insert("radius", "-1", Location::new(4, 9)).unwrap();
        let mut merged = AttributeSet::new();
        merged.insert("ref", "ball", Location::new(2, 3)).unwrap();
        let file: Rc<str> = Rc::from("parts/ball.scn");
        merged
            .insert_if_absent("radius", defined.get("radius").unwrap(), &file)
            .unwrap();

        let mut collector = DiagnosticCollector::new("scene.scn");
        let radius = merged.get("radius").unwrap();
        collector.error_at(ErrorCode::E302, radius, "Value of \"radius\" must be positive");
        let reference = merged.get("ref").unwrap();
        collector.error_at(ErrorCode::E202, reference, "Unexpected attribute \"ref\"");

        let messages: Vec<String> = collector
            .into_diagnostics()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            messages,
            vec![
                "parts/ball.scn:4:9: error: Value of \"radius\" must be positive",
                "scene.scn:2:3: error: Unexpected attribute \"ref\"",
            ]
        );
    }
}
