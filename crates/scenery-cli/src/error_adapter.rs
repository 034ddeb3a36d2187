//! Error adapter for converting SceneError to miette diagnostics.
//!
//! This module provides the bridge between the library's error types and
//! miette's rich diagnostic formatting used in the CLI.
//!
//! # Multi-Error Support
//!
//! A failed load carries every diagnostic it produced. Each one is rendered
//! independently, with a snippet of the file it points into when that file
//! can be read and the diagnostic has a line.

use std::{collections::HashMap, fmt, fs, path::Path};

use miette::{
    Diagnostic as MietteDiagnostic, LabeledSpan, NamedSource, Severity as MietteSeverity,
    SourceSpan,
};

use scenery::{Diagnostic, SceneError, Severity};

/// Adapter for a single scenery diagnostic.
pub struct DiagnosticAdapter<'a> {
    diag: &'a Diagnostic,
    /// The file the diagnostic points into, if it could be read.
    src: Option<NamedSource<String>>,
    span: Option<SourceSpan>,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Create a new diagnostic adapter over the text of the file named by
    /// the diagnostic.
    pub fn new(diag: &'a Diagnostic, src: Option<&str>) -> Self {
        let span = src.and_then(|src| locate(src, diag));
        let src = src
            .filter(|_| span.is_some())
            .map(|src| NamedSource::new(diag.file(), src.to_string()));
        Self { diag, src, span }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticAdapter")
            .field("diag", &self.diag)
            .field("span", &self.span)
            .finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span.is_some() {
            write!(f, "{}", self.diag.message())
        } else {
            write!(f, "{}{}: {}", self.diag.file(), self.diag.location(), self.diag.message())
        }
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .code()
            .map(|c| Box::new(c) as Box<dyn fmt::Display>)
    }

    fn severity(&self) -> Option<MietteSeverity> {
        Some(match self.diag.severity() {
            Severity::Error => MietteSeverity::Error,
            Severity::Note => MietteSeverity::Advice,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diag
            .help()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.src.as_ref().map(|src| src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        let label = format!("{}{}", self.diag.file(), self.diag.location());
        Some(Box::new(std::iter::once(
            LabeledSpan::new_primary_with_span(Some(label), span),
        )))
    }
}

/// Adapter for non-diagnostic [`SceneError`] variants.
pub struct ErrorAdapter<'a>(pub &'a SceneError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self.0 {
            SceneError::Io(_) => "scenery::io",
            SceneError::Config(_) => "scenery::config",
            SceneError::Parse { .. } => return None,
        };
        Some(Box::new(code))
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A diagnostic of a failed load.
    Diagnostic(DiagnosticAdapter<'a>),
    /// An error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn severity(&self) -> Option<MietteSeverity> {
        match self {
            Reportable::Diagnostic(d) => d.severity(),
            Reportable::Error(e) => e.severity(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

/// Byte span of the token a diagnostic's line and column point at.
///
/// Columns count characters. The span runs to the next whitespace, `=` or
/// `>` and covers at least one character.
fn locate(src: &str, diag: &Diagnostic) -> Option<SourceSpan> {
    let location = diag.location();
    let line = usize::try_from(location.line()?).ok()?;
    let column = location
        .column()
        .and_then(|column| usize::try_from(column).ok())
        .unwrap_or(1);

    let line_start: usize = src
        .split_inclusive('\n')
        .take(line.checked_sub(1)?)
        .map(str::len)
        .sum();
    let text = src.get(line_start..)?.lines().next().unwrap_or_default();

    let start = text
        .char_indices()
        .nth(column.saturating_sub(1))
        .map_or(text.len(), |(offset, _)| offset);
    let token = &text[start..];
    let len = token
        .find(|c: char| c.is_whitespace() || c == '=' || c == '>')
        .unwrap_or(token.len())
        .max(token.chars().next().map_or(0, char::len_utf8));

    Some(SourceSpan::new((line_start + start).into(), len))
}

/// Convert a [`SceneError`] into a list of reportable errors.
///
/// For [`SceneError::Parse`], this returns one [`Reportable`] for each
/// diagnostic, reading every file named by a diagnostic once from the
/// directory of the root scene file. For other error variants, this returns
/// a single [`Reportable`].
pub fn to_reportables(err: &SceneError) -> Vec<Reportable<'_>> {
    match err {
        SceneError::Parse { err, root_dir } => {
            let mut sources: HashMap<&str, Option<String>> = HashMap::new();
            err.diagnostics()
                .iter()
                .map(|diag| {
                    let src = sources
                        .entry(diag.file())
                        .or_insert_with(|| read_source(root_dir, diag.file()));
                    Reportable::Diagnostic(DiagnosticAdapter::new(diag, src.as_deref()))
                })
                .collect()
        }
        _ => vec![Reportable::Error(ErrorAdapter(err))],
    }
}

fn read_source(root_dir: &Path, file: &str) -> Option<String> {
    fs::read_to_string(root_dir.join(file)).ok()
}

#[cfg(test)]
mod tests {
    use scenery::{ErrorCode, location::Location};
    use scenery_parser::ParseError;

    use super::*;

    fn parse_error(diagnostics: Vec<Diagnostic>) -> SceneError {
        SceneError::new_parse_error(ParseError::from(diagnostics), "/nonexistent")
    }

    #[test]
    fn test_locate_token() {
        let src = "<Simulation>\n  <Body ref=\"x\" />\n";
        let diag = Diagnostic::error("Unresolvable reference \"x\"")
            .in_file("scene.scn")
            .with_location(Location::new(2, 9));

        let span = locate(src, &diag).unwrap();

        assert_eq!(span.offset(), 21);
        assert_eq!(span.len(), 3);
        assert_eq!(&src[span.offset()..span.offset() + span.len()], "ref");
    }

    #[test]
    fn test_locate_without_line() {
        let diag = Diagnostic::error("Could not load file").in_file("scene.scn");

        assert!(locate("<Simulation/>", &diag).is_none());
    }

    #[test]
    fn test_multiple_diagnostics() {
        let err = parse_error(vec![
            Diagnostic::error("Duplicated name \"arm\"")
                .with_code(ErrorCode::E102)
                .in_file("scene.scn")
                .with_location(Location::new(4, 1)),
            Diagnostic::note("Defined here")
                .in_file("scene.scn")
                .with_location(Location::new(2, 1)),
        ]);

        let reportables = to_reportables(&err);

        // The files cannot be read, so the location stays in the message.
        assert_eq!(reportables.len(), 2);
        assert_eq!(reportables[0].to_string(), "scene.scn:4:1: Duplicated name \"arm\"");
        assert_eq!(reportables[1].severity(), Some(MietteSeverity::Advice));
        assert!(reportables[0].source_code().is_none());
    }

    #[test]
    fn test_diagnostic_with_source() {
        let diag = Diagnostic::error("Unexpected element \"Robot\"")
            .in_file("scene.scn")
            .with_location(Location::new(1, 13));

        let adapter = DiagnosticAdapter::new(&diag, Some("<Simulation><Robot/></Simulation>"));

        assert_eq!(adapter.to_string(), "Unexpected element \"Robot\"");
        let labels: Vec<_> = adapter.labels().unwrap().collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].offset(), 12);
        assert_eq!(labels[0].label(), Some("scene.scn:1:13"));
    }

    #[test]
    fn test_non_parse_error() {
        let err = SceneError::Config("bad schema".to_string());

        let reportables = to_reportables(&err);

        assert_eq!(reportables.len(), 1);
        match &reportables[0] {
            Reportable::Error(e) => {
                assert_eq!(e.to_string(), "Configuration error: bad schema");
            }
            Reportable::Diagnostic(_) => panic!("Expected Error"),
        }
    }
}
