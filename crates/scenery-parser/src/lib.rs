//! # Scenery Parser
//!
//! Loader for Scenery scene descriptions. A scene file is an XML-like markup
//! document whose root `Simulation` element holds named definitions and
//! exactly one scene element. Definitions are recorded first and expanded
//! afterwards, so an element can reference (`ref="…"`) a definition that
//! appears later in the file or in an included file.
//!
//! The pipeline has two passes:
//!
//! 1. **Record** - Read every file into a table of named definitions,
//!    following `Include` elements
//! 2. **Expand** - Instantiate the scene definition depth first, merging
//!    referenced definitions, substituting `$(variables)`, validating child
//!    elements and calling the factory of every element type
//!
//! Problems never stop a load. They are collected as [`Diagnostic`]s and the
//! load reports failure when at least one of them is an error.
//!
//! ## Usage
//!
//! ```
//! # use scenery_parser::{ElementClass, ElementRegistry, ElementType, InMemorySources, Parser};
//! let mut registry = ElementRegistry::new();
//! let scene = ElementClass::new(1).expect("valid class");
//! registry.register_scene(ElementType::new("Scene", scene));
//!
//! let sources = InMemorySources::new()
//!     .with_file("robot.scn", r#"<Simulation><Scene name="main"/></Simulation>"#);
//! let report = Parser::new(&registry).with_sources(sources).load("robot.scn");
//! assert!(report.is_success());
//! ```

pub mod attribute;
mod context;
pub mod error;
mod expander;
pub mod macros;
pub mod markup;
pub mod placeholder;
pub mod reader;
mod recorder;
pub mod registry;
pub mod source;
pub mod value;


pub use attribute::{Attribute, AttributeSet, MAX_ATTRIBUTES};
pub use error::{Diagnostic, ErrorCode, ParseError, Severity};
pub use reader::{Bounds, ElementReader};
pub use registry::{ElementClass, ElementRegistry, ElementType};
pub use source::{FileSystem, InMemorySources, SourceProvider};

use std::path::Path;

use log::{debug, info};

use scenery_core::entity::EntityRef;

use error::DiagnosticCollector;
use expander::Expander;
use macros::MacroTable;
use recorder::Recorder;

/// How deeply `Include` elements may nest by default.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 16;

/// Outcome of loading a scene.
#[derive(Debug)]
pub struct LoadReport {
    scene: Option<EntityRef>,
    diagnostics: Vec<Diagnostic>,
    success: bool,
}

impl LoadReport {
    /// `true` when no error was reported. Warnings and notes are allowed.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The scene entity, if one was built.
    pub fn scene(&self) -> Option<&EntityRef> {
        self.scene.as_ref()
    }

    /// Every diagnostic in the order it was reported.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Every diagnostic formatted as `file:line:column: severity: message`.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }

    /// The scene on success, or all diagnostics wrapped in a [`ParseError`].
    pub fn into_result(self) -> Result<Option<EntityRef>, ParseError> {
        if self.success {
            Ok(self.scene)
        } else {
            Err(ParseError::new(self.diagnostics))
        }
    }
}

/// Loads scene files against an [`ElementRegistry`].
///
/// Each call to [`Parser::load`] is an independent session: definitions,
/// cached entities and diagnostics never leak from one load into the next.
pub struct Parser<'r> {
    registry: &'r ElementRegistry,
    sources: Box<dyn SourceProvider + 'r>,
    max_include_depth: usize,
}

impl<'r> Parser<'r> {
    /// Create a parser reading files from disk.
    pub fn new(registry: &'r ElementRegistry) -> Self {
        Self {
            registry,
            sources: Box::new(FileSystem),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Read files from `sources` instead of the file system.
    pub fn with_sources(mut self, sources: impl SourceProvider + 'r) -> Self {
        self.sources = Box::new(sources);
        self
    }

    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Load the scene rooted at `path`.
    ///
    /// File names in diagnostics are relative to the directory of `path`.
    pub fn load(&self, path: impl AsRef<Path>) -> LoadReport {
        self.run(path.as_ref()).0
    }

    fn run(&self, path: &Path) -> (LoadReport, MacroTable) {
        info!(path = path.display().to_string(); "Loading scene");

        let root_dir = source::normalize(path.parent().unwrap_or(Path::new("")));
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
        let mut diagnostics = DiagnosticCollector::new(file_name);

        let mut recorder = Recorder::new(
            self.registry,
            self.sources.as_ref(),
            &mut diagnostics,
            root_dir,
            self.max_include_depth,
        );
        let recorded = recorder.record_root(path);
        let (macros, simulation_location) = recorder.finish();

        let scene = match recorded {
            Ok(()) => Expander::new(self.registry, &macros, &mut diagnostics)
                .expand_scene(simulation_location),
            Err(failure) => {
                debug!(reason = failure.to_string(); "Root file could not be recorded");
                if diagnostics.is_empty() {
                    diagnostics.emit(
                        Diagnostic::error("Could not load file")
                            .with_code(ErrorCode::E100)
                            .with_help(failure.to_string()),
                    );
                }
                None
            }
        };

        let success = !diagnostics.has_errors();
        info!(success, diagnostics = diagnostics.error_count(); "Scene loaded");
        let report = LoadReport {
            scene,
            diagnostics: diagnostics.into_diagnostics(),
            success,
        };
        (report, macros)
    }
}
