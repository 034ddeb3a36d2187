//! Recording pass: reads scene files into the macro table.
//!
//! Every named element directly inside a file's `Simulation` root becomes a
//! definition. `Include` elements in the same position splice the top-level
//! definitions of another file into the table. Nothing is instantiated here;
//! attribute values are kept raw except for path attributes, which are
//! rewritten relative to the directory of the root file.

use std::{
    io, mem,
    path::{Path, PathBuf},
    rc::Rc,
};

use log::{debug, trace};
use thiserror::Error;

use scenery_core::location::Location;

use crate::{
    attribute::{AttributeSet, MAX_ATTRIBUTES},
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    macros::{Macro, MacroElement, MacroTable, macro_key},
    markup::{Event, MarkupAttribute, MarkupReader, StartTag},
    registry::{ElementRegistry, ElementType, INCLUDE, SIMULATION},
    source::{SourceProvider, normalize},
};

/// Why a file produced nothing at all.
#[derive(Debug, Error)]
pub(crate) enum RecordFailure {
    #[error("{0}")]
    Unreadable(#[from] io::Error),

    #[error("the file contains no markup")]
    Empty,
}

pub(crate) struct Recorder<'r> {
    registry: &'r ElementRegistry,
    sources: &'r dyn SourceProvider,
    diagnostics: &'r mut DiagnosticCollector,
    macros: MacroTable,
    root_dir: PathBuf,
    current_dir: PathBuf,
    seen_simulation: bool,
    include_stack: Vec<PathBuf>,
    max_include_depth: usize,
    simulation_location: Location,
}

impl<'r> Recorder<'r> {
    pub(crate) fn new(
        registry: &'r ElementRegistry,
        sources: &'r dyn SourceProvider,
        diagnostics: &'r mut DiagnosticCollector,
        root_dir: PathBuf,
        max_include_depth: usize,
    ) -> Self {
        Self {
            registry,
            sources,
            diagnostics,
            macros: MacroTable::new(),
            current_dir: root_dir.clone(),
            root_dir,
            seen_simulation: false,
            include_stack: Vec::new(),
            max_include_depth,
            simulation_location: Location::unknown(),
        }
    }

    /// Record the root file.
    pub(crate) fn record_root(&mut self, path: &Path) -> Result<(), RecordFailure> {
        let path = normalize(path);
        self.include_stack.push(path.clone());
        let result = self.record_file(&path);
        self.include_stack.pop();
        debug!(definitions = self.macros.len(); "Recording finished");
        result
    }

    /// The recorded definitions and the location of the root `Simulation`.
    pub(crate) fn finish(self) -> (MacroTable, Location) {
        (self.macros, self.simulation_location)
    }

    fn record_file(&mut self, path: &Path) -> Result<(), RecordFailure> {
        let source = self.sources.read(path)?;
        trace!(path = path.display().to_string(); "Recording file");

        let mut reader = MarkupReader::new(&source);
        let mut produced = false;
        loop {
            match reader.next_event(self.diagnostics) {
                Event::Start(tag) => {
                    produced = true;
                    self.record_document_element(&mut reader, tag);
                }
                Event::Text { location, .. } => {
                    produced = true;
                    self.unexpected_text(location);
                }
                Event::End { .. } => {}
                Event::Eof => break,
            }
        }

        if produced {
            Ok(())
        } else {
            Err(RecordFailure::Empty)
        }
    }

    fn record_document_element(&mut self, reader: &mut MarkupReader<'_>, tag: StartTag) {
        if tag.name != SIMULATION || self.seen_simulation || !self.check_attribute_count(&tag) {
            self.unexpected_element(&tag);
            reader.skip_element(self.diagnostics);
            return;
        }

        self.seen_simulation = true;
        if self.include_stack.len() == 1 {
            self.simulation_location = tag.location;
        }
        for attribute in &tag.attributes {
            self.unexpected_attribute(attribute);
        }

        loop {
            match reader.next_event(self.diagnostics) {
                Event::Start(child) => self.record_top_level(reader, child),
                Event::Text { location, .. } => self.unexpected_text(location),
                Event::End { .. } | Event::Eof => return,
            }
        }
    }

    fn record_top_level(&mut self, reader: &mut MarkupReader<'_>, tag: StartTag) {
        if !self.check_attribute_count(&tag) {
            reader.skip_element(self.diagnostics);
            return;
        }
        if tag.name == INCLUDE {
            self.record_include(reader, tag);
            return;
        }
        let Some(element_type) = self.lookup(&tag.name) else {
            self.unexpected_element(&tag);
            reader.skip_element(self.diagnostics);
            return;
        };

        let attributes = self.collect_attributes(&element_type, &tag.attributes);
        let Some(name) = attributes.get("name").map(|attr| attr.value().to_string()) else {
            self.diagnostics.error(
                ErrorCode::E300,
                tag.location,
                "Expected attribute \"name\"",
            );
            reader.skip_element(self.diagnostics);
            return;
        };

        let key = macro_key(&name, element_type.name());
        if let Some(existing) = self.macros.get(&key) {
            let note = Diagnostic::note("Defined here")
                .in_file(&**existing.file())
                .with_location(existing.root().location());
            self.diagnostics.emit(
                Diagnostic::error(format!("Duplicated name \"{name}\""))
                    .with_code(ErrorCode::E102)
                    .with_location(tag.location),
            );
            self.diagnostics.emit(note);
            reader.skip_element(self.diagnostics);
            return;
        }

        let is_scene = self.registry.is_scene(&element_type);
        if is_scene && self.macros.has_scene() {
            self.unexpected_element(&tag);
            reader.skip_element(self.diagnostics);
            return;
        }

        trace!(name = name.as_str(), element = tag.name.as_str(); "Recording definition");
        let root = self.record_body(reader, element_type, attributes, tag.location);
        let definition = Macro::new(name, root, self.diagnostics.file().clone());
        let inserted = if is_scene {
            self.macros.insert_scene(definition)
        } else {
            self.macros.insert(definition)
        };
        if let Err(rejected) = inserted {
            debug!(key = rejected.key(); "Definition rejected");
        }
    }

    fn record_body(
        &mut self,
        reader: &mut MarkupReader<'_>,
        element_type: Rc<ElementType>,
        attributes: AttributeSet,
        location: Location,
    ) -> MacroElement {
        let allows_text = element_type.allows_text();
        let mut element = MacroElement::new(element_type, attributes, location);
        loop {
            match reader.next_event(self.diagnostics) {
                Event::Start(child) => {
                    if let Some(child) = self.record_nested(reader, child) {
                        element.push_child(child);
                    }
                }
                Event::Text { content, location } => {
                    if allows_text {
                        element.append_text(&content, location);
                    } else {
                        self.unexpected_text(location);
                    }
                }
                Event::End { .. } | Event::Eof => return element,
            }
        }
    }

    fn record_nested(&mut self, reader: &mut MarkupReader<'_>, tag: StartTag) -> Option<MacroElement> {
        if !self.check_attribute_count(&tag) {
            reader.skip_element(self.diagnostics);
            return None;
        }
        let Some(element_type) = self.lookup(&tag.name) else {
            self.unexpected_element(&tag);
            reader.skip_element(self.diagnostics);
            return None;
        };
        let attributes = self.collect_attributes(&element_type, &tag.attributes);
        Some(self.record_body(reader, element_type, attributes, tag.location))
    }

    fn record_include(&mut self, reader: &mut MarkupReader<'_>, tag: StartTag) {
        let mut href = None;
        for attribute in &tag.attributes {
            if attribute.name == "href" {
                href = Some(attribute);
            } else {
                self.unexpected_attribute(attribute);
            }
        }

        loop {
            match reader.next_event(self.diagnostics) {
                Event::Start(child) => {
                    self.unexpected_element(&child);
                    reader.skip_element(self.diagnostics);
                }
                Event::Text { location, .. } => self.unexpected_text(location),
                Event::End { .. } | Event::Eof => break,
            }
        }

        match href {
            Some(href) => self.include(&href.value, href.location),
            None => self.diagnostics.error(
                ErrorCode::E300,
                tag.location,
                "Expected attribute \"href\"",
            ),
        }
    }

    fn include(&mut self, href: &str, location: Location) {
        let path = if is_absolute_path(href) {
            normalize(Path::new(href))
        } else {
            normalize(&self.current_dir.join(href))
        };

        if self.include_stack.contains(&path) {
            self.diagnostics.error(
                ErrorCode::E104,
                location,
                format!("Recursive inclusion of \"{href}\""),
            );
            return;
        }
        if self.include_stack.len() > self.max_include_depth {
            self.diagnostics.emit(
                Diagnostic::error("Include depth limit exceeded")
                    .with_code(ErrorCode::E105)
                    .with_location(location)
                    .with_help(format!(
                        "includes may be nested at most {} levels deep",
                        self.max_include_depth
                    )),
            );
            return;
        }

        debug!(href = href; "Including file");
        let file: Rc<str> = Rc::from(self.display_name(&path));
        let saved_dir = mem::replace(
            &mut self.current_dir,
            path.parent().map(Path::to_path_buf).unwrap_or_default(),
        );
        let saved_seen = mem::replace(&mut self.seen_simulation, false);
        let saved_file = self.diagnostics.set_file(file);
        let errors_before = self.diagnostics.error_count();
        self.include_stack.push(path.clone());

        let result = self.record_file(&path);

        self.include_stack.pop();
        self.diagnostics.set_file(saved_file);
        self.seen_simulation = saved_seen;
        self.current_dir = saved_dir;

        if let Err(failure) = result
            && self.diagnostics.error_count() == errors_before
        {
            self.diagnostics.emit(
                Diagnostic::error(format!("Could not load file \"{href}\""))
                    .with_code(ErrorCode::E100)
                    .with_location(location)
                    .with_help(failure.to_string()),
            );
        }
    }

    fn lookup(&self, name: &str) -> Option<Rc<ElementType>> {
        if name == SIMULATION || name == INCLUDE {
            return None;
        }
        self.registry.get(name).cloned()
    }

    fn collect_attributes(
        &self,
        element_type: &ElementType,
        attributes: &[MarkupAttribute],
    ) -> AttributeSet {
        let mut set = AttributeSet::new();
        for attribute in attributes {
            let value = if element_type.is_path_attribute(&attribute.name) {
                self.rewrite_path(&attribute.value)
            } else {
                attribute.value.clone()
            };
            if set
                .insert(attribute.name.as_str(), value, attribute.location)
                .is_err()
            {
                break;
            }
        }
        set
    }

    /// Express a path relative to the current file as a path relative to
    /// the directory of the root file.
    fn rewrite_path(&self, value: &str) -> String {
        if is_absolute_path(value) {
            return value.to_string();
        }
        let full = normalize(&self.current_dir.join(value));
        match full.strip_prefix(&self.root_dir) {
            Ok(relative) => relative.display().to_string(),
            Err(_) => full.display().to_string(),
        }
    }

    fn display_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.root_dir)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    fn check_attribute_count(&mut self, tag: &StartTag) -> bool {
        if tag.attributes.len() <= MAX_ATTRIBUTES {
            return true;
        }
        self.diagnostics.error(
            ErrorCode::E106,
            tag.location,
            format!("Only up to {MAX_ATTRIBUTES} attributes are supported"),
        );
        false
    }

    fn unexpected_element(&mut self, tag: &StartTag) {
        self.diagnostics.error(
            ErrorCode::E101,
            tag.location,
            format!("Unexpected element \"{}\"", tag.name),
        );
    }

    fn unexpected_attribute(&mut self, attribute: &MarkupAttribute) {
        self.diagnostics.error(
            ErrorCode::E202,
            attribute.location,
            format!("Unexpected attribute \"{}\"", attribute.name),
        );
    }

    fn unexpected_text(&mut self, location: Location) {
        self.diagnostics
            .error(ErrorCode::E103, location, "Unexpected text");
    }
}

/// Whether `path` is absolute on any platform: a leading `/` or `\`, or a
/// drive letter.
fn is_absolute_path(path: &str) -> bool {
    matches!(path.as_bytes(), [b'/' | b'\\', ..])
        || matches!(path.as_bytes(), [drive, b':', ..] if drive.is_ascii_alphabetic())
}
