//! Recorded element trees and the table of top-level definitions.
//!
//! Every named top-level element of a scene file is recorded as a [`Macro`]:
//! a tree of [`MacroElement`]s that can be expanded any number of times.
//! Definitions are keyed by name and element type, so a `Body` and an
//! `Appearance` may share a name.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use indexmap::IndexMap;

use scenery_core::{entity::EntityRef, location::Location};

use crate::{attribute::AttributeSet, registry::ElementType};

/// Text content of a recorded element.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroText {
    pub content: String,
    pub location: Location,
}

/// One recorded element with its raw attributes and children.
#[derive(Debug)]
pub struct MacroElement {
    element_type: Rc<ElementType>,
    attributes: AttributeSet,
    location: Location,
    text: Option<MacroText>,
    children: Vec<MacroElement>,
    cached: RefCell<Option<EntityRef>>,
}

impl MacroElement {
    pub(crate) fn new(
        element_type: Rc<ElementType>,
        attributes: AttributeSet,
        location: Location,
    ) -> Self {
        Self {
            element_type,
            attributes,
            location,
            text: None,
            children: Vec::new(),
            cached: RefCell::new(None),
        }
    }

    pub fn element_type(&self) -> &Rc<ElementType> {
        &self.element_type
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn text(&self) -> Option<&MacroText> {
        self.text.as_ref()
    }

    pub fn children(&self) -> &[MacroElement] {
        &self.children
    }

    /// The entity built for this element by an earlier expansion, if it
    /// could be shared.
    pub fn cached(&self) -> Option<EntityRef> {
        self.cached.borrow().clone()
    }

    pub(crate) fn set_cached(&self, entity: EntityRef) {
        *self.cached.borrow_mut() = Some(entity);
    }

    /// Append text content. Separate text runs are joined with a space.
    pub(crate) fn append_text(&mut self, content: &str, location: Location) {
        match &mut self.text {
            Some(text) => {
                text.content.push(' ');
                text.content.push_str(content);
            }
            None => {
                self.text = Some(MacroText {
                    content: content.to_string(),
                    location,
                });
            }
        }
    }

    pub(crate) fn push_child(&mut self, child: MacroElement) {
        self.children.push(child);
    }
}

/// Expansion state of a definition, used to detect reference loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    Idle,
    InProgress,
    Done,
}

/// A named top-level definition.
#[derive(Debug)]
pub struct Macro {
    name: String,
    root: MacroElement,
    file: Rc<str>,
    state: Cell<ResolveState>,
}

impl Macro {
    pub(crate) fn new(name: impl Into<String>, root: MacroElement, file: Rc<str>) -> Self {
        Self {
            name: name.into(),
            root,
            file,
            state: Cell::new(ResolveState::Idle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> String {
        macro_key(&self.name, self.root.element_type.name())
    }

    pub fn root(&self) -> &MacroElement {
        &self.root
    }

    /// The file this definition was recorded from.
    pub fn file(&self) -> &Rc<str> {
        &self.file
    }

    pub fn state(&self) -> ResolveState {
        self.state.get()
    }

    pub fn is_in_progress(&self) -> bool {
        self.state.get() == ResolveState::InProgress
    }

    /// Mark the definition as being expanded until the guard is dropped.
    pub(crate) fn begin(&self) -> ResolveGuard<'_> {
        self.state.set(ResolveState::InProgress);
        ResolveGuard { owner: self }
    }
}

/// Clears the in-progress mark of a [`Macro`] on every exit path.
#[derive(Debug)]
pub(crate) struct ResolveGuard<'m> {
    owner: &'m Macro,
}

impl<'m> ResolveGuard<'m> {
    pub(crate) fn owner(&self) -> &'m Macro {
        self.owner
    }
}

impl Drop for ResolveGuard<'_> {
    fn drop(&mut self) {
        self.owner.state.set(ResolveState::Done);
    }
}

/// Key of a definition: its name and its element type name.
pub fn macro_key(name: &str, type_name: &str) -> String {
    format!("{name} {type_name}")
}

/// All definitions of one load session in recording order.
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: IndexMap<String, Macro>,
    scene: Option<String>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Macro> {
        self.macros.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.macros.contains_key(key)
    }

    /// Add a definition. Returns the rejected definition when the key is
    /// already taken.
    pub(crate) fn insert(&mut self, definition: Macro) -> Result<(), Box<Macro>> {
        let key = definition.key();
        if self.macros.contains_key(&key) {
            return Err(Box::new(definition));
        }
        self.macros.insert(key, definition);
        Ok(())
    }

    /// Add the scene definition.
    pub(crate) fn insert_scene(&mut self, definition: Macro) -> Result<(), Box<Macro>> {
        let key = definition.key();
        self.insert(definition)?;
        self.scene = Some(key);
        Ok(())
    }

    /// The single scene definition, if one was recorded.
    pub fn scene(&self) -> Option<&Macro> {
        self.scene.as_deref().and_then(|key| self.macros.get(key))
    }

    pub fn has_scene(&self) -> bool {
        self.scene.is_some()
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Macro> {
        self.macros.values()
    }
}
