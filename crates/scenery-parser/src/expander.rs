//! Expansion pass: instantiates the scene definition into entities.
//!
//! Expansion walks the recorded scene tree depth first. An element with a
//! `ref` attribute inherits attributes, text and children from the chain of
//! definitions it references; its own values always take precedence over
//! inherited ones and earlier chain members over later ones. Children are
//! checked against the class rules of their parent element type, and
//! entities of cacheable elements that did not depend on a variable are
//! shared between all uses.

use std::{borrow::Cow, rc::Rc};

use log::{debug, trace};

use scenery_core::{entity::EntityRef, location::Location};

use crate::{
    attribute::{Attribute, AttributeSet},
    context::{ContextStack, ExpansionFrame},
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    macros::{Macro, MacroElement, MacroTable, MacroText, ResolveGuard, macro_key},
    reader::ElementReader,
    registry::{ClassSet, ElementRegistry},
};

/// Attributes handled by the engine itself.
const NAME: &str = "name";
const REF: &str = "ref";

pub(crate) struct Expander<'e> {
    registry: &'e ElementRegistry,
    macros: &'e MacroTable,
    diagnostics: &'e mut DiagnosticCollector,
    contexts: ContextStack,
}

impl<'e> Expander<'e> {
    pub(crate) fn new(
        registry: &'e ElementRegistry,
        macros: &'e MacroTable,
        diagnostics: &'e mut DiagnosticCollector,
    ) -> Self {
        Self {
            registry,
            macros,
            diagnostics,
            contexts: ContextStack::new(),
        }
    }

    /// Expand the scene definition under the document root.
    ///
    /// Returns the scene entity, or `None` when no scene could be built.
    pub(crate) fn expand_scene(mut self, simulation_location: Location) -> Option<EntityRef> {
        let macros = self.macros;
        let simulation = Rc::clone(self.registry.simulation());
        self.contexts
            .push(ExpansionFrame::new(simulation, simulation_location));

        let scene = macros.scene().and_then(|scene| {
            debug!(name = scene.name(); "Expanding scene");
            let _guard = scene.begin();
            let previous = self.diagnostics.set_file(Rc::clone(scene.file()));
            let entity = self.expand_element(scene.root(), None);
            self.diagnostics.set_file(previous);
            entity
        });

        self.check_required_children();
        self.contexts.pop();
        scene
    }

    fn expand_element(
        &mut self,
        element: &'e MacroElement,
        parent: Option<&EntityRef>,
    ) -> Option<EntityRef> {
        let element_type = element.element_type();
        if !self.admit(element) {
            return None;
        }

        if let Some(cached) = element.cached() {
            trace!(element = element_type.name(); "Reusing cached entity");
            link(&cached, parent);
            return Some(cached);
        }

        self.contexts.push(ExpansionFrame::new(
            Rc::clone(element_type),
            element.location(),
        ));
        let entity = match element.attributes().get(REF) {
            None => self.instantiate(
                element,
                element.attributes(),
                element.text(),
                Vec::new(),
                parent,
            ),
            Some(reference) => self.expand_reference(element, reference, parent),
        };
        self.contexts.pop();
        entity
    }

    /// Check that `element` may appear under the current frame and record
    /// its class there.
    fn admit(&mut self, element: &MacroElement) -> bool {
        let class = element.element_type().class();
        let Some(frame) = self.contexts.current_mut() else {
            return false;
        };
        let parent_type = Rc::clone(frame.element_type());

        let mut allowed = parent_type.allowed_children().contains(class);
        if allowed && !parent_type.repeatable_children().contains(class) {
            if frame.shadowed.contains(class) {
                trace!(element = element.element_type().name(); "Skipping overridden inherited child");
                return false;
            }
            allowed = !frame.satisfied.contains(class);
        }

        if !allowed {
            self.diagnostics.error(
                ErrorCode::E101,
                element.location(),
                format!("Unexpected element \"{}\"", element.element_type().name()),
            );
            return false;
        }
        frame.satisfied.insert(class);
        true
    }

    /// Resolve the reference chain of `element` and instantiate it with the
    /// merged attributes.
    fn expand_reference(
        &mut self,
        element: &'e MacroElement,
        reference: &'e Attribute,
        parent: Option<&EntityRef>,
    ) -> Option<EntityRef> {
        let macros = self.macros;
        let type_name = element.element_type().name();
        let reference_only =
            element.attributes().len() == 1 && element.text().is_none() && element.children().is_empty();

        let mut merged = element.attributes().clone();
        let mut text = element.text();
        let mut chain: Vec<ResolveGuard<'e>> = Vec::new();
        let mut current: (&'e Attribute, Option<Rc<str>>) = (reference, None);

        loop {
            let (attribute, file) = current;
            let name = self.substitute_in(attribute, file.clone())?;
            let Some(target) = macros.get(&macro_key(&name, type_name)) else {
                self.report_in(
                    file,
                    Diagnostic::error(format!("Unresolvable reference \"{name}\""))
                        .with_code(ErrorCode::E200)
                        .with_location(attribute.location()),
                );
                return None;
            };
            if target.is_in_progress() {
                self.report_in(
                    file,
                    Diagnostic::error(format!("Looping reference \"{name}\""))
                        .with_code(ErrorCode::E201)
                        .with_location(attribute.location()),
                );
                return None;
            }

            if chain.is_empty()
                && reference_only
                && let Some(cached) = target.root().cached()
            {
                trace!(reference = &*name; "Reusing cached definition");
                link(&cached, parent);
                if element.element_type().is_cacheable() && !self.uses_placeholder() {
                    element.set_cached(Rc::clone(&cached));
                }
                return Some(cached);
            }

            let guard = target.begin();
            for (attribute_name, inherited) in target.root().attributes().iter() {
                if let Err(err) =
                    merged.insert_if_absent(attribute_name, inherited, target.file())
                {
                    self.diagnostics
                        .error(ErrorCode::E106, element.location(), err.to_string());
                    return None;
                }
            }
            if text.is_none() {
                text = target.root().text();
            }
            chain.push(guard);

            match target.root().attributes().get(REF) {
                Some(next) => current = (next, Some(Rc::clone(target.file()))),
                None => break,
            }
        }

        let referenced = chain.first().map(ResolveGuard::owner);
        let entity = self.instantiate(element, &merged, text, chain, parent)?;

        if reference_only
            && element.element_type().is_cacheable()
            && !self.uses_placeholder()
            && let Some(referenced) = referenced
        {
            referenced.root().set_cached(Rc::clone(&entity));
        }
        Some(entity)
    }

    /// Build the entity of `element` from `attributes`, then expand its own
    /// children followed by the children of every definition in `chain`.
    fn instantiate(
        &mut self,
        element: &'e MacroElement,
        attributes: &AttributeSet,
        text: Option<&'e MacroText>,
        chain: Vec<ResolveGuard<'e>>,
        parent: Option<&EntityRef>,
    ) -> Option<EntityRef> {
        let element_type = Rc::clone(element.element_type());
        trace!(element = element_type.name(); "Instantiating element");

        let (entity, consumed) = {
            let mut reader = ElementReader::new(
                &element_type,
                attributes,
                element.location(),
                parent,
                &mut self.contexts,
                self.diagnostics,
            );
            let entity = element_type.create(&mut reader);
            (entity, reader.consumed())
        };
        self.check_consumed(attributes, consumed);

        if let Some(text) = text
            && let Err(message) = element_type.handle_text(entity.as_ref(), &text.content)
        {
            self.diagnostics
                .error(ErrorCode::E204, text.location, message);
        }

        for child in element.children() {
            self.expand_element(child, entity.as_ref());
        }
        for guard in chain {
            self.expand_inherited_children(guard.owner(), entity.as_ref());
        }
        if let Some(frame) = self.contexts.current_mut() {
            frame.shadowed = ClassSet::EMPTY;
        }

        self.check_required_children();

        let entity = entity?;
        link(&entity, parent);
        if element_type.is_cacheable() && !self.uses_placeholder() {
            element.set_cached(Rc::clone(&entity));
        }
        Some(entity)
    }

    fn expand_inherited_children(&mut self, definition: &'e Macro, entity: Option<&EntityRef>) {
        if let Some(frame) = self.contexts.current_mut() {
            frame.shadowed = frame.satisfied;
        }
        let previous = self.diagnostics.set_file(Rc::clone(definition.file()));
        for child in definition.root().children() {
            self.expand_element(child, entity);
        }
        self.diagnostics.set_file(previous);
    }

    fn check_consumed(&mut self, attributes: &AttributeSet, consumed: u32) {
        let mut infrastructure = 0;
        for name in [NAME, REF] {
            if let Some(attribute) = attributes.get(name) {
                infrastructure |= attribute.mask();
            }
        }
        for (name, attribute) in attributes.unconsumed(consumed | infrastructure) {
            self.diagnostics.error_at(
                ErrorCode::E202,
                attribute,
                format!("Unexpected attribute \"{name}\""),
            );
        }
    }

    fn check_required_children(&mut self) {
        let Some(frame) = self.contexts.current() else {
            return;
        };
        let missing = frame
            .element_type()
            .required_children()
            .difference(frame.satisfied);
        let location = frame.location();

        for class in missing.iter() {
            let names = self.registry.type_names(class);
            let message = match names.as_slice() {
                [] => continue,
                [name] => format!("Expected element \"{name}\" as child"),
                names => format!(
                    "Expected one of the elements {} as child",
                    names
                        .iter()
                        .map(|name| format!("\"{name}\""))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            };
            self.diagnostics.error(ErrorCode::E203, location, message);
        }
    }

    fn uses_placeholder(&self) -> bool {
        self.contexts
            .current()
            .is_some_and(ExpansionFrame::used_placeholder)
    }

    /// Substitute placeholders in a reference, reporting a malformed value in
    /// `file` (the current file when `None`).
    fn substitute_in(&mut self, attribute: &'e Attribute, file: Option<Rc<str>>) -> Option<Cow<'e, str>> {
        match self.contexts.substitute(attribute.value()) {
            Ok(value) => Some(value),
            Err(err) => {
                self.report_in(
                    file,
                    Diagnostic::error(err.to_string())
                        .with_code(ErrorCode::E301)
                        .with_location(attribute.location()),
                );
                None
            }
        }
    }

    fn report_in(&mut self, file: Option<Rc<str>>, diagnostic: Diagnostic) {
        match file {
            Some(file) => self.diagnostics.emit(diagnostic.in_file(&*file)),
            None => self.diagnostics.emit(diagnostic),
        }
    }
}

fn link(entity: &EntityRef, parent: Option<&EntityRef>) {
    if let Some(parent) = parent {
        entity.add_parent(parent);
    }
}
