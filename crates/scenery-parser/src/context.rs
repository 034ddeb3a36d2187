//! The stack of expansion frames, one per element under construction.

use std::{borrow::Cow, collections::HashMap, rc::Rc};

use scenery_core::location::Location;

use crate::{
    placeholder::{UnterminatedPlaceholder, VariableLookup, replace_placeholders},
    registry::{ClassSet, ElementType},
};

/// State of one element while it is being expanded.
#[derive(Debug)]
pub(crate) struct ExpansionFrame {
    element_type: Rc<ElementType>,
    location: Location,
    /// Child classes already instantiated under this element.
    pub(crate) satisfied: ClassSet,
    /// Non-repeatable child classes a higher-priority source already
    /// provided. Inherited children of these classes are skipped.
    pub(crate) shadowed: ClassSet,
    variables: HashMap<String, String>,
    used_placeholder: bool,
}

impl ExpansionFrame {
    pub(crate) fn new(element_type: Rc<ElementType>, location: Location) -> Self {
        Self {
            element_type,
            location,
            satisfied: ClassSet::EMPTY,
            shadowed: ClassSet::EMPTY,
            variables: HashMap::new(),
            used_placeholder: false,
        }
    }

    pub(crate) fn element_type(&self) -> &Rc<ElementType> {
        &self.element_type
    }

    pub(crate) fn location(&self) -> Location {
        self.location
    }

    pub(crate) fn used_placeholder(&self) -> bool {
        self.used_placeholder
    }
}

/// Innermost frame last. Variable lookup walks from the innermost frame
/// outwards.
#[derive(Debug, Default)]
pub(crate) struct ContextStack {
    frames: Vec<ExpansionFrame>,
}

impl ContextStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, frame: ExpansionFrame) {
        self.frames.push(frame);
    }

    /// Pop the innermost frame. A placeholder used anywhere inside the
    /// frame marks its parent as well.
    pub(crate) fn pop(&mut self) -> Option<ExpansionFrame> {
        let frame = self.frames.pop()?;
        if frame.used_placeholder
            && let Some(parent) = self.frames.last_mut()
        {
            parent.used_placeholder = true;
        }
        Some(frame)
    }

    pub(crate) fn current(&self) -> Option<&ExpansionFrame> {
        self.frames.last()
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut ExpansionFrame> {
        self.frames.last_mut()
    }

    /// Define a variable in the scope enclosing the current element, so it
    /// is visible to the current element's siblings and their subtrees.
    pub(crate) fn define_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let len = self.frames.len();
        let target = if len >= 2 { len - 2 } else { 0 };
        if let Some(frame) = self.frames.get_mut(target) {
            frame.variables.insert(name.into(), value.into());
        }
    }

    /// Substitute placeholders in `text`, marking the current frame when
    /// any placeholder resolved.
    pub(crate) fn substitute<'t>(
        &mut self,
        text: &'t str,
    ) -> Result<Cow<'t, str>, UnterminatedPlaceholder> {
        let substitution = replace_placeholders(text, &*self)?;
        if substitution.substituted()
            && let Some(frame) = self.frames.last_mut()
        {
            frame.used_placeholder = true;
        }
        Ok(substitution.into_text())
    }
}

impl VariableLookup for ContextStack {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.variables.get(name))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ElementClass;

    fn frame(name: &str) -> ExpansionFrame {
        ExpansionFrame::new(
            Rc::new(ElementType::new(name, ElementClass::INFRASTRUCTURE)),
            Location::unknown(),
        )
    }

    #[test]
    fn test_variable_defined_in_parent_scope() {
        let mut stack = ContextStack::new();
        stack.push(frame("Scene"));
        stack.push(frame("Set"));
        stack.define_variable("r", "5cm");
        stack.pop();

        assert_eq!(stack.lookup("r"), Some("5cm"));
        stack.pop();
        assert_eq!(stack.lookup("r"), None);
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut stack = ContextStack::new();
        stack.push(frame("Scene"));
        stack.push(frame("Set"));
        stack.define_variable("r", "outer");
        stack.pop();
        stack.push(frame("Body"));
        stack.push(frame("Set"));
        stack.define_variable("r", "inner");
        stack.pop();

        assert_eq!(stack.lookup("r"), Some("inner"));
        stack.pop();
        assert_eq!(stack.lookup("r"), Some("outer"));
    }

    #[test]
    fn test_placeholder_use_propagates_to_parent() {
        let mut stack = ContextStack::new();
        stack.push(frame("Scene"));
        stack.push(frame("Set"));
        stack.define_variable("r", "5cm");
        stack.pop();
        stack.push(frame("Body"));
        stack.push(frame("Sphere"));

        assert_eq!(stack.substitute("$r").unwrap(), "5cm");
        assert!(stack.current().unwrap().used_placeholder());

        stack.pop();
        assert!(stack.current().unwrap().used_placeholder());
    }

    #[test]
    fn test_unresolved_placeholder_does_not_mark() {
        let mut stack = ContextStack::new();
        stack.push(frame("Scene"));

        assert_eq!(stack.substitute("$missing").unwrap(), "$missing");
        assert!(!stack.current().unwrap().used_placeholder());
    }
}
