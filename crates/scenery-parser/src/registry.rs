//! Element types and the registry the engine looks them up in.
//!
//! An [`ElementType`] describes one kind of scene element: its class, which
//! classes of children it accepts and how often, whether it takes text, and
//! the factory that turns a fully merged attribute set into an entity.

use std::{collections::HashMap, fmt, rc::Rc};

use scenery_core::entity::EntityRef;

use crate::reader::ElementReader;

/// Name of the document root element.
pub const SIMULATION: &str = "Simulation";

/// Name of the element that splices another file into the current one.
pub const INCLUDE: &str = "Include";

/// Builds an entity from an element. `None` means the element produced no
/// entity, either by design or because its attributes were invalid.
pub type Factory = Rc<dyn Fn(&mut ElementReader<'_>) -> Option<EntityRef>>;

/// Receives the text content of an element together with its entity.
pub type TextHandler = Rc<dyn Fn(Option<&EntityRef>, &str) -> Result<(), String>>;

/// One of at most 32 element classes.
///
/// Bit 0 is reserved for the infrastructure elements (`Simulation`,
/// `Include`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementClass(u8);

impl ElementClass {
    pub const INFRASTRUCTURE: ElementClass = ElementClass(0);

    /// The highest usable class bit.
    pub const MAX_BIT: u8 = 31;

    /// Create a class from its bit number. Returns `None` for bits above
    /// [`Self::MAX_BIT`].
    pub fn new(bit: u8) -> Option<Self> {
        (bit <= Self::MAX_BIT).then_some(Self(bit))
    }

    pub fn bit(self) -> u8 {
        self.0
    }

    fn mask(self) -> u32 {
        1 << self.0
    }
}

/// A set of element classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassSet(u32);

impl ClassSet {
    pub const EMPTY: ClassSet = ClassSet(0);

    pub fn contains(self, class: ElementClass) -> bool {
        self.0 & class.mask() != 0
    }

    pub fn insert(&mut self, class: ElementClass) {
        self.0 |= class.mask();
    }

    pub fn union(self, other: ClassSet) -> ClassSet {
        ClassSet(self.0 | other.0)
    }

    pub fn difference(self, other: ClassSet) -> ClassSet {
        ClassSet(self.0 & !other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Classes in ascending bit order.
    pub fn iter(self) -> impl Iterator<Item = ElementClass> {
        (0..=ElementClass::MAX_BIT)
            .map(ElementClass)
            .filter(move |class| self.contains(*class))
    }
}

impl FromIterator<ElementClass> for ClassSet {
    fn from_iter<T: IntoIterator<Item = ElementClass>>(iter: T) -> Self {
        let mut set = ClassSet::EMPTY;
        for class in iter {
            set.insert(class);
        }
        set
    }
}

/// Descriptor of one element type.
#[derive(Clone)]
pub struct ElementType {
    name: String,
    class: ElementClass,
    factory: Option<Factory>,
    text_handler: Option<TextHandler>,
    cacheable: bool,
    required: ClassSet,
    optional: ClassSet,
    repeatable: ClassSet,
    path_attributes: Vec<String>,
}

impl ElementType {
    pub fn new(name: impl Into<String>, class: ElementClass) -> Self {
        Self {
            name: name.into(),
            class,
            factory: None,
            text_handler: None,
            cacheable: false,
            required: ClassSet::EMPTY,
            optional: ClassSet::EMPTY,
            repeatable: ClassSet::EMPTY,
            path_attributes: Vec::new(),
        }
    }

    pub fn with_factory(
        mut self,
        factory: impl Fn(&mut ElementReader<'_>) -> Option<EntityRef> + 'static,
    ) -> Self {
        self.factory = Some(Rc::new(factory));
        self
    }

    /// Accept text content and hand it to `handler`.
    pub fn with_text_handler(
        mut self,
        handler: impl Fn(Option<&EntityRef>, &str) -> Result<(), String> + 'static,
    ) -> Self {
        self.text_handler = Some(Rc::new(handler));
        self
    }

    /// Share one entity among all uses of an element that contains no
    /// resolved placeholders.
    pub fn with_caching(mut self) -> Self {
        self.cacheable = true;
        self
    }

    /// Children of these classes must appear exactly once.
    pub fn with_required_children(mut self, classes: impl IntoIterator<Item = ElementClass>) -> Self {
        self.required = self.required.union(classes.into_iter().collect());
        self
    }

    /// Children of these classes may appear at most once.
    pub fn with_optional_children(mut self, classes: impl IntoIterator<Item = ElementClass>) -> Self {
        self.optional = self.optional.union(classes.into_iter().collect());
        self
    }

    /// Children of these classes may appear any number of times.
    pub fn with_repeatable_children(
        mut self,
        classes: impl IntoIterator<Item = ElementClass>,
    ) -> Self {
        self.repeatable = self.repeatable.union(classes.into_iter().collect());
        self
    }

    /// Mark an attribute as a file path, rewritten relative to the directory
    /// of the root file while recording.
    pub fn with_path_attribute(mut self, name: impl Into<String>) -> Self {
        self.path_attributes.push(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> ElementClass {
        self.class
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    pub fn allows_text(&self) -> bool {
        self.text_handler.is_some()
    }

    pub fn required_children(&self) -> ClassSet {
        self.required
    }

    pub fn repeatable_children(&self) -> ClassSet {
        self.repeatable
    }

    /// Every class this element accepts as a child.
    pub fn allowed_children(&self) -> ClassSet {
        self.required.union(self.optional).union(self.repeatable)
    }

    pub fn is_path_attribute(&self, name: &str) -> bool {
        self.path_attributes.iter().any(|attr| attr == name)
    }

    pub(crate) fn create(&self, reader: &mut ElementReader<'_>) -> Option<EntityRef> {
        self.factory.as_ref().and_then(|factory| factory(reader))
    }

    pub(crate) fn handle_text(&self, entity: Option<&EntityRef>, text: &str) -> Result<(), String> {
        match &self.text_handler {
            Some(handler) => handler(entity, text),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementType")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("cacheable", &self.cacheable)
            .field("allows_text", &self.allows_text())
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("repeatable", &self.repeatable)
            .field("path_attributes", &self.path_attributes)
            .finish_non_exhaustive()
    }
}

/// The set of element types known to a load session.
#[derive(Debug)]
pub struct ElementRegistry {
    types: HashMap<String, Rc<ElementType>>,
    simulation: Rc<ElementType>,
    scene: Option<String>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
            simulation: Rc::new(ElementType::new(SIMULATION, ElementClass::INFRASTRUCTURE)),
            scene: None,
        }
    }

    /// Register an element type, replacing any type of the same name.
    pub fn register(&mut self, element_type: ElementType) {
        self.types
            .insert(element_type.name.clone(), Rc::new(element_type));
    }

    /// Register the type of the single top-level scene element.
    ///
    /// The document root then requires exactly one child of its class.
    pub fn register_scene(&mut self, element_type: ElementType) {
        self.simulation = Rc::new(
            ElementType::new(SIMULATION, ElementClass::INFRASTRUCTURE)
                .with_required_children([element_type.class]),
        );
        self.scene = Some(element_type.name.clone());
        self.register(element_type);
    }

    pub fn get(&self, name: &str) -> Option<&Rc<ElementType>> {
        self.types.get(name)
    }

    pub fn simulation(&self) -> &Rc<ElementType> {
        &self.simulation
    }

    pub fn is_scene(&self, element_type: &ElementType) -> bool {
        self.scene.as_deref() == Some(element_type.name())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Names of all registered types of `class`, sorted.
    pub fn type_names(&self, class: ElementClass) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .types
            .values()
            .filter(|element_type| element_type.class == class)
            .map(|element_type| element_type.name())
            .collect();
        names.sort_unstable();
        names
    }
}

impl Default for ElementRegistry {
    fn default() -> Self {
        Self::new()
    }
}
