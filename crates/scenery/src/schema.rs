//! Declarative element schemas and the registry built from them.
//!
//! A [`Schema`] lists element types the way a configuration file writes them:
//! a name, a class name, child rules by class name, and typed attributes.
//! [`Schema::build_registry`] turns it into an [`ElementRegistry`] whose
//! factories create [`SceneNode`](crate::graph::SceneNode)s in a
//! [`SceneGraph`].
//!
//! An empty element list selects the built-in rigid-body schema.

mod builtin;

use std::rc::Rc;

use color::Rgba8;
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;

use scenery_core::quantity::Quantity;
use scenery_parser::{
    Bounds, ElementClass, ElementReader, ElementRegistry, ElementType,
    registry::{INCLUDE, SIMULATION},
    value::{self, ValueError},
};

use crate::{
    error::SceneError,
    graph::{NodeData, SceneGraph, SceneNode, Value},
};

const BLACK: Rgba8 = Rgba8 { r: 0, g: 0, b: 0, a: 255 };

/// Kind of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Bool,
    Integer,
    Float,
    String,
    Color,
    Length,
    Velocity,
    Acceleration,
    Angle,
    AngularVelocity,
    Force,
    Mass,
    MomentOfInertia,
    Time,
    Scale,
}

impl AttributeKind {
    /// The physical quantity of a unit-carrying kind.
    pub fn quantity(self) -> Option<Quantity> {
        match self {
            AttributeKind::Length => Some(Quantity::Length),
            AttributeKind::Velocity => Some(Quantity::Velocity),
            AttributeKind::Acceleration => Some(Quantity::Acceleration),
            AttributeKind::Angle => Some(Quantity::Angle),
            AttributeKind::AngularVelocity => Some(Quantity::AngularVelocity),
            AttributeKind::Force => Some(Quantity::Force),
            AttributeKind::Mass => Some(Quantity::Mass),
            AttributeKind::MomentOfInertia => Some(Quantity::MomentOfInertia),
            AttributeKind::Time => Some(Quantity::Time),
            AttributeKind::Scale => Some(Quantity::Scale),
            AttributeKind::Bool
            | AttributeKind::Integer
            | AttributeKind::Float
            | AttributeKind::String
            | AttributeKind::Color => None,
        }
    }

    fn parse(self, raw: &str) -> Result<Value, ValueError> {
        if let Some(quantity) = self.quantity() {
            return value::parse_quantity(raw, quantity).map(Value::Float);
        }
        match self {
            AttributeKind::Bool => value::parse_bool(raw).map(Value::Bool),
            AttributeKind::Integer => value::parse_integer(raw).map(Value::Integer),
            AttributeKind::Color => value::parse_color(raw).map(Value::Color),
            AttributeKind::String => Ok(Value::String(raw.to_string())),
            _ => value::parse_float(raw).map(Value::Float),
        }
    }
}

/// One typed attribute of an element schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeSchema {
    name: String,
    kind: AttributeKind,
    #[serde(default)]
    required: bool,
    /// Value used when the attribute is absent, written like the attribute.
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    positive: bool,
    #[serde(default)]
    non_negative: bool,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
            min: None,
            max: None,
            positive: false,
            non_negative: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn positive(mut self) -> Self {
        self.positive = true;
        self
    }

    pub fn non_negative(mut self) -> Self {
        self.non_negative = true;
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn bounds(&self) -> Bounds {
        if self.positive {
            Bounds::Positive
        } else if self.non_negative {
            Bounds::NonNegative
        } else if self.min.is_some() || self.max.is_some() {
            Bounds::Range {
                min: self.min.unwrap_or(f64::NEG_INFINITY),
                max: self.max.unwrap_or(f64::INFINITY),
            }
        } else {
            Bounds::Any
        }
    }
}

/// One element type as written in configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementSchema {
    name: String,
    class: String,
    #[serde(default)]
    cacheable: bool,
    /// Accept text content, stored on the node.
    #[serde(default)]
    text: bool,
    /// Define a placeholder variable from `name` and `value` instead of
    /// creating a node.
    #[serde(default)]
    variable: bool,
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    optional: Vec<String>,
    #[serde(default)]
    repeatable: Vec<String>,
    #[serde(default)]
    paths: Vec<String>,
    #[serde(default)]
    attributes: Vec<AttributeSchema>,
}

impl ElementSchema {
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            cacheable: false,
            text: false,
            variable: false,
            required: Vec::new(),
            optional: Vec::new(),
            repeatable: Vec::new(),
            paths: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn cacheable(mut self) -> Self {
        self.cacheable = true;
        self
    }

    pub fn with_text(mut self) -> Self {
        self.text = true;
        self
    }

    pub fn variable(mut self) -> Self {
        self.variable = true;
        self
    }

    pub fn with_required<'a>(mut self, classes: impl IntoIterator<Item = &'a str>) -> Self {
        self.required.extend(classes.into_iter().map(str::to_string));
        self
    }

    pub fn with_optional<'a>(mut self, classes: impl IntoIterator<Item = &'a str>) -> Self {
        self.optional.extend(classes.into_iter().map(str::to_string));
        self
    }

    pub fn with_repeatable<'a>(mut self, classes: impl IntoIterator<Item = &'a str>) -> Self {
        self.repeatable.extend(classes.into_iter().map(str::to_string));
        self
    }

    /// Declare a string attribute holding a file path.
    pub fn with_path(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.paths.push(name.clone());
        self.attributes
            .push(AttributeSchema::new(name, AttributeKind::String));
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeSchema) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn attributes(&self) -> &[AttributeSchema] {
        &self.attributes
    }
}

/// The element vocabulary of a load.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    /// Name of the element type of the single top-level scene.
    #[serde(default = "default_scene")]
    scene: String,

    #[serde(default)]
    elements: Vec<ElementSchema>,
}

fn default_scene() -> String {
    "Scene".to_string()
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            scene: default_scene(),
            elements: Vec::new(),
        }
    }
}

impl Schema {
    pub fn new(scene: impl Into<String>, elements: Vec<ElementSchema>) -> Self {
        Self {
            scene: scene.into(),
            elements,
        }
    }

    /// The built-in rigid-body schema.
    pub fn builtin() -> Self {
        Self::new(builtin::SCENE, builtin::elements())
    }

    pub fn scene(&self) -> &str {
        &self.scene
    }

    pub fn elements(&self) -> &[ElementSchema] {
        &self.elements
    }

    /// Build an element registry whose factories add nodes to `graph`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Config`] if the schema is inconsistent: a
    /// duplicated or reserved element name, an unknown child class, more
    /// classes than the engine supports, an invalid default value, or a
    /// missing scene element.
    pub fn build_registry(&self, graph: &SceneGraph) -> Result<ElementRegistry, SceneError> {
        if self.elements.is_empty() {
            return Self::builtin().build_registry(graph);
        }

        let classes = ClassTable::new(&self.elements)?;
        let mut registry = ElementRegistry::new();
        let mut seen_scene = false;

        for element in &self.elements {
            if element.name == SIMULATION || element.name == INCLUDE {
                return Err(config_error(format!(
                    "Element name \"{}\" is reserved",
                    element.name
                )));
            }
            if registry.get(&element.name).is_some() {
                return Err(config_error(format!(
                    "Element \"{}\" is defined more than once",
                    element.name
                )));
            }

            let element_type = element_type(element, &classes, graph)?;
            if element.name == self.scene {
                seen_scene = true;
                registry.register_scene(element_type);
            } else {
                registry.register(element_type);
            }
        }

        if !seen_scene {
            return Err(config_error(format!(
                "Scene element \"{}\" is not defined",
                self.scene
            )));
        }
        debug!(element_types = registry.len(); "Element registry built");
        Ok(registry)
    }
}

fn config_error(message: String) -> SceneError {
    SceneError::Config(message)
}

/// Assigns class bits to class names in order of first use.
struct ClassTable {
    classes: IndexMap<String, ElementClass>,
}

impl ClassTable {
    fn new(elements: &[ElementSchema]) -> Result<Self, SceneError> {
        let mut classes = IndexMap::new();
        for element in elements {
            if classes.contains_key(&element.class) {
                continue;
            }
            // Bit 0 belongs to the infrastructure elements.
            let bit = u8::try_from(classes.len() + 1)
                .ok()
                .and_then(ElementClass::new)
                .ok_or_else(|| {
                    config_error(format!(
                        "Too many element classes (at most {})",
                        ElementClass::MAX_BIT
                    ))
                })?;
            classes.insert(element.class.clone(), bit);
        }
        Ok(Self { classes })
    }

    fn get(&self, name: &str) -> Result<ElementClass, SceneError> {
        self.classes
            .get(name)
            .copied()
            .ok_or_else(|| config_error(format!("Unknown element class \"{name}\"")))
    }

    fn resolve(&self, names: &[String]) -> Result<Vec<ElementClass>, SceneError> {
        names.iter().map(|name| self.get(name)).collect()
    }
}

/// An attribute ready for reading, with its default already parsed.
#[derive(Debug)]
struct AttributeReader {
    name: String,
    kind: AttributeKind,
    required: bool,
    default: Option<Value>,
    bounds: Bounds,
}

impl AttributeReader {
    fn new(element: &str, schema: &AttributeSchema) -> Result<Self, SceneError> {
        let default = schema
            .default
            .as_deref()
            .map(|raw| schema.kind.parse(raw))
            .transpose()
            .map_err(|err| {
                config_error(format!(
                    "Invalid default for \"{}\" of \"{element}\": {err}",
                    schema.name
                ))
            })?;
        Ok(Self {
            name: schema.name.clone(),
            kind: schema.kind,
            required: schema.required,
            default,
            bounds: schema.bounds(),
        })
    }

    /// Read the attribute. Absent optional attributes yield their default.
    fn read(&self, reader: &mut ElementReader<'_>) -> Option<Value> {
        let present = reader.has_attribute(&self.name);
        if !present && !self.required {
            return self.default.clone();
        }

        let name = self.name.as_str();
        let fallback = self.default.as_ref().and_then(Value::as_f64).unwrap_or(0.0);
        let value = match self.kind {
            AttributeKind::Bool => {
                let fallback = matches!(self.default, Some(Value::Bool(true)));
                Value::Bool(reader.get_bool(name, self.required, fallback))
            }
            AttributeKind::Integer => {
                let fallback = match self.default {
                    Some(Value::Integer(value)) => value,
                    _ => 0,
                };
                Value::Integer(reader.get_integer(name, self.required, fallback, self.bounds))
            }
            AttributeKind::Float => {
                Value::Float(reader.get_float(name, self.required, fallback, self.bounds))
            }
            AttributeKind::String => {
                let value = reader.get_string(name, self.required);
                return value.map(Value::String).or_else(|| self.default.clone());
            }
            AttributeKind::Color => {
                let fallback = match self.default {
                    Some(Value::Color(color)) => color,
                    _ => BLACK,
                };
                Value::Color(reader.get_color(name, self.required, fallback))
            }
            AttributeKind::Mass => {
                Value::Float(reader.get_mass(name, self.required, fallback, self.bounds))
            }
            kind => {
                let quantity = kind.quantity().unwrap_or(Quantity::Length);
                Value::Float(reader.get_quantity(
                    name,
                    quantity,
                    self.required,
                    fallback,
                    self.bounds,
                ))
            }
        };
        present.then_some(value)
    }
}

fn element_type(
    element: &ElementSchema,
    classes: &ClassTable,
    graph: &SceneGraph,
) -> Result<ElementType, SceneError> {
    let mut element_type = ElementType::new(element.name.clone(), classes.get(&element.class)?)
        .with_required_children(classes.resolve(&element.required)?)
        .with_optional_children(classes.resolve(&element.optional)?)
        .with_repeatable_children(classes.resolve(&element.repeatable)?);
    for path in &element.paths {
        element_type = element_type.with_path_attribute(path.clone());
    }
    if element.cacheable {
        element_type = element_type.with_caching();
    }

    if element.variable {
        return Ok(element_type.with_factory(|reader| {
            let name = reader.get_string("name", true);
            let value = reader.get_string("value", true);
            if let (Some(name), Some(value)) = (name, value) {
                reader.define_variable(name, value);
            }
            None
        }));
    }

    if element.text {
        element_type = element_type.with_text_handler(|entity, text| {
            if let Some(node) = entity.and_then(SceneNode::from_entity) {
                node.set_text(text);
            }
            Ok(())
        });
    }

    let attributes: Rc<[AttributeReader]> = element
        .attributes
        .iter()
        .map(|attribute| AttributeReader::new(&element.name, attribute))
        .collect::<Result<_, _>>()?;
    let graph = graph.clone();
    Ok(element_type.with_factory(move |reader| {
        let name = reader.get_string("name", false);
        let mut properties = IndexMap::new();
        for attribute in attributes.iter() {
            if let Some(value) = attribute.read(reader) {
                properties.insert(attribute.name.clone(), value);
            }
        }
        Some(graph.add_node(NodeData::new(reader.element_name(), name, properties)))
    }))
}
