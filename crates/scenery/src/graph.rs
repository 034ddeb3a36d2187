//! The scene graph built by element factories.
//!
//! Every entity created during a load is a node of one [`SceneGraph`]. An
//! edge points from a parent to a child, so an entity shared through caching
//! is a node with several incoming edges and the graph is a DAG rather than a
//! tree.

use std::{
    any::Any,
    cell::{Ref, RefCell},
    fmt::{self, Write as _},
    rc::{Rc, Weak},
};

use color::Rgba8;
use indexmap::IndexMap;
use log::{trace, warn};
use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
};

use scenery_core::entity::{Entity, EntityRef};

type Inner = DiGraph<NodeData, ()>;

/// A typed attribute value stored on a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Integer(i32),
    /// Plain numbers and physical quantities in SI base units.
    Float(f64),
    String(String),
    Color(Rgba8),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Integer(value) => Some(f64::from(*value)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "{value:?}"),
            Value::Color(Rgba8 { r, g, b, a }) => write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}"),
        }
    }
}

/// The data of one scene node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    element: String,
    name: Option<String>,
    properties: IndexMap<String, Value>,
    text: Option<String>,
}

impl NodeData {
    pub fn new(
        element: impl Into<String>,
        name: Option<String>,
        properties: IndexMap<String, Value>,
    ) -> Self {
        Self {
            element: element.into(),
            name,
            properties,
            text: None,
        }
    }

    /// Name of the element type that created the node.
    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// Shared handle to the graph of one load.
///
/// Clones refer to the same graph.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    inner: Rc<RefCell<Inner>>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return the entity handle pointing at it.
    pub(crate) fn add_node(&self, data: NodeData) -> EntityRef {
        trace!(element = data.element.as_str(); "Adding scene node");
        let id = self.inner.borrow_mut().add_node(data);
        Rc::new(SceneNode {
            id,
            graph: Rc::downgrade(&self.inner),
        })
    }

    pub fn node_count(&self) -> usize {
        self.inner.borrow().node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.borrow().edge_count()
    }

    pub fn node(&self, id: NodeIndex) -> Option<Ref<'_, NodeData>> {
        Ref::filter_map(self.inner.borrow(), |graph| graph.node_weight(id)).ok()
    }

    /// Children of `id` in the order they were attached.
    ///
    /// A child used twice by the same parent appears twice.
    pub fn children(&self, id: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Parents of `id` in the order they were attached.
    pub fn parents(&self, id: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Nodes of the given element type in creation order.
    pub fn find(&self, element: &str) -> Vec<NodeIndex> {
        let graph = self.inner.borrow();
        graph
            .node_indices()
            .filter(|id| graph[*id].element == element)
            .collect()
    }

    /// Nodes with more than one incoming edge.
    pub fn shared_nodes(&self) -> Vec<NodeIndex> {
        let graph = self.inner.borrow();
        graph
            .node_indices()
            .filter(|id| {
                graph
                    .neighbors_directed(*id, Direction::Incoming)
                    .nth(1)
                    .is_some()
            })
            .collect()
    }

    /// Render the subtree below `root` as an indented outline. Shared nodes
    /// are marked with `*`.
    pub fn render_tree(&self, root: NodeIndex) -> String {
        let mut out = String::new();
        self.render_node(root, 0, &mut out);
        out
    }

    fn render_node(&self, id: NodeIndex, depth: usize, out: &mut String) {
        let shared = self.parents(id).len() > 1;
        if let Some(node) = self.node(id) {
            let _ = write!(out, "{:indent$}{}", "", node.element, indent = depth * 2);
            if let Some(name) = &node.name {
                let _ = write!(out, " \"{name}\"");
            }
            for (key, value) in &node.properties {
                let _ = write!(out, " {key}={value}");
            }
            if let Some(text) = &node.text {
                let _ = write!(out, " {text:?}");
            }
            if shared {
                out.push_str(" *");
            }
            out.push('\n');
        }
        for child in self.children(id) {
            self.render_node(child, depth + 1, out);
        }
    }

    fn neighbors(&self, id: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self
            .inner
            .borrow()
            .neighbors_directed(id, direction)
            .collect();
        // petgraph yields the most recent edge first.
        neighbors.reverse();
        neighbors
    }
}

/// Entity handle of a scene node.
#[derive(Debug)]
pub struct SceneNode {
    id: NodeIndex,
    graph: Weak<RefCell<Inner>>,
}

impl SceneNode {
    pub fn id(&self) -> NodeIndex {
        self.id
    }

    /// The scene node behind an entity handle, if it is one.
    pub fn from_entity(entity: &EntityRef) -> Option<&SceneNode> {
        entity.as_any().downcast_ref::<SceneNode>()
    }

    pub(crate) fn set_text(&self, text: &str) {
        let Some(graph) = self.graph.upgrade() else {
            return;
        };
        let mut graph = graph.borrow_mut();
        if let Some(node) = graph.node_weight_mut(self.id) {
            node.text = Some(text.to_string());
        }
    }
}

impl Entity for SceneNode {
    fn add_parent(&self, parent: &EntityRef) {
        let Some(parent) = SceneNode::from_entity(parent) else {
            warn!(node = self.id.index(); "Parent is not a scene node");
            return;
        };
        if let Some(graph) = self.graph.upgrade() {
            graph.borrow_mut().add_edge(parent.id, self.id, ());
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(graph: &SceneGraph, element: &str) -> EntityRef {
        graph.add_node(NodeData::new(element, None, IndexMap::new()))
    }

    fn id(entity: &EntityRef) -> NodeIndex {
        SceneNode::from_entity(entity).unwrap().id()
    }

    #[test]
    fn test_add_parent_creates_edge() {
        let graph = SceneGraph::new();
        let body = node(&graph, "Body");
        let first = node(&graph, "Sphere");
        let second = node(&graph, "Box");

        first.add_parent(&body);
        second.add_parent(&body);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.children(id(&body)), vec![id(&first), id(&second)]);
        assert_eq!(graph.parents(id(&first)), vec![id(&body)]);
    }

    #[test]
    fn test_shared_nodes() {
        let graph = SceneGraph::new();
        let left = node(&graph, "Body");
        let right = node(&graph, "Body");
        let mass = node(&graph, "Mass");

        mass.add_parent(&left);
        mass.add_parent(&right);

        assert_eq!(graph.shared_nodes(), vec![id(&mass)]);
        assert_eq!(graph.find("Body"), vec![id(&left), id(&right)]);
    }

    #[test]
    fn test_render_tree() {
        let graph = SceneGraph::new();
        let mut properties = IndexMap::new();
        properties.insert("radius".to_string(), Value::Float(0.5));
        properties.insert(
            "color".to_string(),
            Value::Color(Rgba8 { r: 255, g: 0, b: 0, a: 255 }),
        );
        let scene = graph.add_node(NodeData::new("Scene", Some("main".to_string()), IndexMap::new()));
        let sphere = graph.add_node(NodeData::new("Sphere", None, properties));
        sphere.add_parent(&scene);
        sphere.add_parent(&scene);

        let tree = graph.render_tree(id(&scene));

        assert_eq!(
            tree,
            "Scene \"main\"\n  Sphere radius=0.5 color=#ff0000ff *\n  Sphere radius=0.5 color=#ff0000ff *\n"
        );
    }

    #[test]
    fn test_text_is_stored() {
        let graph = SceneGraph::new();
        let label = node(&graph, "Description");

        SceneNode::from_entity(&label).unwrap().set_text("front wheel");

        assert_eq!(graph.node(id(&label)).unwrap().text(), Some("front wheel"));
    }
}
