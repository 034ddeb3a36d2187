//! The opaque product of element factories.
//!
//! The engine never owns entity lifetimes: factories hand out shared
//! [`EntityRef`] handles whose backing storage lives in whatever graph store
//! the registering domain uses. The engine only decides whether a handle is
//! reused for another parent.

use std::{any::Any, fmt, rc::Rc};

/// A shared handle to an entity.
pub type EntityRef = Rc<dyn Entity>;

/// An object produced by an element factory.
///
/// Entities form a directed acyclic graph: a cached entity reused by several
/// instantiations is told about each of its parents through
/// [`Entity::add_parent`].
pub trait Entity: fmt::Debug {
    /// Record that `parent` contains this entity.
    fn add_parent(&self, parent: &EntityRef);

    /// Access the concrete type for downcasting.
    fn as_any(&self) -> &dyn Any;
}
