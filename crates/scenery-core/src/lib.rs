//! Scenery Core Types and Definitions
//!
//! This crate provides the foundational types shared by the Scenery engine and
//! the code that consumes its output. It includes:
//!
//! - **Locations**: Line/column provenance of markup constructs ([`location::Location`])
//! - **Entities**: The opaque handle produced by element factories ([`entity::Entity`])
//! - **Quantities**: Physical quantities and their unit tables ([`quantity`] module)

pub mod entity;
pub mod location;
pub mod quantity;
