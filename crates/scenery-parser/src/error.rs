//! Error and diagnostic system for the Scenery engine.
//!
//! This module provides an error handling system with:
//! - Error codes for documentation and searchability
//! - File and line/column provenance for every message
//! - Severity levels
//! - Diagnostic collector for accumulating multiple errors
//!
//! # Overview
//!
//! Loading a scene never stops at the first problem. Every phase (markup
//! reading, macro recording, macro expansion, attribute access) reports
//! [`Diagnostic`]s into one [`DiagnosticCollector`] and keeps going. The final
//! list is wrapped in [`ParseError`] when the load did not succeed.
//!
//! # Example
//!
//! ```
//! # use scenery_parser::error::{Diagnostic, ErrorCode};
//! # use scenery_core::location::Location;
//!
//! let diag = Diagnostic::error("Duplicated name \"wheel\"")
//!     .with_code(ErrorCode::E102)
//!     .with_location(Location::new(12, 5))
//!     .with_help("rename one of the definitions");
//! assert_eq!(diag.message(), "Duplicated name \"wheel\"");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use parse_error::ParseError;
pub use severity::Severity;
