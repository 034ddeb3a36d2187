//! Error codes for the Scenery diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Markup errors
//! - `E1xx` - Recording errors
//! - `E2xx` - Expansion errors
//! - `E3xx` - Attribute value errors

use std::fmt;

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Markup Errors (E0xx)
    // =========================================================================
    /// Malformed tag.
    ///
    /// A start or end tag could not be read, e.g. an attribute without a
    /// quoted value or a tag that is never closed with `>`.
    E001,

    /// Unterminated construct.
    ///
    /// A comment, CDATA section, processing instruction or document type
    /// declaration was opened but never closed.
    E002,

    /// Unknown entity reference.
    ///
    /// Only `&lt;`, `&gt;`, `&amp;`, `&quot;`, `&apos;` and numeric
    /// character references are recognized.
    E003,

    /// Duplicate attribute.
    ///
    /// The same attribute name appears twice in one start tag.
    E004,

    /// Mismatched end tag.
    ///
    /// An end tag does not close the most recently opened element.
    E005,

    /// Unclosed element.
    ///
    /// The document ended while elements were still open.
    E006,

    /// Unexpected character.
    ///
    /// A character was encountered that cannot start any markup construct.
    E007,

    // =========================================================================
    // Recording Errors (E1xx)
    // =========================================================================
    /// File could not be loaded.
    ///
    /// The file does not exist, is unreadable or contains no markup.
    E100,

    /// Unexpected element.
    ///
    /// An element is unknown or not allowed at this position.
    E101,

    /// Duplicated name.
    ///
    /// A top-level element with the same name and element type has already
    /// been defined.
    E102,

    /// Unexpected text.
    ///
    /// Text content was found inside an element that does not accept text.
    E103,

    /// Recursive inclusion.
    ///
    /// A file includes itself, directly or through other included files.
    E104,

    /// Include depth limit exceeded.
    ///
    /// Includes are nested deeper than the configured limit.
    E105,

    /// Too many attributes.
    ///
    /// An element carries more attributes than the engine can track.
    E106,

    // =========================================================================
    // Expansion Errors (E2xx)
    // =========================================================================
    /// Unresolvable reference.
    ///
    /// A `ref` attribute names a definition that does not exist for this
    /// element type.
    E200,

    /// Looping reference.
    ///
    /// A definition references itself, directly or through other references.
    E201,

    /// Unexpected attribute.
    ///
    /// An attribute was specified that the element type does not read.
    E202,

    /// Missing child element.
    ///
    /// A required child element was not provided.
    E203,

    /// Invalid text content.
    ///
    /// The element type rejected its text content.
    E204,

    // =========================================================================
    // Attribute Value Errors (E3xx)
    // =========================================================================
    /// Missing attribute.
    ///
    /// A required attribute was not provided.
    E300,

    /// Invalid attribute format.
    ///
    /// An attribute value could not be read as the requested type.
    E301,

    /// Value out of range.
    ///
    /// A numeric attribute value is outside its permitted bounds.
    E302,

    /// Unexpected unit.
    ///
    /// A physical quantity carries a unit suffix that is not allowed for it.
    E303,

    /// Non-positive mass.
    ///
    /// Masses must be strictly positive.
    E304,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Markup errors
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            ErrorCode::E005 => "E005",
            ErrorCode::E006 => "E006",
            ErrorCode::E007 => "E007",
            // Recording errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
            ErrorCode::E105 => "E105",
            ErrorCode::E106 => "E106",
            // Expansion errors
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            // Attribute value errors
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E303 => "E303",
            ErrorCode::E304 => "E304",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            // Markup errors
            ErrorCode::E001 => "malformed tag",
            ErrorCode::E002 => "unterminated construct",
            ErrorCode::E003 => "unknown entity reference",
            ErrorCode::E004 => "duplicate attribute",
            ErrorCode::E005 => "mismatched end tag",
            ErrorCode::E006 => "unclosed element",
            ErrorCode::E007 => "unexpected character",
            // Recording errors
            ErrorCode::E100 => "file could not be loaded",
            ErrorCode::E101 => "unexpected element",
            ErrorCode::E102 => "duplicated name",
            ErrorCode::E103 => "unexpected text",
            ErrorCode::E104 => "recursive inclusion",
            ErrorCode::E105 => "include depth limit exceeded",
            ErrorCode::E106 => "too many attributes",
            // Expansion errors
            ErrorCode::E200 => "unresolvable reference",
            ErrorCode::E201 => "looping reference",
            ErrorCode::E202 => "unexpected attribute",
            ErrorCode::E203 => "missing child element",
            ErrorCode::E204 => "invalid text content",
            // Attribute value errors
            ErrorCode::E300 => "missing attribute",
            ErrorCode::E301 => "invalid attribute format",
            ErrorCode::E302 => "value out of range",
            ErrorCode::E303 => "unexpected unit",
            ErrorCode::E304 => "non-positive mass",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
