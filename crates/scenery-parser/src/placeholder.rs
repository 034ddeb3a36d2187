//! Placeholder substitution in attribute values and reference names.
//!
//! Three forms are recognized: `$(name)`, `${name}` and `$name`, where the
//! bare form takes the longest run of alphanumeric characters. Placeholders
//! that do not resolve are kept verbatim.

use std::{borrow::Cow, collections::HashMap};

use thiserror::Error;

/// Source of variable values for substitution.
pub trait VariableLookup {
    fn lookup(&self, name: &str) -> Option<&str>;
}

impl VariableLookup for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// A parenthesized or braced placeholder was opened but never closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid attribute format")]
pub struct UnterminatedPlaceholder;

/// Result of [`replace_placeholders`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution<'t> {
    text: Cow<'t, str>,
    substituted: bool,
}

impl<'t> Substitution<'t> {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> Cow<'t, str> {
        self.text
    }

    /// Whether at least one placeholder resolved to a variable.
    pub fn substituted(&self) -> bool {
        self.substituted
    }
}

/// Replace every resolvable placeholder in `text`.
///
/// Text without any `$` is returned borrowed.
pub fn replace_placeholders<'t>(
    text: &'t str,
    variables: &impl VariableLookup,
) -> Result<Substitution<'t>, UnterminatedPlaceholder> {
    if !text.contains('$') {
        return Ok(Substitution {
            text: Cow::Borrowed(text),
            substituted: false,
        });
    }

    let mut result = String::with_capacity(text.len());
    let mut substituted = false;
    let mut rest = text;
    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let close = match after.chars().next() {
            Some('(') => Some(')'),
            Some('{') => Some('}'),
            _ => None,
        };

        match close {
            Some(close) => {
                let body = &after[1..];
                let end = body.find(close).ok_or(UnterminatedPlaceholder)?;
                let name = &body[..end];
                match variables.lookup(name) {
                    Some(value) => {
                        result.push_str(value);
                        substituted = true;
                    }
                    None => {
                        result.push('$');
                        result.push_str(&after[..end + 2]);
                    }
                }
                rest = &body[end + 1..];
            }
            None => {
                let len = after
                    .find(|c: char| !c.is_alphanumeric())
                    .unwrap_or(after.len());
                let name = &after[..len];
                match (name.is_empty(), variables.lookup(name)) {
                    (false, Some(value)) => {
                        result.push_str(value);
                        substituted = true;
                    }
                    _ => {
                        result.push('$');
                        result.push_str(name);
                    }
                }
                rest = &after[len..];
            }
        }
    }
    result.push_str(rest);

    Ok(Substitution {
        text: Cow::Owned(result),
        substituted,
    })
}
