//! Ordered attribute sets with per-attribute consumption tracking.

use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

use scenery_core::location::Location;

/// The maximum number of attributes on one element, including attributes
/// inherited through references.
pub const MAX_ATTRIBUTES: usize = 32;

/// Returned when an attribute set would exceed [`MAX_ATTRIBUTES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Only up to 32 attributes are supported")]
pub struct TooManyAttributes;

/// A single attribute value with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    value: String,
    location: Location,
    index: u8,
    file: Option<Rc<str>>,
}

impl Attribute {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// The file this attribute was inherited from. `None` for attributes
    /// written on the element itself.
    pub fn file(&self) -> Option<&Rc<str>> {
        self.file.as_ref()
    }

    /// The bit of this attribute in a consumption mask.
    pub fn mask(&self) -> u32 {
        1 << self.index
    }
}

/// The attributes of one element, keyed by name in insertion order.
///
/// Every attribute gets a stable index below [`MAX_ATTRIBUTES`] so that the
/// attributes read by an element factory can be tracked in a `u32` mask.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    entries: IndexMap<String, Attribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, replacing the value of an existing one with the
    /// same name.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        location: Location,
    ) -> Result<(), TooManyAttributes> {
        let name = name.into();
        if let Some(existing) = self.entries.get_mut(&name) {
            existing.value = value.into();
            existing.location = location;
            existing.file = None;
            return Ok(());
        }
        let index = self.next_index()?;
        self.entries.insert(
            name,
            Attribute {
                value: value.into(),
                location,
                index,
                file: None,
            },
        );
        Ok(())
    }

    /// Copy `attribute`, defined in `file`, under `name` unless an attribute
    /// of that name exists.
    ///
    /// Returns whether the attribute was added.
    pub fn insert_if_absent(
        &mut self,
        name: &str,
        attribute: &Attribute,
        file: &Rc<str>,
    ) -> Result<bool, TooManyAttributes> {
        if self.entries.contains_key(name) {
            return Ok(false);
        }
        let index = self.next_index()?;
        self.entries.insert(
            name.to_string(),
            Attribute {
                value: attribute.value.clone(),
                location: attribute.location,
                index,
                file: Some(attribute.file.clone().unwrap_or_else(|| Rc::clone(file))),
            },
        );
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.entries.iter().map(|(name, attr)| (name.as_str(), attr))
    }

    /// Attributes whose bit is not set in `consumed`, in insertion order.
    pub fn unconsumed(&self, consumed: u32) -> impl Iterator<Item = (&str, &Attribute)> {
        self.iter().filter(move |(_, attr)| consumed & attr.mask() == 0)
    }

    fn next_index(&self) -> Result<u8, TooManyAttributes> {
        if self.entries.len() >= MAX_ATTRIBUTES {
            return Err(TooManyAttributes);
        }
        u8::try_from(self.entries.len()).map_err(|_| TooManyAttributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_assigns_sequential_masks() {
        let mut set = AttributeSet::new();
        set.insert("name", "wheel", Location::new(1, 2)).unwrap();
        set.insert("radius", "5cm", Location::new(1, 15)).unwrap();

        assert_eq!(set.get("name").unwrap().mask(), 0b01);
        assert_eq!(set.get("radius").unwrap().mask(), 0b10);
        assert_eq!(set.get("radius").unwrap().file(), None);
    }

    #[test]
    fn test_insert_replaces_existing_value() {
        let mut set = AttributeSet::new();
        set.insert("x", "1", Location::new(1, 1)).unwrap();
        set.insert("x", "2", Location::new(2, 1)).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("x").unwrap().value(), "2");
    }

    #[test]
    fn test_insert_if_absent_keeps_existing() {
        let mut own = AttributeSet::new();
        own.insert("color", "#f00", Location::new(3, 1)).unwrap();
        let mut inherited = AttributeSet::new();
        inherited.insert("color", "#00f", Location::new(9, 1)).unwrap();
        inherited.insert("radius", "1", Location::new(9, 10)).unwrap();

        let file: Rc<str> = Rc::from("parts/ball.scn");
        for (name, attr) in inherited.iter() {
            own.insert_if_absent(name, attr, &file).unwrap();
        }

        assert_eq!(own.get("color").unwrap().value(), "#f00");
        assert_eq!(own.get("radius").unwrap().value(), "1");
        assert_eq!(own.get("radius").unwrap().location(), Location::new(9, 10));
        assert_eq!(own.get("radius").unwrap().mask(), 0b10);
        assert_eq!(own.get("color").unwrap().file(), None);
        assert_eq!(own.get("radius").unwrap().file().map(|f| &**f), Some("parts/ball.scn"));
    }

    #[test]
    fn test_capacity_limit() {
        let mut set = AttributeSet::new();
        for i in 0..MAX_ATTRIBUTES {
            set.insert(format!("a{i}"), "v", Location::unknown()).unwrap();
        }
        assert_eq!(set.get("a31").unwrap().mask(), 1 << 31);
        assert_eq!(
            set.insert("overflow", "v", Location::unknown()),
            Err(TooManyAttributes)
        );
        // Replacing an existing attribute is still possible.
        assert!(set.insert("a0", "w", Location::unknown()).is_ok());
    }

    #[test]
    fn test_unconsumed() {
        let mut set = AttributeSet::new();
        set.insert("a", "1", Location::unknown()).unwrap();
        set.insert("b", "2", Location::unknown()).unwrap();
        set.insert("c", "3", Location::unknown()).unwrap();

        let left: Vec<_> = set.unconsumed(0b101).map(|(name, _)| name).collect();
        assert_eq!(left, vec!["b"]);
    }
}
