//! Typed access to the merged attributes of an element under construction.
//!
//! Element factories receive an [`ElementReader`]. Every getter substitutes
//! placeholders, parses and validates the value, marks the attribute as
//! consumed and reports problems without aborting the load: on any failure
//! the caller's default is returned.

use std::borrow::Cow;

use color::Rgba8;

use scenery_core::{entity::EntityRef, location::Location, quantity::Quantity};

use crate::{
    attribute::{Attribute, AttributeSet},
    context::ContextStack,
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    registry::ElementType,
    value::{self, ValueError},
};

/// Permitted range of a numeric attribute.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Bounds {
    #[default]
    Any,
    /// Strictly greater than zero.
    Positive,
    NonNegative,
    /// Inclusive on both ends.
    Range { min: f64, max: f64 },
}

impl Bounds {
    pub fn accepts(self, value: f64) -> bool {
        match self {
            Bounds::Any => true,
            Bounds::Positive => value > 0.0,
            Bounds::NonNegative => value >= 0.0,
            Bounds::Range { min, max } => (min..=max).contains(&value),
        }
    }

    fn requirement(self) -> String {
        match self {
            Bounds::Any => "be a number".to_string(),
            Bounds::Positive => "be positive".to_string(),
            Bounds::NonNegative => "not be negative".to_string(),
            Bounds::Range { min, max } => format!("be between {min} and {max}"),
        }
    }
}

/// Attribute accessor handed to element factories.
#[derive(Debug)]
pub struct ElementReader<'a> {
    element_type: &'a ElementType,
    attributes: &'a AttributeSet,
    location: Location,
    parent: Option<&'a EntityRef>,
    contexts: &'a mut ContextStack,
    diagnostics: &'a mut DiagnosticCollector,
    consumed: u32,
}

impl<'a> ElementReader<'a> {
    pub(crate) fn new(
        element_type: &'a ElementType,
        attributes: &'a AttributeSet,
        location: Location,
        parent: Option<&'a EntityRef>,
        contexts: &'a mut ContextStack,
        diagnostics: &'a mut DiagnosticCollector,
    ) -> Self {
        Self {
            element_type,
            attributes,
            location,
            parent,
            contexts,
            diagnostics,
            consumed: 0,
        }
    }

    pub fn element_name(&self) -> &str {
        self.element_type.name()
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// The entity of the closest enclosing element that produced one.
    pub fn parent(&self) -> Option<&EntityRef> {
        self.parent
    }

    /// Whether the attribute is present. Does not consume it.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    pub fn get_bool(&mut self, name: &str, required: bool, default: bool) -> bool {
        let Some((raw, attribute)) = self.take(name, required) else {
            return default;
        };
        value::parse_bool(&raw).unwrap_or_else(|err| {
            self.report(attribute, err, "expected true, false, on, off, 1 or 0");
            default
        })
    }

    pub fn get_integer(&mut self, name: &str, required: bool, default: i32, bounds: Bounds) -> i32 {
        let Some((raw, attribute)) = self.take(name, required) else {
            return default;
        };
        match value::parse_integer(&raw) {
            Ok(parsed) if self.check_bounds(name, f64::from(parsed), bounds, attribute) => parsed,
            Ok(_) => default,
            Err(err) => {
                self.report(attribute, err, "expected an integer");
                default
            }
        }
    }

    pub fn get_float(&mut self, name: &str, required: bool, default: f64, bounds: Bounds) -> f64 {
        let Some((raw, attribute)) = self.take(name, required) else {
            return default;
        };
        match value::parse_float(&raw) {
            Ok(parsed) if self.check_bounds(name, parsed, bounds, attribute) => parsed,
            Ok(_) => default,
            Err(err) => {
                self.report(attribute, err, "expected a number");
                default
            }
        }
    }

    /// Returns `None` when the attribute is absent or invalid.
    pub fn get_string(&mut self, name: &str, required: bool) -> Option<String> {
        self.take(name, required).map(|(raw, _)| raw.into_owned())
    }

    pub fn get_color(&mut self, name: &str, required: bool, default: Rgba8) -> Rgba8 {
        let Some((raw, attribute)) = self.take(name, required) else {
            return default;
        };
        value::parse_color(&raw).unwrap_or_else(|err| {
            self.report(
                attribute,
                err,
                "expected #rgb, #rgba, #rrggbb, #rrggbbaa, rgb(r, g, b) or rgba(r, g, b, a)",
            );
            default
        })
    }

    /// Read a physical quantity and convert it to its base unit.
    pub fn get_quantity(
        &mut self,
        name: &str,
        quantity: Quantity,
        required: bool,
        default: f64,
        bounds: Bounds,
    ) -> f64 {
        self.read_quantity(name, quantity, required, bounds)
            .map_or(default, |(value, _)| value)
    }

    /// Length in meters.
    pub fn get_length(&mut self, name: &str, required: bool, default: f64, bounds: Bounds) -> f64 {
        self.get_quantity(name, Quantity::Length, required, default, bounds)
    }

    /// Velocity in meters per second.
    pub fn get_velocity(&mut self, name: &str, required: bool, default: f64, bounds: Bounds) -> f64 {
        self.get_quantity(name, Quantity::Velocity, required, default, bounds)
    }

    /// Acceleration in meters per second squared.
    pub fn get_acceleration(
        &mut self,
        name: &str,
        required: bool,
        default: f64,
        bounds: Bounds,
    ) -> f64 {
        self.get_quantity(name, Quantity::Acceleration, required, default, bounds)
    }

    /// Angle in radians.
    pub fn get_angle(&mut self, name: &str, required: bool, default: f64, bounds: Bounds) -> f64 {
        self.get_quantity(name, Quantity::Angle, required, default, bounds)
    }

    /// Angular velocity in radians per second.
    pub fn get_angular_velocity(
        &mut self,
        name: &str,
        required: bool,
        default: f64,
        bounds: Bounds,
    ) -> f64 {
        self.get_quantity(name, Quantity::AngularVelocity, required, default, bounds)
    }

    pub fn get_force(&mut self, name: &str, required: bool, default: f64, bounds: Bounds) -> f64 {
        self.get_quantity(name, Quantity::Force, required, default, bounds)
    }

    /// Mass in kilograms. A present value must be strictly positive whatever
    /// `bounds` says; a non-positive mass is reported but still returned.
    pub fn get_mass(&mut self, name: &str, required: bool, default: f64, bounds: Bounds) -> f64 {
        match self.read_quantity(name, Quantity::Mass, required, bounds) {
            Some((mass, attribute)) => {
                if mass <= 0.0 {
                    self.diagnostics.error_at(
                        ErrorCode::E304,
                        attribute,
                        format!("Mass \"{name}\" must be positive"),
                    );
                }
                mass
            }
            None => default,
        }
    }

    pub fn get_moment_of_inertia(
        &mut self,
        name: &str,
        required: bool,
        default: f64,
        bounds: Bounds,
    ) -> f64 {
        self.get_quantity(name, Quantity::MomentOfInertia, required, default, bounds)
    }

    /// Time in seconds.
    pub fn get_time(&mut self, name: &str, required: bool, default: f64, bounds: Bounds) -> f64 {
        self.get_quantity(name, Quantity::Time, required, default, bounds)
    }

    /// Scale factor, accepting length units.
    pub fn get_scale(&mut self, name: &str, required: bool, default: f64, bounds: Bounds) -> f64 {
        self.get_quantity(name, Quantity::Scale, required, default, bounds)
    }

    /// Define a variable visible to the siblings of this element and their
    /// subtrees.
    pub fn define_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.contexts.define_variable(name, value);
    }

    pub(crate) fn consumed(&self) -> u32 {
        self.consumed
    }

    /// Look up an attribute, mark it consumed and substitute placeholders.
    fn take(&mut self, name: &str, required: bool) -> Option<(Cow<'a, str>, &'a Attribute)> {
        let attributes: &'a AttributeSet = self.attributes;
        let Some(attribute) = attributes.get(name) else {
            if required {
                self.diagnostics.error(
                    ErrorCode::E300,
                    self.location,
                    format!("Expected attribute \"{name}\""),
                );
            }
            return None;
        };
        self.consumed |= attribute.mask();

        match self.contexts.substitute(attribute.value()) {
            Ok(raw) => Some((raw, attribute)),
            Err(err) => {
                self.diagnostics
                    .error_at(ErrorCode::E301, attribute, err.to_string());
                None
            }
        }
    }

    fn read_quantity(
        &mut self,
        name: &str,
        quantity: Quantity,
        required: bool,
        bounds: Bounds,
    ) -> Option<(f64, &'a Attribute)> {
        let (raw, attribute) = self.take(name, required)?;
        match value::parse_quantity(&raw, quantity) {
            Ok(parsed) => self
                .check_bounds(name, parsed, bounds, attribute)
                .then_some((parsed, attribute)),
            Err(err) => {
                self.report(
                    attribute,
                    err,
                    &format!(
                        "expected a number optionally followed by one of {}",
                        quantity.allowed_units()
                    ),
                );
                None
            }
        }
    }

    fn check_bounds(
        &mut self,
        name: &str,
        value: f64,
        bounds: Bounds,
        attribute: &Attribute,
    ) -> bool {
        if bounds.accepts(value) {
            return true;
        }
        self.diagnostics.error_at(
            ErrorCode::E302,
            attribute,
            format!("Value of \"{name}\" must {}", bounds.requirement()),
        );
        false
    }

    fn report(&mut self, attribute: &Attribute, err: ValueError, help: &str) {
        let code = match err {
            ValueError::Format => ErrorCode::E301,
            ValueError::Unit(_) => ErrorCode::E303,
        };
        self.diagnostics.emit_at(
            attribute,
            Diagnostic::error(err.to_string())
                .with_code(code)
                .with_help(help),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use float_cmp::approx_eq;

    use super::*;
    use crate::{
        context::ExpansionFrame,
        error::Diagnostic,
        registry::{ElementClass, ElementType},
    };

    struct Fixture {
        element_type: ElementType,
        attributes: AttributeSet,
        contexts: ContextStack,
        diagnostics: DiagnosticCollector,
    }

    impl Fixture {
        fn new(attributes: &[(&str, &str)]) -> Self {
            let mut set = AttributeSet::new();
            for (column, (name, value)) in (1u32..).zip(attributes) {
                set.insert(*name, *value, Location::new(1, column * 10))
                    .unwrap();
            }
            let element_type = ElementType::new("Box", ElementClass::INFRASTRUCTURE);
            let mut contexts = ContextStack::new();
            contexts.push(ExpansionFrame::new(
                Rc::new(element_type.clone()),
                Location::new(1, 1),
            ));
            Self {
                element_type,
                attributes: set,
                contexts,
                diagnostics: DiagnosticCollector::new("test.scn"),
            }
        }

        fn reader(&mut self) -> ElementReader<'_> {
            ElementReader::new(
                &self.element_type,
                &self.attributes,
                Location::new(1, 1),
                None,
                &mut self.contexts,
                &mut self.diagnostics,
            )
        }

        fn diagnostics(self) -> Vec<Diagnostic> {
            self.diagnostics.into_diagnostics()
        }
    }

    #[test]
    fn test_getters_mark_consumed() {
        let mut fixture = Fixture::new(&[("width", "2cm"), ("depth", "1"), ("color", "#fff")]);
        let mut reader = fixture.reader();

        let width = reader.get_length("width", true, 0.0, Bounds::Positive);
        let color = reader.get_color("color", false, Rgba8 { r: 0, g: 0, b: 0, a: 255 });

        assert!(approx_eq!(f64, width, 0.02));
        assert_eq!(color, Rgba8 { r: 255, g: 255, b: 255, a: 255 });
        assert_eq!(reader.consumed(), 0b101);
        assert!(fixture.diagnostics().is_empty());
    }

    #[test]
    fn test_missing_required_attribute() {
        let mut fixture = Fixture::new(&[]);
        let mut reader = fixture.reader();

        assert!(approx_eq!(f64, reader.get_float("radius", true, 1.5, Bounds::Any), 1.5));
        assert!(!reader.get_bool("visible", false, false));

        let diagnostics = fixture.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message(), "Expected attribute \"radius\"");
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E300));
        assert_eq!(diagnostics[0].location(), Location::new(1, 1));
    }

    #[test]
    fn test_invalid_format_returns_default() {
        let mut fixture = Fixture::new(&[("visible", "maybe")]);
        let mut reader = fixture.reader();

        assert!(reader.get_bool("visible", true, true));
        assert_eq!(reader.consumed(), 0b1);

        let diagnostics = fixture.diagnostics();
        assert_eq!(diagnostics[0].message(), "Invalid attribute format");
        assert_eq!(diagnostics[0].location(), Location::new(1, 10));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut fixture = Fixture::new(&[("shininess", "200"), ("count", "-1")]);
        let mut reader = fixture.reader();

        let shininess = reader.get_float(
            "shininess",
            false,
            10.0,
            Bounds::Range { min: 0.0, max: 128.0 },
        );
        let count = reader.get_integer("count", false, 3, Bounds::NonNegative);

        assert!(approx_eq!(f64, shininess, 10.0));
        assert_eq!(count, 3);
        let diagnostics = fixture.diagnostics();
        assert_eq!(
            diagnostics[0].message(),
            "Value of \"shininess\" must be between 0 and 128"
        );
        assert_eq!(diagnostics[1].message(), "Value of \"count\" must not be negative");
    }

    #[test]
    fn test_unknown_unit() {
        let mut fixture = Fixture::new(&[("value", "3lb")]);
        let mut reader = fixture.reader();

        assert!(approx_eq!(f64, reader.get_mass("value", true, 1.0, Bounds::Any), 1.0));

        let diagnostics = fixture.diagnostics();
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E303));
    }

    #[test]
    fn test_mass_must_be_positive() {
        let mut fixture = Fixture::new(&[("value", "0kg")]);
        let mut reader = fixture.reader();

        let mass = reader.get_mass("value", true, 1.0, Bounds::Any);

        assert!(approx_eq!(f64, mass, 0.0));
        let diagnostics = fixture.diagnostics();
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E304));
    }

    #[test]
    fn test_placeholders_are_substituted() {
        let mut fixture = Fixture::new(&[("radius", "$(r)")]);
        fixture.contexts.push(ExpansionFrame::new(
            Rc::new(ElementType::new("Sphere", ElementClass::INFRASTRUCTURE)),
            Location::unknown(),
        ));
        fixture.contexts.define_variable("r", "5cm");
        let mut reader = fixture.reader();

        let radius = reader.get_length("radius", true, 0.0, Bounds::Positive);

        assert!(approx_eq!(f64, radius, 0.05));
        assert!(fixture.contexts.current().unwrap().used_placeholder());
    }

    #[test]
    fn test_unterminated_placeholder() {
        let mut fixture = Fixture::new(&[("label", "$(oops")]);
        let mut reader = fixture.reader();

        assert_eq!(reader.get_string("label", true), None);
        assert_eq!(
            fixture.diagnostics()[0].message(),
            "Invalid attribute format"
        );
    }
}
