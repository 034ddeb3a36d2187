//! The built-in rigid-body vocabulary.

use super::{AttributeKind, AttributeSchema, ElementSchema};

pub(super) const SCENE: &str = "Scene";

fn attribute(name: &str, kind: AttributeKind) -> AttributeSchema {
    AttributeSchema::new(name, kind)
}

fn vector(element: ElementSchema, kind: AttributeKind) -> ElementSchema {
    ["x", "y", "z"].into_iter().fold(element, |element, axis| {
        element.with_attribute(attribute(axis, kind).with_default("0"))
    })
}

fn extents(element: ElementSchema) -> ElementSchema {
    ["width", "height", "depth"]
        .into_iter()
        .fold(element, |element, name| {
            element.with_attribute(attribute(name, AttributeKind::Length).required().positive())
        })
}

fn geometry(name: &str) -> ElementSchema {
    ElementSchema::new(name, "geometry")
        .cacheable()
        .with_optional(["appearance"])
        .with_attribute(attribute("color", AttributeKind::Color))
}

fn mass(name: &str) -> ElementSchema {
    ElementSchema::new(name, "mass")
        .cacheable()
        .with_attribute(attribute("value", AttributeKind::Mass).required())
}

fn joint(name: &str, limit: AttributeKind) -> ElementSchema {
    ElementSchema::new(name, "joint")
        .with_required(["axis"])
        .with_repeatable(["variable", "transform", "body"])
        .with_attribute(attribute("min", limit))
        .with_attribute(attribute("max", limit))
        .with_attribute(
            attribute("friction", AttributeKind::Float)
                .non_negative()
                .with_default("0"),
        )
}

pub(super) fn elements() -> Vec<ElementSchema> {
    vec![
        ElementSchema::new(SCENE, "scene")
            .with_optional(["description"])
            .with_repeatable(["variable", "body", "compound", "joint"])
            .with_attribute(
                attribute("gravity", AttributeKind::Acceleration).with_default("9.81"),
            )
            .with_attribute(
                attribute("step", AttributeKind::Time)
                    .positive()
                    .with_default("0.01"),
            ),
        ElementSchema::new("Set", "variable").variable(),
        ElementSchema::new("Description", "description").with_text(),
        ElementSchema::new("Compound", "compound")
            .cacheable()
            .with_optional(["description"])
            .with_repeatable(["variable", "body", "compound", "geometry", "transform"]),
        ElementSchema::new("Body", "body")
            .with_required(["mass"])
            .with_optional(["appearance", "description"])
            .with_repeatable(["variable", "geometry", "transform", "joint", "body"])
            .with_attribute(attribute("velocity", AttributeKind::Velocity).with_default("0")),
        mass("Mass"),
        extents(mass("BoxMass")),
        mass("SphereMass")
            .with_attribute(attribute("radius", AttributeKind::Length).required().positive()),
        extents(geometry("Box")),
        geometry("Sphere")
            .with_attribute(attribute("radius", AttributeKind::Length).required().positive()),
        geometry("Cylinder")
            .with_attribute(attribute("radius", AttributeKind::Length).required().positive())
            .with_attribute(attribute("height", AttributeKind::Length).required().positive()),
        ElementSchema::new("Appearance", "appearance")
            .cacheable()
            .with_optional(["surface", "texture"]),
        ElementSchema::new("Surface", "surface")
            .cacheable()
            .with_attribute(attribute("diffuse", AttributeKind::Color).with_default("#808080"))
            .with_attribute(attribute("specular", AttributeKind::Color).with_default("#000"))
            .with_attribute(
                attribute("shininess", AttributeKind::Float)
                    .with_range(0.0, 128.0)
                    .with_default("0"),
            ),
        ElementSchema::new("Texture", "texture")
            .cacheable()
            .with_path("file")
            .with_attribute(
                attribute("scale", AttributeKind::Scale)
                    .positive()
                    .with_default("1"),
            ),
        vector(ElementSchema::new("Translation", "transform"), AttributeKind::Length),
        vector(ElementSchema::new("Rotation", "transform"), AttributeKind::Angle),
        joint("Hinge", AttributeKind::Angle),
        joint("Slider", AttributeKind::Length),
        vector(ElementSchema::new("Axis", "axis").cacheable(), AttributeKind::Float),
    ]
}
