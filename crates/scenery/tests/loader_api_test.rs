//! Integration tests for the SceneLoader API.

use std::fs;

use float_cmp::approx_eq;
use tempfile::tempdir;

use scenery::{
    InMemorySources, SceneError, SceneLoader,
    config::{AppConfig, LoaderConfig},
    graph::Value,
    schema::Schema,
};

const ROBOT: &str = r##"<?xml version="1.0"?>
<Simulation>
  <Include href="parts/wheel.scn" />

  <Scene name="robot" gravity="9.81m/s²">
    <Description>Two wheeled robot</Description>
    <Body name="chassis">
      <BoxMass value="4kg" width="40cm" height="10cm" depth="30cm" />
      <Box width="40cm" height="10cm" depth="30cm" color="#336699" />
      <Set name="offset" value="20cm" />
      <Hinge>
        <Axis x="1" />
        <Translation x="$(offset)" />
        <Body ref="wheel" />
      </Hinge>
      <Hinge>
        <Axis x="1" />
        <Translation x="-$(offset)" />
        <Body ref="wheel" />
      </Hinge>
    </Body>
  </Scene>
</Simulation>
"##;

const WHEEL: &str = r#"<Simulation>
  <Body name="wheel">
    <SphereMass value="500g" radius="5cm" />
    <Cylinder radius="5cm" height="2cm">
      <Appearance>
        <Texture file="textures/rubber.png" />
      </Appearance>
    </Cylinder>
  </Body>
</Simulation>
"#;

#[test]
fn test_load_from_disk() {
    let dir = tempdir().expect("Failed to create temp directory");
    fs::create_dir_all(dir.path().join("parts")).unwrap();
    fs::write(dir.path().join("robot.scn"), ROBOT).unwrap();
    fs::write(dir.path().join("parts/wheel.scn"), WHEEL).unwrap();

    let loader = SceneLoader::default();
    let scene = loader
        .load(dir.path().join("robot.scn"))
        .expect("Failed to load scene");
    let graph = scene.graph();

    let root = scene.root().expect("Scene has a root node");
    let node = graph.node(root).unwrap();
    assert_eq!(node.element(), "Scene");
    assert_eq!(node.name(), Some("robot"));

    let description = graph.find("Description")[0];
    assert_eq!(
        graph.node(description).unwrap().text(),
        Some("Two wheeled robot")
    );

    // Both wheels share their mass and cylinder, the translations differ.
    assert_eq!(graph.find("Body").len(), 3);
    let masses = graph.find("SphereMass");
    assert_eq!(masses.len(), 1);
    assert_eq!(graph.parents(masses[0]).len(), 2);
    assert_eq!(graph.find("Cylinder").len(), 1);

    let offsets: Vec<f64> = graph
        .find("Translation")
        .into_iter()
        .filter_map(|id| graph.node(id).unwrap().property("x").and_then(Value::as_f64))
        .collect();
    assert_eq!(offsets.len(), 2);
    assert!(approx_eq!(f64, offsets[0], 0.2));
    assert!(approx_eq!(f64, offsets[1], -0.2));

    let texture = graph.find("Texture")[0];
    assert_eq!(
        graph.node(texture).unwrap().property("file"),
        Some(&Value::String("parts/textures/rubber.png".to_string()))
    );

    assert!(scene.render_tree().starts_with("Scene \"robot\""));
    assert!(scene.diagnostics().is_empty());
}

#[test]
fn test_defaults_are_applied() {
    let sources = InMemorySources::new().with_file(
        "scene.scn",
        r#"<Simulation><Scene name="empty" /></Simulation>"#,
    );

    let scene = SceneLoader::default()
        .load_with("scene.scn", sources)
        .unwrap();
    let graph = scene.graph();
    let root = graph.node(scene.root().unwrap()).unwrap();

    assert_eq!(root.property("gravity"), Some(&Value::Float(9.81)));
    assert_eq!(root.property("step"), Some(&Value::Float(0.01)));
}

#[test]
fn test_errors_are_collected() {
    let sources = InMemorySources::new().with_file(
        "broken.scn",
        r#"<Simulation>
<Scene name="broken">
  <Body>
    <Sphere radius="-1" />
  </Body>
  <Body ref="missing" />
</Scene>
</Simulation>"#,
    );

    let err = SceneLoader::default()
        .load_with("broken.scn", sources)
        .unwrap_err();

    let SceneError::Parse { err, .. } = err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert_eq!(
        err.messages(),
        vec![
            "broken.scn:4:13: error: Value of \"radius\" must be positive",
            "broken.scn:3:3: error: Expected one of the elements \"BoxMass\", \"Mass\", \"SphereMass\" as child",
            "broken.scn:6:9: error: Unresolvable reference \"missing\"",
        ]
    );
}

#[test]
fn test_custom_schema_from_config() {
    let config: AppConfig = toml::from_str(
        r#"
        [loader]
        max_include_depth = 2

        [schema]
        scene = "World"

        [[schema.elements]]
        name = "World"
        class = "world"
        repeatable = ["item"]

        [[schema.elements]]
        name = "Lamp"
        class = "item"

        [[schema.elements.attributes]]
        name = "on"
        kind = "bool"
        default = "off"
        "#,
    )
    .unwrap();
    let sources = InMemorySources::new().with_file(
        "world.scn",
        r#"<Simulation>
<Lamp name="reading" on="true" />
<World name="home">
  <Lamp ref="reading" />
  <Lamp />
</World>
</Simulation>"#,
    );

    let scene = SceneLoader::new(config)
        .load_with("world.scn", sources)
        .unwrap();
    let graph = scene.graph();
    let lamps: Vec<Option<Value>> = graph
        .find("Lamp")
        .into_iter()
        .map(|id| graph.node(id).unwrap().property("on").cloned())
        .collect();

    assert_eq!(lamps, vec![Some(Value::Bool(true)), Some(Value::Bool(false))]);
}

#[test]
fn test_empty_schema_uses_builtin() {
    let config = AppConfig::new(LoaderConfig::default(), Schema::new("Missing", Vec::new()));
    let sources = InMemorySources::new().with_file("scene.scn", "<Simulation />");

    // An empty element list falls back to the built-in schema, whose scene
    // element is named "Scene".
    let result = SceneLoader::new(config).load_with("scene.scn", sources);

    assert!(matches!(result, Err(SceneError::Parse { .. })));
}
