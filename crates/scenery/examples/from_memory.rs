//! Example: Loading a scene from in-memory sources
//!
//! This example loads a small scene with an include and a shared definition
//! without touching the file system, then prints the entity tree.

use scenery::{InMemorySources, SceneLoader};

const SCENE: &str = r#"<Simulation>
  <Include href="parts/bolt.scn" />
  <Scene name="bracket">
    <Body name="plate">
      <BoxMass value="1.2kg" width="20cm" height="1cm" depth="10cm" />
      <Set name="spacing" value="8cm" />
      <Body ref="bolt">
        <Translation x="$(spacing)" />
      </Body>
      <Body ref="bolt">
        <Translation x="-$(spacing)" />
      </Body>
    </Body>
  </Scene>
</Simulation>
"#;

const BOLT: &str = r#"<Simulation>
  <Body name="bolt">
    <SphereMass value="20g" radius="5mm" />
    <Cylinder radius="5mm" height="3cm">
      <Appearance>
        <Texture file="textures/steel.png" />
      </Appearance>
    </Cylinder>
  </Body>
</Simulation>
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading scene from memory...\n");

    let sources = InMemorySources::new()
        .with_file("bracket.scn", SCENE)
        .with_file("parts/bolt.scn", BOLT);

    let scene = SceneLoader::default().load_with("bracket.scn", sources)?;
    let graph = scene.graph();

    println!("{}", scene.render_tree());
    println!(
        "{} entities, {} links, {} shared",
        graph.node_count(),
        graph.edge_count(),
        graph.shared_nodes().len()
    );

    Ok(())
}
