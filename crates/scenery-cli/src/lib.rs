//! Scenery CLI library
//!
//! This module contains the core CLI logic for checking and printing
//! Scenery scene files.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::io::{self, Write};

use log::info;

use scenery::{LoadedScene, SceneError, SceneLoader};

/// Run the Scenery CLI application
///
/// This function loads the input scene with its includes and prints either
/// the entity tree or a short summary to standard output.
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `SceneError` for:
/// - Configuration loading errors
/// - Scene loading errors, with every diagnostic of the load
/// - Errors writing to standard output
pub fn run(args: &Args) -> Result<(), SceneError> {
    info!(input_path = args.input; "Loading scene");

    let app_config = config::load_config(args.config.as_ref())?;

    let loader = SceneLoader::new(app_config);
    let scene = loader.load(&args.input)?;

    let mut out = io::stdout().lock();
    write_scene(&mut out, &scene, args.tree)?;

    info!(input_path = args.input; "Scene loaded successfully");

    Ok(())
}

fn write_scene(out: &mut impl Write, scene: &LoadedScene, tree: bool) -> io::Result<()> {
    if tree {
        return write!(out, "{}", scene.render_tree());
    }

    let graph = scene.graph();
    let name = scene
        .root()
        .and_then(|root| graph.node(root).and_then(|node| node.name().map(str::to_string)));
    match name {
        Some(name) => writeln!(out, "Scene \"{name}\"")?,
        None => writeln!(out, "Scene")?,
    }
    writeln!(out, "  entities: {}", graph.node_count())?;
    writeln!(out, "  links: {}", graph.edge_count())?;
    writeln!(out, "  shared: {}", graph.shared_nodes().len())
}

#[cfg(test)]
mod tests {
    use scenery::InMemorySources;

    use super::*;

    fn load(source: &str) -> LoadedScene {
        let sources = InMemorySources::new().with_file("scene.scn", source);
        SceneLoader::default()
            .load_with("scene.scn", sources)
            .expect("scene loads")
    }

    #[test]
    fn test_write_summary() {
        let scene = load(
            r#"<Simulation>
<Axis name="x" x="1" />
<Scene name="demo">
  <Body>
    <Mass value="1" />
    <Hinge><Axis ref="x" /></Hinge>
    <Slider><Axis ref="x" /></Slider>
  </Body>
</Scene>
</Simulation>"#,
        );

        let mut out = Vec::new();
        write_scene(&mut out, &scene, false).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Scene \"demo\"\n  entities: 6\n  links: 6\n  shared: 1\n"
        );
    }

    #[test]
    fn test_write_tree() {
        let scene = load(
            r#"<Simulation><Scene name="demo" gravity="0" step="0.001s" /></Simulation>"#,
        );

        let mut out = Vec::new();
        write_scene(&mut out, &scene, true).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), scene.render_tree());
    }
}
