//! Scenery - loader for hierarchical scene descriptions.
//!
//! Scene files describe rigid-body scenes as nested markup elements with
//! reusable named definitions, file includes and `$(variable)` placeholders.
//! This crate wires the `scenery-parser` engine to a configurable element
//! schema and collects the result in a [`SceneGraph`](graph::SceneGraph).

pub mod config;
pub mod graph;
pub mod schema;

mod error;

pub use scenery_core::{entity, location, quantity};
pub use scenery_parser::{Diagnostic, ErrorCode, FileSystem, InMemorySources, Severity, SourceProvider};

pub use error::SceneError;

use std::path::Path;

use log::{debug, info};
use petgraph::graph::NodeIndex;

use scenery_parser::{ParseError, Parser};

use config::AppConfig;
use graph::{SceneGraph, SceneNode};

/// A successfully loaded scene.
#[derive(Debug)]
pub struct LoadedScene {
    graph: SceneGraph,
    root: Option<NodeIndex>,
    diagnostics: Vec<Diagnostic>,
}

impl LoadedScene {
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The node of the scene element.
    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    /// Diagnostics that did not make the load fail.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The scene as an indented outline, empty when there is no scene node.
    pub fn render_tree(&self) -> String {
        self.root
            .map(|root| self.graph.render_tree(root))
            .unwrap_or_default()
    }
}

/// Builder for loading Scenery scene files.
///
/// # Examples
///
/// ```rust,no_run
/// use scenery::{SceneLoader, config::AppConfig};
///
/// let loader = SceneLoader::new(AppConfig::default());
/// let scene = loader.load("robot.scn").expect("Failed to load");
/// println!("{}", scene.render_tree());
/// ```
#[derive(Debug, Default)]
pub struct SceneLoader {
    config: AppConfig,
}

impl SceneLoader {
    /// Create a new scene loader with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Load the scene file at `path` from disk.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Config`] for an inconsistent schema and
    /// [`SceneError::Parse`] with every diagnostic when at least one error
    /// was reported.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadedScene, SceneError> {
        self.load_with(path, FileSystem)
    }

    /// Load the scene file at `path`, reading files from `sources`.
    ///
    /// # Errors
    ///
    /// See [`SceneLoader::load`].
    pub fn load_with(
        &self,
        path: impl AsRef<Path>,
        sources: impl SourceProvider,
    ) -> Result<LoadedScene, SceneError> {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading scene file");

        let graph = SceneGraph::new();
        let registry = self.config.schema().build_registry(&graph)?;
        let report = Parser::new(&registry)
            .with_sources(sources)
            .with_max_include_depth(self.config.loader().max_include_depth())
            .load(path);

        if !report.is_success() {
            let root_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            return Err(SceneError::new_parse_error(
                ParseError::new(report.diagnostics().to_vec()),
                root_dir,
            ));
        }

        let root = report
            .scene()
            .and_then(SceneNode::from_entity)
            .map(SceneNode::id);
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count();
            "Scene graph built"
        );
        Ok(LoadedScene {
            graph,
            root,
            diagnostics: report.diagnostics().to_vec(),
        })
    }
}
