//! Command-line argument definitions for the Scenery CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the scene file, the configuration file,
//! the logging verbosity and how the loaded scene is printed.

use clap::Parser;

/// Command-line arguments for the Scenery scene loader
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the root scene file
    #[arg(help = "Path to the scene file")]
    pub input: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Print the loaded entity tree instead of a summary
    #[arg(short, long)]
    pub tree: bool,
}
