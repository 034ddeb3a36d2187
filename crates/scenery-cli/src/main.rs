//! Scenery CLI entry point.

use std::{
    io::{self, IsTerminal, Write},
    process::ExitCode,
    str::FromStr,
};

use clap::Parser;
use log::{LevelFilter, debug, error, info};
use miette::{GraphicalReportHandler, GraphicalTheme};

use scenery::SceneError;
use scenery_cli::{Args, error_adapter::to_reportables};

fn main() -> ExitCode {
    miette::set_panic_hook();
    let args = Args::parse();
    init_logger(&args.log_level);

    info!(input = args.input.as_str(), tree = args.tree; "Checking scene");
    debug!(args:?; "Parsed arguments");

    match scenery_cli::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn init_logger(level: &str) {
    let filter = LevelFilter::from_str(level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {level}. Using 'warn' instead.");
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(filter)
        .init();
}

/// Print every diagnostic of `err` to stderr, whatever the log level.
fn report(err: &SceneError) {
    let stderr = io::stderr();
    let theme = if stderr.is_terminal() {
        GraphicalTheme::unicode()
    } else {
        GraphicalTheme::unicode_nocolor()
    };
    let handler = GraphicalReportHandler::new_themed(theme);

    let reportables = to_reportables(err);
    error!(diagnostics = reportables.len(); "Scene did not load");

    let mut out = stderr.lock();
    for reportable in &reportables {
        let mut rendered = String::new();
        if handler.render_report(&mut rendered, reportable).is_err() {
            rendered = reportable.to_string();
        }
        // Nothing left to report to if stderr is gone.
        let _ = writeln!(out, "{rendered}");
    }
}
