//! gcdkey: inspect Cloud Datastore key strings.
//!
//! - `gcdkey encode --project P [--namespace N] Kind:id ...` prints a key string
//! - `gcdkey decode KS` prints the structured form
//! - `gcdkey parent KS` prints the parent's key string
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

mod commands;
mod format;
mod parse;

use std::process;

use gcdkit_core::Key;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{format_decoded, format_error, format_ks, OutputMode};
use parse::{matches_to_action, CliAction};

fn main() {
    init_logging();

    let matches = build_cli().get_matches();
    let mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let exit_code = match matches_to_action(&matches).and_then(|action| run(action, mode)) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            1
        }
    };
    process::exit(exit_code);
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(action: CliAction, mode: OutputMode) -> Result<String, String> {
    debug!(target: "gcdkit::cli", ?action, "Running command");
    match action {
        CliAction::Encode(key) => {
            let ks = key.ks().map_err(|e| e.to_string())?;
            Ok(format_ks(&key, ks, mode))
        }
        CliAction::Decode(ks) => {
            let key = Key::from_ks(&ks).map_err(|e| e.to_string())?;
            Ok(format_decoded(&key, mode))
        }
        CliAction::Parent(ks) => {
            let key = Key::from_ks(&ks).map_err(|e| e.to_string())?;
            let parent = key.get_parent().map_err(|e| e.to_string())?;
            let parent_ks = parent.ks().map_err(|e| e.to_string())?;
            Ok(format_ks(&parent, parent_ks, mode))
        }
    }
}
