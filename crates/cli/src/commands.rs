//! Clap command tree definition.

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("gcdkey")
        .about("Encode, decode and inspect Cloud Datastore key strings")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(build_encode())
        .subcommand(build_decode())
        .subcommand(build_parent())
}

fn build_encode() -> Command {
    Command::new("encode")
        .about("Build a key string from a project and a path")
        .arg(
            Arg::new("project")
                .long("project")
                .short('p')
                .required(true)
                .help("Project id"),
        )
        .arg(
            Arg::new("namespace")
                .long("namespace")
                .short('n')
                .help("Namespace id"),
        )
        .arg(
            Arg::new("path")
                .required(true)
                .num_args(1..)
                .help("Path elements as Kind:id or Kind:name, root first"),
        )
}

fn build_decode() -> Command {
    Command::new("decode")
        .about("Print the structured form of a key string")
        .arg(Arg::new("ks").required(true).help("Key string"))
}

fn build_parent() -> Command {
    Command::new("parent")
        .about("Print the key string of a key's parent")
        .arg(Arg::new("ks").required(true).help("Key string"))
}
