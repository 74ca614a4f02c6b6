//! ArgMatches → CliAction conversion.

use clap::ArgMatches;
use gcdkit_core::{Identifier, Key, Path, PathElement};

/// The result of parsing the command line.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Build and print a key string
    Encode(Key),
    /// Print the structured form of a key string
    Decode(String),
    /// Print the parent of a key string
    Parent(String),
}

/// Translate parsed arguments into an action.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    match matches.subcommand() {
        Some(("encode", sub)) => parse_encode(sub),
        Some(("decode", sub)) => Ok(CliAction::Decode(required(sub, "ks")?)),
        Some(("parent", sub)) => Ok(CliAction::Parent(required(sub, "ks")?)),
        Some((other, _)) => Err(format!("unknown command: {}", other)),
        None => Err("no command given".to_string()),
    }
}

fn required(matches: &ArgMatches, name: &str) -> Result<String, String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .ok_or_else(|| format!("missing argument: {}", name))
}

fn parse_encode(matches: &ArgMatches) -> Result<CliAction, String> {
    let project = required(matches, "project")?;
    let namespace = matches.get_one::<String>("namespace").cloned();
    let elements = matches
        .get_many::<String>("path")
        .ok_or_else(|| "missing argument: path".to_string())?
        .map(|s| parse_element(s))
        .collect::<Result<Vec<_>, _>>()?;
    let path = Path::new(elements).map_err(|e| e.to_string())?;
    Ok(CliAction::Encode(Key::new(project, namespace, path)))
}

/// Parse `Kind:id` or `Kind:name`.
///
/// An identifier made only of ASCII digits, optionally after a leading `-`,
/// is a numeric id; anything else is a name.
pub fn parse_element(s: &str) -> Result<PathElement, String> {
    let (kind, ident) = s
        .split_once(':')
        .ok_or_else(|| format!("expected Kind:id or Kind:name, got '{}'", s))?;
    if kind.is_empty() {
        return Err(format!("empty kind in '{}'", s));
    }
    if ident.is_empty() {
        return Err(format!("empty identifier in '{}'", s));
    }
    Ok(PathElement::new(kind, parse_identifier(ident)?))
}

fn parse_identifier(s: &str) -> Result<Identifier, String> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        let id = s
            .parse::<i64>()
            .map_err(|_| format!("id out of range: {}", s))?;
        Ok(Identifier::Id(id))
    } else {
        Ok(Identifier::Name(s.to_string()))
    }
}
