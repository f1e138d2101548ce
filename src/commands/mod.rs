//! Command implementations for bpt.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the file loading they share.

mod check;
mod interrupt;
mod plan;
mod resolve;

use crate::cli::Command;
use bpt::config::EngineConfig;
use bpt::error::{BptError, Result};
use bpt::template::InputValues;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "bpt.yaml";

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Resolve(args) => resolve::cmd_resolve(args),
        Command::Plan(args) => plan::cmd_plan(args),
        Command::Check(args) => check::cmd_check(args),
    }
}

/// Load the engine config from `explicit`, else `./bpt.yaml`, else defaults.
fn load_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    let discovered = Path::new(DEFAULT_CONFIG_FILE);
    match explicit {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::load_or_default(discovered.is_file().then_some(discovered)),
    }
}

/// Merge input values from an optional YAML/JSON file and `--input` pairs.
///
/// Pairs given on the command line override values from the file.
fn collect_inputs(file: Option<&Path>, pairs: Vec<(String, String)>) -> Result<InputValues> {
    let mut values = match file {
        Some(path) => load_inputs_file(path)?,
        None => InputValues::new(),
    };
    values.extend(pairs);
    Ok(values)
}

fn load_inputs_file(path: &Path) -> Result<InputValues> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        BptError::UserError(format!(
            "failed to read inputs file '{}': {}",
            path.display(),
            e
        ))
    })?;

    // JSON objects parse as YAML flow mappings
    let raw: BTreeMap<String, Value> = serde_yaml::from_str(&content).map_err(|e| {
        BptError::UserError(format!(
            "failed to parse inputs file '{}': {}",
            path.display(),
            e
        ))
    })?;

    raw.into_iter()
        .map(|(name, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                _ => {
                    return Err(BptError::UserError(format!(
                        "input '{}' in '{}' must be a scalar value",
                        name,
                        path.display()
                    )));
                }
            };
            Ok((name, text))
        })
        .collect()
}
