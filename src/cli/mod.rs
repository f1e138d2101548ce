//! CLI argument parsing for bpt.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// bpt: resolve blueprint prompt templates.
///
/// A template is a base text with references to fields:
/// - `/name` refers to an input field, filled from `--input name=value`
/// - `{name}` refers to an agent field, whose instruction is sent to an
///   inference backend and replaced by the answer
#[derive(Parser, Debug)]
#[command(name = "bpt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for bpt.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a template into its final text.
    ///
    /// Runs every agent field in dependency order through the configured
    /// backends, then substitutes inputs and agent results into the prompt.
    Resolve(ResolveArgs),

    /// Show the execution plan of a template without running anything.
    ///
    /// Lists agents in execution order with their dependencies, parallel
    /// waves, and any dependency cycles.
    Plan(PlanArgs),

    /// Validate a template.
    ///
    /// Checks field names and reports references that will stay literal.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Template file (.yaml, .yml or .json).
    pub template: PathBuf,

    /// Input value as NAME=VALUE; NAME may be the field name or id.
    #[arg(short, long = "input", value_name = "NAME=VALUE", value_parser = parse_input)]
    pub inputs: Vec<(String, String)>,

    /// YAML or JSON file mapping input names to values.
    #[arg(long, value_name = "PATH")]
    pub inputs_file: Option<PathBuf>,

    /// Image attached to every agent call.
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Engine configuration (defaults to ./bpt.yaml when present).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Append run events to this NDJSON file.
    #[arg(long, value_name = "PATH")]
    pub events: Option<PathBuf>,

    /// Echo instructions instead of calling backends.
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with an error if any agent failed.
    #[arg(long)]
    pub fail_on_agent_error: bool,

    /// Print the full resolution as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    pub template: PathBuf,

    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    pub template: PathBuf,

    /// Treat unresolved references as errors.
    #[arg(long)]
    pub strict: bool,
}

/// Parse a `NAME=VALUE` pair. The value may itself contain `=`.
fn parse_input(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing input name in '{}'", raw));
    }
    Ok((name.to_string(), value.to_string()))
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
