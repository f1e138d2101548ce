//! Implementation of the `bpt resolve` command.
//!
//! Loads a template, its inputs, and the engine config, runs the resolver
//! against the configured backends (or the echo backend with `--dry-run`),
//! and prints the final text.

use super::interrupt::cancel_on_interrupt;
use super::{collect_inputs, load_config};
use crate::cli::ResolveArgs;
use bpt::engine::{CancelToken, Resolution, Resolver};
use bpt::error::{BptError, Result};
use bpt::events::EventLog;
use bpt::inference::{CommandInference, EchoInference, ImageInput, Inference};
use bpt::template::Template;
use tracing::info;

/// Execute the `bpt resolve` command.
pub fn cmd_resolve(args: ResolveArgs) -> Result<()> {
    let fail_on_agent_error = args.fail_on_agent_error;
    let json = args.json;

    let cancel = CancelToken::new();
    cancel_on_interrupt(cancel.clone());

    let resolution = run_resolve(args, cancel)?;

    for warning in &resolution.warnings {
        eprintln!("Warning: {}", warning);
    }
    for cycle in &resolution.cycles {
        eprintln!("Warning: {}", cycle);
    }

    if json {
        let rendered = serde_json::to_string_pretty(&resolution).map_err(|e| {
            BptError::UserError(format!("failed to serialize resolution to JSON: {}", e))
        })?;
        println!("{}", rendered);
    } else {
        println!("{}", resolution.text);
    }

    check_failures(&resolution, fail_on_agent_error)
}

/// Resolve the template named by `args` without printing anything.
///
/// `cancel` stops the run before the next agent is dispatched.
fn run_resolve(args: ResolveArgs, cancel: CancelToken) -> Result<Resolution> {
    let template = Template::load(&args.template)?;
    let config = load_config(args.config.as_deref())?;
    let inputs = collect_inputs(args.inputs_file.as_deref(), args.inputs)?;
    let image = args.image.as_deref().map(ImageInput::load).transpose()?;

    // Backends are only required when something will actually be invoked
    let needs_backend = !args.dry_run && template.agent_fields().next().is_some();
    let inference: Box<dyn Inference> = if needs_backend {
        Box::new(CommandInference::from_config(&config)?)
    } else {
        Box::new(EchoInference)
    };

    info!(
        template = %args.template.display(),
        dry_run = args.dry_run,
        mode = ?config.mode,
        "resolving template"
    );

    let mut resolver = Resolver::new(inference.as_ref())
        .with_config(config)
        .with_cancel_token(cancel);
    if let Some(path) = args.events {
        resolver = resolver.with_event_log(EventLog::new(path));
    }

    resolver.resolve(&template, &inputs, image.as_ref())
}

/// Turn agent failures into an error when the caller asked for it.
fn check_failures(resolution: &Resolution, fail_on_agent_error: bool) -> Result<()> {
    if !fail_on_agent_error || !resolution.has_failures() {
        return Ok(());
    }

    let names: Vec<&str> = resolution
        .failed_agents()
        .map(|a| a.name.as_str())
        .collect();
    Err(BptError::AgentFailure {
        count: names.len(),
        names: names.join(", "),
    })
}
