//! Template resolution engine.
//!
//! [`Resolver::resolve`] runs one complete resolution pass over a template:
//!
//! 1. Validate field names and index fields ([`FieldRegistry`])
//! 2. Build the agent dependency graph ([`DependencyGraph`])
//! 3. Order agents, breaking cycles ([`schedule`])
//! 4. Substitute and invoke each agent in order ([`executor`])
//! 5. Substitute inputs and agent results into the base prompt
//!
//! Agent failures never abort a run. A failed agent resolves to a diagnostic
//! placeholder (`[agent error: ...]`) that flows into dependent instructions and
//! the final text like any other value. Only structural problems (invalid or
//! duplicate field names) and cancellation are returned as errors.
//!
//! No state survives a run: the graph, the order, and the resolution context
//! are built inside `resolve` and dropped when it returns.

mod cancel;
mod executor;


pub use cancel::CancelToken;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::events::{Event, EventAction, EventLog};
use crate::graph::{CycleWarning, DependencyGraph, schedule};
use crate::inference::{ImageInput, Inference};
use crate::reference::substitute;
use crate::template::{FieldRegistry, InputValues, Template};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, warn};

/// Marker opening every diagnostic placeholder.
pub const DIAGNOSTIC_PREFIX: &str = "[agent error: ";

/// Build the placeholder stored in place of a failed agent's result.
pub fn diagnostic(message: &str) -> String {
    format!("{}{}]", DIAGNOSTIC_PREFIX, message)
}

/// Whether `text` contains at least one diagnostic placeholder.
pub fn contains_diagnostic(text: &str) -> bool {
    text.contains(DIAGNOSTIC_PREFIX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Succeeded,
    Failed,
}

/// What happened to one agent field during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentOutcome {
    pub name: String,
    /// Effective model hint the call was made with.
    pub model: String,
    /// Instruction after substitution, as sent to the inference capability.
    pub instruction: String,
    pub status: AgentStatus,
    /// Trimmed result text, or the diagnostic placeholder on failure.
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl AgentOutcome {
    pub fn is_success(&self) -> bool {
        self.status == AgentStatus::Succeeded
    }
}

/// Result of resolving one template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// The finalized text.
    pub text: String,
    /// Agent names in the order they were executed.
    pub order: Vec<String>,
    pub agents: Vec<AgentOutcome>,
    /// Back-edges skipped to break dependency cycles.
    pub cycles: Vec<CycleWarning>,
    /// Non-fatal template problems (e.g. agent fields without config).
    pub warnings: Vec<String>,
}

impl Resolution {
    /// Agents that resolved to a diagnostic placeholder.
    pub fn failed_agents(&self) -> impl Iterator<Item = &AgentOutcome> {
        self.agents.iter().filter(|a| !a.is_success())
    }

    pub fn has_failures(&self) -> bool {
        self.failed_agents().next().is_some()
    }

    /// Result text of an agent by name.
    pub fn agent_output(&self, name: &str) -> Option<&str> {
        self.agents
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.output.as_str())
    }
}

/// Static analysis of a template: what a run would execute, and in which order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub order: Vec<String>,
    /// Each agent with the agents it depends on, in declaration order.
    pub dependencies: Vec<(String, Vec<String>)>,
    /// Groups of agents that may run in parallel, in execution order.
    pub waves: Vec<Vec<String>>,
    pub cycles: Vec<CycleWarning>,
    pub warnings: Vec<String>,
}

/// Compute the execution plan of a template without invoking anything.
pub fn plan(template: &Template) -> Result<Plan> {
    let registry = FieldRegistry::build(template)?;
    let graph = DependencyGraph::build(&registry);
    let schedule = schedule(&graph);

    let names = |nodes: &[usize]| -> Vec<String> {
        nodes.iter().map(|&n| graph.name(n).to_string()).collect()
    };

    Ok(Plan {
        order: names(schedule.order.as_slice()),
        dependencies: (0..graph.len())
            .map(|n| (graph.name(n).to_string(), names(graph.dependencies(n))))
            .collect(),
        waves: schedule.waves(&graph).iter().map(|w| names(w.as_slice())).collect(),
        cycles: schedule.cycles,
        warnings: unconfigured_warnings(&registry),
    })
}

fn unconfigured_warnings(registry: &FieldRegistry<'_>) -> Vec<String> {
    registry
        .unconfigured_agents()
        .iter()
        .map(|name| {
            format!(
                "agent field '{}' has no agent config and will not be resolved",
                name
            )
        })
        .collect()
}

/// Resolves templates against one inference capability.
pub struct Resolver<'a> {
    inference: &'a dyn Inference,
    config: EngineConfig,
    cancel: CancelToken,
    events: Option<EventLog>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver with the default configuration.
    pub fn new(inference: &'a dyn Inference) -> Self {
        Self {
            inference,
            config: EngineConfig::default(),
            cancel: CancelToken::new(),
            events: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `token` to cancel runs between agent steps.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Append run events to `log`.
    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.events = Some(log);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve `template` into its final text.
    ///
    /// # Arguments
    ///
    /// * `template` - The blueprint; not modified
    /// * `inputs` - Values for input fields, keyed by field name or id
    /// * `image` - Optional image shared by every agent call
    ///
    /// # Returns
    ///
    /// * `Ok(Resolution)` - Always, unless the template is structurally invalid
    ///   or the run was cancelled. Failed agents appear as diagnostic
    ///   placeholders in the text and as failed outcomes.
    /// * `Err(BptError::DuplicateFieldName | InvalidFieldName)` - Before any call
    /// * `Err(BptError::Cancelled)` - The cancel token fired between agents
    pub fn resolve(
        &self,
        template: &Template,
        inputs: &InputValues,
        image: Option<&ImageInput>,
    ) -> Result<Resolution> {
        let registry = FieldRegistry::build(template)?;
        let input_values = registry.input_values(inputs);

        let mut resolution = Resolution {
            warnings: unconfigured_warnings(&registry),
            ..Default::default()
        };
        for warning in &resolution.warnings {
            warn!("{}", warning);
        }

        if !registry.has_agents() {
            resolution.text = substitute(&template.prompt, &input_values, &HashMap::new());
            return Ok(resolution);
        }

        let graph = DependencyGraph::build(&registry);
        let schedule = schedule(&graph);

        self.record(Event::new(EventAction::RunStart).with_details(json!({
            "title": template.title,
            "agents": graph.len(),
            "inputs": registry.inputs().len(),
            "has_image": image.is_some(),
            "mode": self.config.mode,
        })));
        for cycle in &schedule.cycles {
            self.record(
                Event::new(EventAction::CycleDetected)
                    .with_field(&cycle.field)
                    .with_details(json!({ "dependency": cycle.dependency })),
            );
        }

        let run = executor::AgentRun {
            resolver: self,
            registry: &registry,
            inputs: &input_values,
            image,
        };
        let (context, outcomes) = run.execute(&graph, &schedule)?;

        resolution.text = substitute(&template.prompt, &input_values, &context);
        resolution.order = outcomes.iter().map(|o| o.name.clone()).collect();
        resolution.agents = outcomes;
        resolution.cycles = schedule.cycles;

        let failed = resolution.failed_agents().count();
        info!(
            agents = resolution.agents.len(),
            failed,
            cycles = resolution.cycles.len(),
            "template resolved"
        );
        self.record(Event::new(EventAction::RunComplete).with_details(json!({
            "agents": resolution.agents.len(),
            "failed": failed,
            "cycles": resolution.cycles.len(),
        })));

        Ok(resolution)
    }

    /// Append an event if a log is configured. Write failures are logged, never raised.
    fn record(&self, event: Event) {
        if let Some(log) = &self.events {
            if let Err(e) = log.append(&event) {
                warn!(action = %event.action, "failed to record run event: {}", e);
            }
        }
    }
}
