//! Agent executor.
//!
//! Walks the execution order, substitutes each agent's instruction against
//! the inputs and the results gathered so far, and invokes the inference
//! capability. A failed call is captured as a diagnostic placeholder in the
//! resolution context so the run carries on.

use super::{AgentOutcome, AgentStatus, Resolver, diagnostic};
use crate::config::ExecutionMode;
use crate::error::{BptError, Result};
use crate::events::{Event, EventAction};
use crate::graph::{DependencyGraph, Schedule};
use crate::inference::{ImageInput, InferenceRequest};
use crate::reference::substitute;
use crate::template::{AgentField, FieldRegistry};
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

/// Resolved agent results keyed by field name.
pub(super) type ResolutionContext = HashMap<String, String>;

/// Everything one run needs besides the graph.
pub(super) struct AgentRun<'r> {
    pub resolver: &'r Resolver<'r>,
    pub registry: &'r FieldRegistry<'r>,
    pub inputs: &'r HashMap<String, String>,
    pub image: Option<&'r ImageInput>,
}

impl<'r> AgentRun<'r> {
    /// Run every scheduled agent and return the populated context and outcomes.
    #[cfg_attr(not(feature = "concurrent"), allow(unused_variables))]
    pub(super) fn execute(
        &self,
        graph: &DependencyGraph,
        schedule: &Schedule,
    ) -> Result<(ResolutionContext, Vec<AgentOutcome>)> {
        match self.resolver.config.mode {
            ExecutionMode::Sequential => self.execute_sequential(schedule),
            #[cfg(feature = "concurrent")]
            ExecutionMode::Concurrent => self.execute_concurrent(graph, schedule),
            #[cfg(not(feature = "concurrent"))]
            ExecutionMode::Concurrent => {
                warn!("concurrent mode requires the 'concurrent' feature; running sequentially");
                self.execute_sequential(schedule)
            }
        }
    }

    /// One blocking call at a time, strictly in execution order.
    fn execute_sequential(
        &self,
        schedule: &Schedule,
    ) -> Result<(ResolutionContext, Vec<AgentOutcome>)> {
        let mut context = ResolutionContext::with_capacity(schedule.order.len());
        let mut outcomes = Vec::with_capacity(schedule.order.len());

        for &node in &schedule.order {
            let agent = self.registry.agents()[node];
            self.check_cancelled(agent)?;
            self.record_dispatch(agent);

            let outcome = self.run_agent(agent, &context);
            self.record_outcome(&outcome);
            context.insert(outcome.name.clone(), outcome.output.clone());
            outcomes.push(outcome);
        }

        Ok((context, outcomes))
    }

    /// Independent agents in parallel, one wave at a time.
    ///
    /// Each wave is split into batches of at most `max_workers` agents that run
    /// on scoped threads. Results are merged into the context only after the
    /// batch completes, so every agent sees the same context it would see in a
    /// sequential run.
    #[cfg(feature = "concurrent")]
    fn execute_concurrent(
        &self,
        graph: &DependencyGraph,
        schedule: &Schedule,
    ) -> Result<(ResolutionContext, Vec<AgentOutcome>)> {
        let max_workers = self.resolver.config.max_workers.max(1);
        let mut context = ResolutionContext::with_capacity(graph.len());
        let mut outcomes = Vec::with_capacity(graph.len());

        for wave in schedule.waves(graph) {
            for batch in wave.chunks(max_workers) {
                let agents: Vec<AgentField<'r>> =
                    batch.iter().map(|&node| self.registry.agents()[node]).collect();

                if let Some(first) = agents.first() {
                    self.check_cancelled(*first)?;
                }
                for &agent in &agents {
                    self.record_dispatch(agent);
                }

                let batch_outcomes: Vec<AgentOutcome> = std::thread::scope(|scope| {
                    let context = &context;
                    let handles: Vec<_> = agents
                        .iter()
                        .map(|&agent| scope.spawn(move || self.run_agent(agent, context)))
                        .collect();

                    handles
                        .into_iter()
                        .zip(&agents)
                        .map(|(handle, &agent)| {
                            handle.join().unwrap_or_else(|_| {
                                self.failed_outcome(
                                    agent,
                                    self.instruction_for(agent, context),
                                    "inference worker panicked".to_string(),
                                    0,
                                )
                            })
                        })
                        .collect()
                });

                for outcome in batch_outcomes {
                    self.record_outcome(&outcome);
                    context.insert(outcome.name.clone(), outcome.output.clone());
                    outcomes.push(outcome);
                }
            }
        }

        Ok((context, outcomes))
    }

    fn check_cancelled(&self, next: AgentField<'_>) -> Result<()> {
        if self.resolver.cancel.is_cancelled() {
            warn!(next = next.name(), "resolution cancelled");
            return Err(BptError::Cancelled {
                next: next.name().to_string(),
            });
        }
        Ok(())
    }

    fn instruction_for(&self, agent: AgentField<'_>, context: &ResolutionContext) -> String {
        substitute(&agent.config.instruction, self.inputs, context)
    }

    fn model_for<'m>(&'m self, agent: AgentField<'m>) -> &'m str {
        self.resolver.config.effective_model(&agent.config.model)
    }

    /// Substitute, invoke, and capture the result of one agent.
    fn run_agent(&self, agent: AgentField<'_>, context: &ResolutionContext) -> AgentOutcome {
        let instruction = self.instruction_for(agent, context);
        let model = self.model_for(agent);
        let system_prompt = self
            .resolver
            .config
            .system_prompts
            .select(self.image.is_some());

        debug!(field = agent.name(), model, "dispatching agent");

        let started = Instant::now();
        let result = self.resolver.inference.invoke(&InferenceRequest {
            instruction: &instruction,
            model,
            system_prompt,
            image: self.image,
        });
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(text) => AgentOutcome {
                name: agent.name().to_string(),
                model: model.to_string(),
                instruction,
                status: AgentStatus::Succeeded,
                output: text.trim().to_string(),
                error: None,
                duration_ms,
            },
            Err(e) => self.failed_outcome(agent, instruction, e.to_string(), duration_ms),
        }
    }

    fn failed_outcome(
        &self,
        agent: AgentField<'_>,
        instruction: String,
        message: String,
        duration_ms: u64,
    ) -> AgentOutcome {
        warn!(field = agent.name(), error = %message, "agent failed; substituting diagnostic");
        AgentOutcome {
            name: agent.name().to_string(),
            model: self.model_for(agent).to_string(),
            instruction,
            status: AgentStatus::Failed,
            output: diagnostic(&message),
            error: Some(message),
            duration_ms,
        }
    }

    fn record_dispatch(&self, agent: AgentField<'_>) {
        self.resolver.record(
            Event::new(EventAction::AgentDispatch)
                .with_field(agent.name())
                .with_details(json!({ "model": self.model_for(agent) })),
        );
    }

    fn record_outcome(&self, outcome: &AgentOutcome) {
        let action = match outcome.status {
            AgentStatus::Succeeded => EventAction::AgentComplete,
            AgentStatus::Failed => EventAction::AgentFailed,
        };
        self.resolver.record(
            Event::new(action)
                .with_field(&outcome.name)
                .with_details(json!({
                    "model": outcome.model,
                    "duration_ms": outcome.duration_ms,
                    "error": outcome.error,
                })),
        );
    }
}
