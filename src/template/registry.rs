//! Field registry: validated name lookup over a template's fields.

use super::{AgentConfig, Field, InputValues, Template};
use crate::error::{BptError, Result};
use crate::reference::{Reference, ReferenceKind, is_identifier, scan};
use std::collections::{HashMap, HashSet};

/// An agent field that can be scheduled.
#[derive(Debug, Clone, Copy)]
pub struct AgentField<'a> {
    pub field: &'a Field,
    pub config: &'a AgentConfig,
}

impl<'a> AgentField<'a> {
    pub fn name(&self) -> &'a str {
        &self.field.name
    }
}

/// Lookup tables over the fields of one template.
///
/// Agents are stored in declaration order and addressed by their position,
/// which the dependency graph and scheduler use as node indices.
#[derive(Debug)]
pub struct FieldRegistry<'a> {
    inputs: Vec<&'a Field>,
    agents: Vec<AgentField<'a>>,
    input_index: HashMap<&'a str, usize>,
    agent_index: HashMap<&'a str, usize>,
    /// Agent fields that carry no agent config.
    unconfigured: Vec<&'a str>,
}

impl<'a> FieldRegistry<'a> {
    /// Build the registry, rejecting invalid or duplicate names.
    pub fn build(template: &'a Template) -> Result<Self> {
        let mut registry = FieldRegistry {
            inputs: Vec::new(),
            agents: Vec::new(),
            input_index: HashMap::new(),
            agent_index: HashMap::new(),
            unconfigured: Vec::new(),
        };
        let mut seen = HashSet::with_capacity(template.fields.len());

        for field in &template.fields {
            if !is_identifier(&field.name) {
                return Err(BptError::InvalidFieldName {
                    name: field.name.clone(),
                });
            }

            if !seen.insert(field.name.as_str()) {
                return Err(BptError::DuplicateFieldName {
                    name: field.name.clone(),
                });
            }

            if !field.is_agent() {
                registry
                    .input_index
                    .insert(&field.name, registry.inputs.len());
                registry.inputs.push(field);
                continue;
            }

            match &field.agent_config {
                Some(config) => {
                    registry
                        .agent_index
                        .insert(&field.name, registry.agents.len());
                    registry.agents.push(AgentField { field, config });
                }
                None => registry.unconfigured.push(&field.name),
            }
        }

        Ok(registry)
    }

    pub fn inputs(&self) -> &[&'a Field] {
        &self.inputs
    }

    /// Schedulable agents in declaration order.
    pub fn agents(&self) -> &[AgentField<'a>] {
        &self.agents
    }

    pub fn has_agents(&self) -> bool {
        !self.agents.is_empty()
    }

    pub fn input(&self, name: &str) -> Option<&'a Field> {
        self.input_index.get(name).map(|&i| self.inputs[i])
    }

    pub fn agent(&self, name: &str) -> Option<AgentField<'a>> {
        self.agent_index.get(name).map(|&i| self.agents[i])
    }

    /// Position of an agent in declaration order.
    pub fn agent_position(&self, name: &str) -> Option<usize> {
        self.agent_index.get(name).copied()
    }

    /// Names of agent fields skipped because they have no agent config.
    pub fn unconfigured_agents(&self) -> &[&'a str] {
        &self.unconfigured
    }

    /// Resolve the caller's values for every input field.
    ///
    /// A value keyed by the field name wins over one keyed by the field id.
    /// Inputs without a value resolve to the empty string.
    pub fn input_values(&self, values: &InputValues) -> HashMap<String, String> {
        self.inputs
            .iter()
            .map(|field| {
                let value = values
                    .get(&field.name)
                    .or_else(|| values.get(field.id()))
                    .cloned()
                    .unwrap_or_default();
                (field.name.clone(), value)
            })
            .collect()
    }

    /// References in `text` that no field will replace.
    ///
    /// A slash reference needs an input field of that name and a brace
    /// reference a configured agent field; anything else stays literal.
    pub fn unresolved_references(&self, text: &str) -> Vec<Reference> {
        scan(text)
            .into_iter()
            .filter(|r| match r.kind {
                ReferenceKind::Input => self.input(&r.name).is_none(),
                ReferenceKind::Agent => self.agent(&r.name).is_none(),
            })
            .collect()
    }
}
