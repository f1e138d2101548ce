//! BP template model.
//!
//! A template is a base prompt plus an ordered list of fields. Input fields are
//! filled in by the caller; agent fields are produced by running an inference
//! call with the field's instruction.
//!
//! # File Format
//!
//! ```yaml
//! title: Character sheet
//! prompt: "Portrait of /subject, {style}"
//! fields:
//!   - name: subject
//!     type: input
//!   - name: style
//!     type: agent
//!     agent_config:
//!       instruction: "Suggest an art style for /subject"
//!       model: gemini-2.5-flash
//! ```
//!
//! The camelCase keys written by the template editor (`bpFields`,
//! `agentConfig`) are accepted as aliases.

mod registry;


pub use registry::{AgentField, FieldRegistry};

use crate::error::{BptError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Model hint used when an agent config does not name one.
pub const DEFAULT_MODEL_HINT: &str = "gemini-2.5-flash";

/// Caller-supplied input values, keyed by field name or field id.
pub type InputValues = BTreeMap<String, String>;

/// Whether a field is filled by the caller or by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Input,
    Agent,
}

/// Configuration of an agent field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// The rule given to the agent. May reference `/inputs` and `{agents}`.
    pub instruction: String,

    /// Opaque hint selecting the inference variant.
    #[serde(default = "default_model_hint")]
    pub model: String,
}

fn default_model_hint() -> String {
    DEFAULT_MODEL_HINT.to_string()
}

/// A named placeholder in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Stable identifier; falls back to `name` when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Variable name without prefix, e.g. `role` for `/role` or `{role}`.
    pub name: String,

    /// Display label; falls back to `name` when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(
        default,
        alias = "agentConfig",
        skip_serializing_if = "Option::is_none"
    )]
    pub agent_config: Option<AgentConfig>,
}

impl Field {
    /// Create an input field.
    pub fn input(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            label: String::new(),
            field_type: FieldType::Input,
            agent_config: None,
        }
    }

    /// Create an agent field using the default model hint.
    pub fn agent(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            label: String::new(),
            field_type: FieldType::Agent,
            agent_config: Some(AgentConfig {
                instruction: instruction.into(),
                model: default_model_hint(),
            }),
        }
    }

    /// Set the model hint of an agent field. No effect on input fields.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        if let Some(config) = self.agent_config.as_mut() {
            config.model = model.into();
        }
        self
    }

    /// Set the field id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        if self.id.is_empty() {
            &self.name
        } else {
            &self.id
        }
    }

    pub fn label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    pub fn is_agent(&self) -> bool {
        self.field_type == FieldType::Agent
    }
}

/// A reusable prompt blueprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Base text containing references.
    pub prompt: String,

    #[serde(alias = "bpFields")]
    pub fields: Vec<Field>,
}

impl Template {
    /// Create a template with no fields.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            prompt: prompt.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Iterate over agent fields in declaration order.
    pub fn agent_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_agent())
    }

    /// Iterate over input fields in declaration order.
    pub fn input_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_agent())
    }

    /// Load a template file. `.json` files are parsed as JSON, anything else as YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            BptError::UserError(format!(
                "failed to read template '{}': {}",
                path.display(),
                e
            ))
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Parse a template from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| BptError::UserError(format!("failed to parse template YAML: {}", e)))
    }

    /// Parse a template from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| BptError::UserError(format!("failed to parse template JSON: {}", e)))
    }

    /// Serialize the template to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            BptError::UserError(format!("failed to serialize template to YAML: {}", e))
        })
    }
}
