//! Configuration types and defaults for bpt.
//!
//! This module defines enums, constants, and default value functions
//! used by the EngineConfig struct.

use crate::template::DEFAULT_MODEL_HINT;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Backend key used when no backend matches a model hint.
pub const FALLBACK_BACKEND: &str = "default";

/// How agents are dispatched within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One agent at a time, in execution order (default).
    #[default]
    Sequential,
    /// Independent agents in parallel waves. Requires the `concurrent` feature.
    Concurrent,
}

impl ExecutionMode {
    /// Parse an execution mode from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sequential" => Some(Self::Sequential),
            "concurrent" => Some(Self::Concurrent),
            _ => None,
        }
    }
}

/// System prompts sent along with each agent instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemPrompts {
    /// Used when the run has an image attached.
    pub analysis: String,
    /// Used for text-only runs.
    pub creative: String,
}

impl Default for SystemPrompts {
    fn default() -> Self {
        Self {
            analysis: default_analysis_prompt(),
            creative: default_creative_prompt(),
        }
    }
}

impl SystemPrompts {
    /// Pick the prompt matching whether an image is present.
    pub fn select(&self, has_image: bool) -> &str {
        if has_image {
            &self.analysis
        } else {
            &self.creative
        }
    }
}

/// An external command that answers inference requests.
///
/// The instruction is written to the command's stdin and its stdout is the
/// result. Placeholders in `command`:
///
/// - `{model}` - Model hint of the agent field
/// - `{image}` - Path of the shared image, empty when there is none
/// - `{mime_type}` - MIME type of the shared image, empty when there is none
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendProfile {
    pub command: String,

    /// Timeout in seconds (overrides `backend_timeout_seconds` if set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    /// Environment variables to set for the backend process.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,
}

impl BackendProfile {
    /// Get the effective timeout for this backend.
    pub fn effective_timeout(&self, default_seconds: u64) -> u64 {
        self.timeout_seconds.unwrap_or(default_seconds)
    }
}

pub fn default_model() -> String {
    DEFAULT_MODEL_HINT.to_string()
}

pub fn default_max_workers() -> usize {
    4
}

pub fn default_backend_timeout_seconds() -> u64 {
    120
}

pub fn default_analysis_prompt() -> String {
    "You are an AI analysis agent.\n\
     Your task is to analyze the image based on the user's specific instruction \
     and extract/generate the relevant information.\n\
     Output Rule: Return ONLY the result string. Do not include labels, markdown, \
     or conversational filler. Keep it concise and suitable for use in an image \
     generation prompt."
        .to_string()
}

pub fn default_creative_prompt() -> String {
    "You are an AI creative agent.\n\
     Your task is to generate creative content based on the user's instruction.\n\
     Output Rule: Return ONLY the result string. Do not include labels, markdown, \
     or conversational filler. Keep it concise and suitable for use in an image \
     generation prompt."
        .to_string()
}
