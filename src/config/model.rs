//! EngineConfig struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for template resolution.
///
/// This struct represents the contents of `bpt.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
///
/// ```yaml
/// default_model: gemini-2.5-flash
/// mode: sequential
/// max_workers: 4
/// backend_timeout_seconds: 120
/// system_prompts:
///   creative: "You are an AI creative agent."
/// backends:
///   default:
///     command: "llm -m {model}"
///   gemini-3-pro-preview:
///     command: "llm -m gemini-3-pro-preview -a {image}"
///     timeout_seconds: 300
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // =========================================================================
    // Agent settings
    // =========================================================================
    /// Model hint used for agent fields whose config leaves it empty.
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default)]
    pub system_prompts: SystemPrompts,

    // =========================================================================
    // Execution settings
    // =========================================================================
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Upper bound on simultaneous inference calls in concurrent mode.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    // =========================================================================
    // Backend settings
    // =========================================================================
    /// Timeout applied to backends that do not set their own.
    #[serde(default = "default_backend_timeout_seconds")]
    pub backend_timeout_seconds: u64,

    /// Command backends keyed by model hint; `default` is the fallback.
    #[serde(default)]
    pub backends: BTreeMap<String, BackendProfile>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            system_prompts: SystemPrompts::default(),
            mode: ExecutionMode::default(),
            max_workers: default_max_workers(),
            backend_timeout_seconds: default_backend_timeout_seconds(),
            backends: BTreeMap::new(),
        }
    }
}
