//! Run event log for bpt.
//!
//! Each resolution run can append an audit trail in NDJSON format (one JSON
//! object per line) to a caller-chosen file. The log records what the engine
//! dispatched and how each agent ended, so a run containing diagnostic
//! placeholders can be traced afterwards.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: The action performed (run_start, agent_dispatch, ...)
//! - `actor`: The owner string (e.g., `user@HOST`)
//! - `field`: Optional agent field name for field-specific events
//! - `details`: Freeform object with action-specific details
//!
//! # Usage
//!
//! ```no_run
//! use bpt::events::{Event, EventAction, EventLog};
//! use serde_json::json;
//!
//! let log = EventLog::new("run.ndjson");
//! let event = Event::new(EventAction::RunStart).with_details(json!({"agents": 3}));
//! log.append(&event)?;
//! # Ok::<(), bpt::error::BptError>(())
//! ```

use crate::error::{BptError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Resolution started
    RunStart,
    /// A dependency cycle was broken
    CycleDetected,
    /// Inference call started for an agent
    AgentDispatch,
    /// Agent resolved successfully
    AgentComplete,
    /// Agent resolved to a diagnostic placeholder
    AgentFailed,
    /// Final text assembled
    RunComplete,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::RunStart => write!(f, "run_start"),
            EventAction::CycleDetected => write!(f, "cycle_detected"),
            EventAction::AgentDispatch => write!(f, "agent_dispatch"),
            EventAction::AgentComplete => write!(f, "agent_complete"),
            EventAction::AgentFailed => write!(f, "agent_failed"),
            EventAction::RunComplete => write!(f, "run_complete"),
        }
    }
}

/// An event record for the run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    pub action: EventAction,

    /// The actor who ran the resolution (e.g., `user@HOST`).
    pub actor: String,

    /// Agent field name for field-specific events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    pub details: Value,
}

impl Event {
    /// Create a new event with the given action.
    ///
    /// The timestamp is set to the current time, and the actor is
    /// determined from the environment (USER@HOSTNAME).
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            field: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the agent field name for this event.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| BptError::UserError(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// Get the actor string for event metadata.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append-only NDJSON event file.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an event as a single JSON line.
    ///
    /// The file and its parent directory are created if they don't exist.
    pub fn append(&self, event: &Event) -> Result<()> {
        let json_line = event.to_ndjson_line()?;

        if let Some(parent) = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty() && !p.exists())
        {
            fs::create_dir_all(parent).map_err(|e| {
                BptError::UserError(format!(
                    "failed to create events directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                BptError::UserError(format!(
                    "failed to open events file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", json_line).map_err(|e| {
            BptError::UserError(format!(
                "failed to write event to '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Read back every event in the file.
    pub fn read_all(&self) -> Result<Vec<Event>> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            BptError::UserError(format!(
                "failed to read events file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| {
                    BptError::UserError(format!("failed to parse event line: {}", e))
                })
            })
            .collect()
    }
}
