//! Error types for bpt.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Agent-level inference failures are not represented here: they are captured
//! as diagnostic text inside the resolution (see [`crate::inference::InferenceError`]).

use crate::exit_codes;
use thiserror::Error;

/// Main error type for bpt operations.
#[derive(Error, Debug)]
pub enum BptError {
    /// User provided invalid arguments, files, or configuration.
    #[error("{0}")]
    UserError(String),

    /// Two fields in one template share a name.
    #[error("Template validation failed: duplicate field name '{name}'")]
    DuplicateFieldName { name: String },

    /// A field name is empty or not identifier-safe.
    #[error(
        "Template validation failed: invalid field name '{name}' \
         (names must match [A-Za-z_][A-Za-z0-9_]*)"
    )]
    InvalidFieldName { name: String },

    /// `bpt check --strict` found references that would stay literal.
    #[error("Template validation failed: {count} unresolved reference(s)")]
    UnresolvedReferences { count: usize },

    /// One or more agents failed and the caller asked for that to be fatal.
    #[error("{count} agent field(s) failed: {names}")]
    AgentFailure { count: usize, names: String },

    /// The run was cancelled between agent steps.
    #[error("Resolution cancelled before agent '{next}' was dispatched")]
    Cancelled { next: String },
}

impl BptError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            BptError::UserError(_) => exit_codes::USER_ERROR,
            BptError::DuplicateFieldName { .. }
            | BptError::InvalidFieldName { .. }
            | BptError::UnresolvedReferences { .. } => exit_codes::VALIDATION_FAILURE,
            BptError::AgentFailure { .. } => exit_codes::AGENT_FAILURE,
            BptError::Cancelled { .. } => exit_codes::CANCELLED,
        }
    }

    /// Whether this error was raised before any agent was dispatched.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            BptError::DuplicateFieldName { .. } | BptError::InvalidFieldName { .. }
        )
    }
}

/// Result type alias for bpt operations.
pub type Result<T> = std::result::Result<T, BptError>;
