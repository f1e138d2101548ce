//! Exit code constants for the bpt CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unreadable files, invalid config)
//! - 2: Template validation failure (duplicate or invalid field names)
//! - 3: Agent failure (only when `--fail-on-agent-error` is set)
//! - 4: Run cancelled

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unreadable files, or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// Template validation failure: duplicate or invalid field names.
pub const VALIDATION_FAILURE: i32 = 2;

/// At least one agent field resolved to a diagnostic placeholder.
pub const AGENT_FAILURE: i32 = 3;

/// The run was cancelled between agent steps.
pub const CANCELLED: i32 = 4;
