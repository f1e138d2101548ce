//! Inference backend that shells out to a configured command.
//!
//! Each call spawns the backend selected by the request's model hint, writes
//! the instruction to stdin, exports the system prompt as `BPT_SYSTEM_PROMPT`,
//! and returns stdout. A non-zero exit status or a timeout fails the call.

use super::{Inference, InferenceError, InferenceRequest};
use crate::config::EngineConfig;
use crate::error::{BptError, Result};
use crate::reference::{ReferenceKind, scan};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

/// Environment variable carrying the system prompt.
pub const SYSTEM_PROMPT_ENV: &str = "BPT_SYSTEM_PROMPT";

/// Maximum number of stderr characters quoted in an error message.
const STDERR_EXCERPT_CHARS: usize = 400;

/// Runs configured commands as the inference capability.
#[derive(Debug, Clone)]
pub struct CommandInference {
    config: EngineConfig,
}

impl CommandInference {
    /// Build from the `backends` section of the config.
    ///
    /// Returns a user error if no backend is configured.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        if config.backends.is_empty() {
            return Err(BptError::UserError(
                "no inference backends configured.\n\n\
                 Add a `backends` section to bpt.yaml, for example:\n\
                 backends:\n  \
                   default:\n    \
                     command: \"llm -m {model}\"\n\n\
                 or pass --dry-run to echo instructions instead."
                    .to_string(),
            ));
        }

        Ok(Self {
            config: config.clone(),
        })
    }
}

impl Inference for CommandInference {
    fn invoke(&self, request: &InferenceRequest<'_>) -> std::result::Result<String, InferenceError> {
        let backend = self.config.backend_for(request.model).ok_or_else(|| {
            InferenceError::Failed(format!(
                "no backend configured for model '{}'",
                request.model
            ))
        })?;

        let variables = command_variables(request);
        let command_str = render_command(&backend.command, &variables)?;
        let args = shell_words::split(&command_str).map_err(|e| {
            InferenceError::Failed(format!(
                "failed to parse backend command '{}': {}",
                command_str, e
            ))
        })?;
        let Some((program, rest)) = args.split_first() else {
            return Err(InferenceError::Failed(format!(
                "backend command is empty after parsing: '{}'",
                command_str
            )));
        };

        debug!(program = %program, model = %request.model, "spawning inference backend");

        let mut command = Command::new(program);
        command
            .args(rest)
            .env(SYSTEM_PROMPT_ENV, request.system_prompt)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &backend.environment {
            command.env(key, value);
        }

        let mut child = command
            .spawn()
            .map_err(|e| InferenceError::Spawn(format!("'{}': {}", program, e)))?;

        let stdin_writer = child.stdin.take().map(|mut stdin| {
            let instruction = request.instruction.to_string();
            thread::spawn(move || {
                // A backend that ignores stdin may close it early; that is not a failure.
                let _ = stdin.write_all(instruction.as_bytes());
            })
        });
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let timeout =
            Duration::from_secs(backend.effective_timeout(self.config.backend_timeout_seconds));
        let status = wait_with_timeout(&mut child, timeout)?;

        if let Some(handle) = stdin_writer {
            let _ = handle.join();
        }
        let stdout = join_reader(stdout_reader);
        let stderr = join_reader(stderr_reader);

        let Some(code) = status else {
            return Err(InferenceError::Timeout(timeout));
        };

        if code != 0 {
            return Err(InferenceError::Failed(format!(
                "backend '{}' exited with status {}{}",
                program,
                code,
                stderr_excerpt(&stderr)
            )));
        }

        Ok(stdout)
    }
}

fn command_variables(request: &InferenceRequest<'_>) -> HashMap<&'static str, String> {
    let image_path = request
        .image
        .and_then(|image| image.path.as_ref())
        .map(|path| path.to_string_lossy().to_string())
        .unwrap_or_default();
    let mime_type = request
        .image
        .map(|image| image.mime_type.clone())
        .unwrap_or_default();

    HashMap::from([
        ("model", request.model.to_string()),
        ("image", image_path),
        ("mime_type", mime_type),
    ])
}

/// Substitute `{placeholder}`s in a backend command.
///
/// Unlike template substitution, an unknown placeholder is an error, so a typo
/// in the config fails loudly instead of reaching the shell.
fn render_command(
    template: &str,
    variables: &HashMap<&'static str, String>,
) -> std::result::Result<String, InferenceError> {
    let mut rendered = String::with_capacity(template.len());
    let mut cursor = 0;

    for reference in scan(template) {
        if reference.kind != ReferenceKind::Agent {
            continue;
        }
        let value = variables.get(reference.name.as_str()).ok_or_else(|| {
            let mut known: Vec<_> = variables.keys().copied().collect();
            known.sort_unstable();
            InferenceError::Failed(format!(
                "backend command references undefined placeholder '{{{}}}'; available: {}",
                reference.name,
                known.join(", ")
            ))
        })?;
        rendered.push_str(&template[cursor..reference.span.start]);
        rendered.push_str(&shell_words::quote(value));
        cursor = reference.span.end;
    }

    rendered.push_str(&template[cursor..]);
    Ok(rendered)
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = source.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Wait for a child process with timeout.
///
/// Returns the exit code, or `None` if the process was killed on timeout.
/// A process terminated by a signal reports exit code `-1`.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> std::result::Result<Option<i32>, InferenceError> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(50);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status.code().unwrap_or(-1))),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Ok(None);
                }
                thread::sleep(poll_interval);
            }
            Err(e) => {
                return Err(InferenceError::Failed(format!(
                    "failed to check backend status: {}",
                    e
                )));
            }
        }
    }
}

fn stderr_excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let excerpt: String = trimmed.chars().take(STDERR_EXCERPT_CHARS).collect();
    format!(": {}", excerpt)
}
