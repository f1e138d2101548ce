use crate::engine::CancelToken;
use crate::inference::{Inference, InferenceError, InferenceRequest};
use crate::template::{Field, Template};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// One call as seen by [`ScriptedInference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedCall {
    pub instruction: String,
    pub model: String,
    pub system_prompt: String,
    pub has_image: bool,
}

/// Test double for the inference capability.
///
/// Echoes the instruction unless a canned response or failure is registered
/// for it, and records every call.
#[derive(Default)]
pub(crate) struct ScriptedInference {
    responses: HashMap<String, String>,
    failures: HashSet<String>,
    cancel_after: Option<(usize, CancelToken)>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedInference {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, instruction: &str, output: &str) -> Self {
        self.responses
            .insert(instruction.to_string(), output.to_string());
        self
    }

    pub(crate) fn fail_on(mut self, instruction: &str) -> Self {
        self.failures.insert(instruction.to_string());
        self
    }

    /// Fire `token` once `calls` calls have completed.
    pub(crate) fn cancel_after(mut self, calls: usize, token: CancelToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    pub(crate) fn instructions(&self) -> Vec<String> {
        self.lock().iter().map(|c| c.instruction.clone()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Inference for ScriptedInference {
    fn invoke(&self, request: &InferenceRequest<'_>) -> Result<String, InferenceError> {
        let made = {
            let mut calls = self.lock();
            calls.push(RecordedCall {
                instruction: request.instruction.to_string(),
                model: request.model.to_string(),
                system_prompt: request.system_prompt.to_string(),
                has_image: request.image.is_some(),
            });
            calls.len()
        };

        if let Some((after, token)) = &self.cancel_after {
            if made >= *after {
                token.cancel();
            }
        }

        if self.failures.contains(request.instruction) {
            return Err(InferenceError::Failed(format!(
                "quota exceeded for '{}'",
                request.instruction
            )));
        }

        Ok(self
            .responses
            .get(request.instruction)
            .cloned()
            .unwrap_or_else(|| request.instruction.to_string()))
    }
}

/// Template with the given prompt and fields.
pub(crate) fn template(prompt: &str, fields: Vec<Field>) -> Template {
    fields
        .into_iter()
        .fold(Template::new(prompt), |template, field| template.with_field(field))
}

/// Input values from `(name, value)` pairs.
pub(crate) fn inputs(pairs: &[(&str, &str)]) -> crate::template::InputValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
