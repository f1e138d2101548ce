//! Literal, single-pass reference substitution.
//!
//! Each reference in the source text is looked up exactly once. Replacement
//! values are copied verbatim and never rescanned, so a value that itself
//! contains `/name` or `{name}` is inserted as-is.

use super::REFERENCE_REGEX;
use regex::Captures;
use std::collections::HashMap;

/// Replace known references in `text`.
///
/// # Arguments
///
/// * `text` - Instruction or base prompt containing references
/// * `inputs` - Value for every known input field, keyed by field name
/// * `agents` - Result for every agent field resolved so far, keyed by field name
///
/// A `/name` reference is replaced only if `name` is a key of `inputs`, a
/// `{name}` reference only if `name` is a key of `agents`. Anything else,
/// including agents that have not been resolved yet, is left untouched.
pub fn substitute(
    text: &str,
    inputs: &HashMap<String, String>,
    agents: &HashMap<String, String>,
) -> String {
    REFERENCE_REGEX
        .replace_all(text, |caps: &Captures| {
            let value = match (caps.get(1), caps.get(2)) {
                (Some(name), _) => inputs.get(name.as_str()),
                (None, Some(name)) => agents.get(name.as_str()),
                (None, None) => None,
            };
            match value {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
