//! Reference scanning for BP template text.
//!
//! Instructions and base prompts refer to other fields with two forms:
//!
//! - `/name` - an input field reference
//! - `{name}` - an agent field reference
//!
//! where `name` matches `[A-Za-z_][A-Za-z0-9_]*`. There is no escape syntax.
//!
//! Scanning is purely syntactic: whether a name actually denotes a field of the
//! matching kind is decided later, at substitution time. Unknown references are
//! passed through as literal text.

mod substitute;

pub use substitute::substitute;

use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use std::sync::LazyLock;

/// Pattern matching either an input (`/name`) or an agent (`{name}`) reference.
static REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/([A-Za-z_][A-Za-z0-9_]*)|\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .expect("Invalid reference regex")
});

/// Pattern for a bare field name.
static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid identifier regex")
});

/// Which kind of field a reference may resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// `/name`
    Input,
    /// `{name}`
    Agent,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Input => write!(f, "input"),
            ReferenceKind::Agent => write!(f, "agent"),
        }
    }
}

/// A single parsed reference occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub name: String,
    /// Byte range of the whole occurrence, delimiters included.
    pub span: Range<usize>,
}

impl Reference {
    /// Render the reference back in template syntax.
    pub fn literal(&self) -> String {
        match self.kind {
            ReferenceKind::Input => format!("/{}", self.name),
            ReferenceKind::Agent => format!("{{{}}}", self.name),
        }
    }
}

/// Distinct referenced names, in order of first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    pub inputs: Vec<String>,
    pub agents: Vec<String>,
}

impl References {
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.agents.is_empty()
    }
}

/// Check whether `name` is usable as a field name.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_REGEX.is_match(name)
}

/// Scan `text` for every reference occurrence, left to right.
///
/// Matches never overlap; a `/` inside braces (`{a/b}`) yields the input
/// reference `/b` and no agent reference.
pub fn scan(text: &str) -> Vec<Reference> {
    REFERENCE_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let (kind, name) = match (caps.get(1), caps.get(2)) {
                (Some(m), _) => (ReferenceKind::Input, m.as_str()),
                (None, Some(m)) => (ReferenceKind::Agent, m.as_str()),
                (None, None) => return None,
            };
            Some(Reference {
                kind,
                name: name.to_string(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Extract the distinct input and agent names referenced by `text`.
///
/// Duplicates are collapsed; order is that of first occurrence.
pub fn extract_references(text: &str) -> References {
    let mut refs = References::default();

    for reference in scan(text) {
        let bucket = match reference.kind {
            ReferenceKind::Input => &mut refs.inputs,
            ReferenceKind::Agent => &mut refs.agents,
        };
        if !bucket.contains(&reference.name) {
            bucket.push(reference.name);
        }
    }

    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_inputs_and_agents() {
        let refs = extract_references("Describe /subject in the style of {style}.");
        assert_eq!(refs.inputs, vec!["subject"]);
        assert_eq!(refs.agents, vec!["style"]);
    }

    #[test]
    fn test_extract_collapses_duplicates_in_first_occurrence_order() {
        let refs = extract_references("{b} /y {a} /x {b} /y");
        assert_eq!(refs.inputs, vec!["y", "x"]);
        assert_eq!(refs.agents, vec!["b", "a"]);
    }

    #[test]
    fn test_extract_plain_text() {
        let refs = extract_references("no references here");
        assert!(refs.is_empty());
    }

    #[test]
    fn test_identifier_rule() {
        let refs = extract_references("/9lives /_ok {2bad} {good_1} { spaced }");
        assert_eq!(refs.inputs, vec!["_ok"]);
        assert_eq!(refs.agents, vec!["good_1"]);
    }

    #[test]
    fn test_name_stops_at_non_identifier_char() {
        let refs = extract_references("/role-play and /mood.");
        assert_eq!(refs.inputs, vec!["role", "mood"]);
    }

    #[test]
    fn test_slash_inside_braces_is_input_reference() {
        let refs = extract_references("{a/b}");
        assert_eq!(refs.inputs, vec!["b"]);
        assert!(refs.agents.is_empty());
    }

    #[test]
    fn test_url_paths_are_syntactic_input_references() {
        let refs = extract_references("see https://example.com/docs");
        assert_eq!(refs.inputs, vec!["example", "docs"]);
    }

    #[test]
    fn test_scan_spans_and_literals() {
        let text = "a /x b {Y}";
        let refs = scan(text);
        assert_eq!(refs.len(), 2);

        assert_eq!(refs[0].kind, ReferenceKind::Input);
        assert_eq!(&text[refs[0].span.clone()], "/x");
        assert_eq!(refs[0].literal(), "/x");

        assert_eq!(refs[1].kind, ReferenceKind::Agent);
        assert_eq!(&text[refs[1].span.clone()], "{Y}");
        assert_eq!(refs[1].literal(), "{Y}");
    }

    #[test]
    fn test_unicode_text_around_references() {
        let refs = scan("风格: {style} 主体: /subject");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "style");
        assert_eq!(refs[1].name, "subject");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("role"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2nd"));
        assert!(!is_identifier("my-field"));
        assert!(!is_identifier("{x}"));
        assert!(!is_identifier("/x"));
    }
}
