//! Implementation of the `bpt check` command.
//!
//! Validates field names and lists references that resolution would leave
//! as literal text, in the base prompt and in every agent instruction.

use crate::cli::CheckArgs;
use bpt::error::{BptError, Result};
use bpt::graph::{DependencyGraph, schedule};
use bpt::template::{FieldRegistry, Template};

/// A reference no field will replace.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Unresolved {
    /// `prompt` or `agent 'name'`.
    location: String,
    literal: String,
}

#[derive(Debug, Default)]
struct CheckReport {
    unresolved: Vec<Unresolved>,
    warnings: Vec<String>,
}

/// Execute the `bpt check` command.
pub fn cmd_check(args: CheckArgs) -> Result<()> {
    let template = Template::load(&args.template)?;
    let report = check_template(&template)?;

    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }
    for item in &report.unresolved {
        println!(
            "unresolved reference {} in {} (will stay literal)",
            item.literal, item.location
        );
    }

    if report.unresolved.is_empty() {
        println!(
            "{}: OK ({} field(s))",
            args.template.display(),
            template.fields.len()
        );
        return Ok(());
    }

    if args.strict {
        return Err(BptError::UnresolvedReferences {
            count: report.unresolved.len(),
        });
    }
    Ok(())
}

fn check_template(template: &Template) -> Result<CheckReport> {
    let registry = FieldRegistry::build(template)?;
    let mut report = CheckReport::default();

    for name in registry.unconfigured_agents() {
        report.warnings.push(format!(
            "agent field '{}' has no agent config and will not be resolved",
            name
        ));
    }

    let graph = DependencyGraph::build(&registry);
    for cycle in schedule(&graph).cycles {
        report.warnings.push(cycle.to_string());
    }

    let sources = std::iter::once(("prompt".to_string(), template.prompt.as_str())).chain(
        registry
            .agents()
            .iter()
            .map(|a| (format!("agent '{}'", a.name()), a.config.instruction.as_str())),
    );
    for (location, text) in sources {
        for reference in registry.unresolved_references(text) {
            report.unresolved.push(Unresolved {
                location: location.clone(),
                literal: reference.literal(),
            });
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpt::exit_codes;
    use bpt::template::Field;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_clean_template() {
        let template = Template::new("/role in {style}")
            .with_field(Field::input("role"))
            .with_field(Field::agent("style", "style for /role"));
        let report = check_template(&template).unwrap();

        assert!(report.unresolved.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_reports_unresolved_by_location() {
        let template = Template::new("{missing} /role")
            .with_field(Field::input("role"))
            .with_field(Field::agent("style", "uses /ghost and {role}"));
        let report = check_template(&template).unwrap();

        assert_eq!(
            report.unresolved,
            vec![
                Unresolved {
                    location: "prompt".to_string(),
                    literal: "{missing}".to_string(),
                },
                Unresolved {
                    location: "agent 'style'".to_string(),
                    literal: "/ghost".to_string(),
                },
                Unresolved {
                    location: "agent 'style'".to_string(),
                    literal: "{role}".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_reports_cycles_as_warnings() {
        let template = Template::new("")
            .with_field(Field::agent("a", "{b}"))
            .with_field(Field::agent("b", "{a}"));
        let report = check_template(&template).unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("dependency cycle"));
    }

    #[test]
    fn test_structural_errors_propagate() {
        let template = Template::new("").with_field(Field::input("9lives"));
        let err = check_template(&template).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::VALIDATION_FAILURE);
    }

    #[test]
    fn test_strict_mode_fails_on_unresolved() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("t.yaml");
        std::fs::write(&path, "prompt: \"{nobody}\"\n").unwrap();

        let lenient = CheckArgs {
            template: path.clone(),
            strict: false,
        };
        assert!(cmd_check(lenient).is_ok());

        let strict = CheckArgs {
            template: path,
            strict: true,
        };
        let err = cmd_check(strict).unwrap_err();
        assert!(matches!(err, BptError::UnresolvedReferences { count: 1 }));
    }

    #[test]
    fn test_missing_template_file() {
        let args = CheckArgs {
            template: PathBuf::from("/nonexistent/t.yaml"),
            strict: true,
        };
        assert_eq!(cmd_check(args).unwrap_err().exit_code(), exit_codes::USER_ERROR);
    }
}
