//! Implementation of the `bpt plan` command.
//!
//! Prints the order agents would run in, what each one waits for, and
//! which agents could share a wave in concurrent mode.

use crate::cli::PlanArgs;
use bpt::engine::{Plan, plan};
use bpt::error::{BptError, Result};
use bpt::template::Template;
use std::fmt::Write;

/// Execute the `bpt plan` command.
pub fn cmd_plan(args: PlanArgs) -> Result<()> {
    let template = Template::load(&args.template)?;
    let plan = plan(&template)?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&plan).map_err(|e| {
            BptError::UserError(format!("failed to serialize plan to JSON: {}", e))
        })?;
        println!("{}", rendered);
    } else {
        print!("{}", render_plan(&plan));
    }

    Ok(())
}

/// Human-readable rendering of a plan.
fn render_plan(plan: &Plan) -> String {
    let mut out = String::new();

    if plan.order.is_empty() {
        out.push_str("No agent fields; only inputs will be substituted.\n");
    } else {
        out.push_str("Execution order:\n");
        for (i, name) in plan.order.iter().enumerate() {
            let deps = plan
                .dependencies
                .iter()
                .find(|(agent, _)| agent == name)
                .map(|(_, deps)| deps.as_slice())
                .unwrap_or_default();
            if deps.is_empty() {
                let _ = writeln!(out, "  {:>2}. {}", i + 1, name);
            } else {
                let _ = writeln!(out, "  {:>2}. {} <- {}", i + 1, name, deps.join(", "));
            }
        }

        out.push_str("\nWaves:\n");
        for (i, wave) in plan.waves.iter().enumerate() {
            let _ = writeln!(out, "  {:>2}: {}", i + 1, wave.join(", "));
        }
    }

    if !plan.cycles.is_empty() {
        out.push_str("\nCycles:\n");
        for cycle in &plan.cycles {
            let _ = writeln!(out, "  {}", cycle);
        }
    }

    if !plan.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for warning in &plan.warnings {
            let _ = writeln!(out, "  {}", warning);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpt::template::Field;

    #[test]
    fn test_render_plan_lists_order_and_waves() {
        let template = Template::new("")
            .with_field(Field::agent("story", "{hero} meets {villain}"))
            .with_field(Field::agent("hero", "a hero"))
            .with_field(Field::agent("villain", "a villain"));
        let rendered = render_plan(&plan(&template).unwrap());

        assert!(rendered.contains("1. hero\n"));
        assert!(rendered.contains("2. villain\n"));
        assert!(rendered.contains("3. story <- hero, villain\n"));
        assert!(rendered.contains("1: hero, villain\n"));
        assert!(rendered.contains("2: story\n"));
        assert!(!rendered.contains("Cycles:"));
    }

    #[test]
    fn test_render_plan_reports_cycles() {
        let template = Template::new("")
            .with_field(Field::agent("a", "{b}"))
            .with_field(Field::agent("b", "{a}"));
        let rendered = render_plan(&plan(&template).unwrap());

        assert!(rendered.contains("Cycles:"));
        assert!(rendered.contains("'b' references 'a'"));
    }

    #[test]
    fn test_render_plan_without_agents() {
        let template = Template::new("/x").with_field(Field::input("x"));
        let rendered = render_plan(&plan(&template).unwrap());
        assert!(rendered.starts_with("No agent fields"));
    }
}
