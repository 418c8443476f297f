//! Compiler targets and components the kernel build needs.
//!
//! `rustup` is idempotent here: re-adding an installed target is a no-op.
//! A failure does not stop the run; it degrades the terminal status.

use super::report::StepOutcome;
use super::AssemblyContext;
use crate::process::{Cmd, ToolError};

/// `rustup target add <targets...>`
pub fn target_add_cmd(targets: &[String]) -> Cmd {
    Cmd::new("rustup").args(["target", "add"]).args(targets)
}

/// `rustup component add <components...>`
pub fn component_add_cmd(components: &[String]) -> Cmd {
    Cmd::new("rustup").args(["component", "add"]).args(components)
}

pub fn install(ctx: &AssemblyContext) -> StepOutcome {
    let config = &ctx.config;
    let mut failures = Vec::new();

    if !config.targets.is_empty() {
        if let Err(e) = run(target_add_cmd(&config.targets), "rustup target add failed") {
            failures.push(e);
        }
    }
    if !config.components.is_empty() {
        if let Err(e) = run(
            component_add_cmd(&config.components),
            "rustup component add failed",
        ) {
            failures.push(e);
        }
    }

    if failures.is_empty() {
        return StepOutcome::Done(format!(
            "targets [{}], components [{}]",
            config.targets.join(", "),
            config.components.join(", ")
        ));
    }

    let detail = failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    log::warn!("Could not install compiler targets: {detail}");
    StepOutcome::Warned(detail)
}

fn run(cmd: Cmd, error_msg: &str) -> Result<(), ToolError> {
    cmd.error_msg(error_msg).run_interactive().map(|_| ())
}
