//! # Validate Command Implementation
//!
//! Checks every schema of an environment and reports:
//!
//! - inheritance cycles and missing ancestors (errors),
//! - field schemas whose editor is not registered (warnings),
//! - fields placed on tabs that no schema in the chain defines (warnings).
//!
//! With `--strict`, warnings fail the command too. This command is read-only.

use anyhow::Result;
use clap::Args;

use strata::engine::{Severity, ValidationReport};
use strata::output::{emphasis, OutputConfig, Status};
use strata::suggestions;

use super::{Context, ScopeArgs};

/// Check every schema of an environment for broken chains
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Use strict validation (fail on warnings).
    #[arg(long)]
    pub strict: bool,
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let scope = args.scope.scope();
    let out = &ctx.output;

    println!("Validating schemas of {}", emphasis(out, &scope.to_string()));
    let report = engine.validate(&scope).map_err(suggestions::explain)?;
    print_report(out, &report);

    if report.is_ok(args.strict) {
        Ok(())
    } else if args.strict && report.errors().next().is_none() {
        anyhow::bail!("Validation failed: warnings are errors in strict mode")
    } else {
        anyhow::bail!("Validation failed")
    }
}

fn print_report(out: &OutputConfig, report: &ValidationReport) {
    for issue in &report.issues {
        let status = match issue.severity {
            Severity::Error => Status::Error,
            Severity::Warning => Status::Warning,
        };
        println!("{} {}", status.marker(out), issue);
    }

    let errors = report.errors().count();
    let warnings = report.warnings().count();
    let status = if errors > 0 {
        Status::Error
    } else if warnings > 0 {
        Status::Warning
    } else {
        Status::Ok
    };
    println!(
        "{} {} schema(s) checked: {} error(s), {} warning(s)",
        status.marker(out),
        report.checked,
        errors,
        warnings
    );
}
