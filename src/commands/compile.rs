//! # Compile Command Implementation
//!
//! Compiles one schema (or all of them with `--all`) and prints the compiled
//! view. Inherited tabs and fields carry an `inheritedFrom` marker.
//!
//! This command is read-only.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;

use strata::suggestions;

use super::{Context, OutputFormat, ScopeArgs};

/// Compile a schema against its ancestor chain
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Id of the schema to compile
    #[arg(value_name = "SCHEMA", required_unless_present = "all")]
    pub schema: Option<String>,

    /// Compile every schema of the environment
    #[arg(long, conflicts_with = "schema")]
    pub all: bool,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

/// Execute the `compile` command.
pub fn execute(args: CompileArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let scope = args.scope.scope();

    if args.all {
        let mut compiled = BTreeMap::new();
        let mut failures = Vec::new();
        for (id, result) in engine.compile_all(&scope).map_err(suggestions::explain)? {
            match result {
                Ok(schema) => {
                    compiled.insert(id, schema);
                }
                Err(e) => failures.push(format!("{}: {}", id, e)),
            }
        }
        println!("{}", args.format.render(&compiled)?);
        if !failures.is_empty() {
            anyhow::bail!(
                "{} schema(s) failed to compile:\n  {}",
                failures.len(),
                failures.join("\n  ")
            );
        }
        return Ok(());
    }

    let id = args
        .schema
        .ok_or_else(|| anyhow::anyhow!("A schema id or --all is required"))?;
    let compiled = engine.compile(&scope, &id).map_err(suggestions::explain)?;
    println!("{}", args.format.render(&compiled)?);
    Ok(())
}
