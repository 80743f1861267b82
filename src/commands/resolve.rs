//! # Resolve Command Implementation
//!
//! Prints the canonical view of a resource class: the remote form when the
//! environment is sync-enabled and the remote answers, the local store
//! otherwise, merged according to the class's policy.
//!
//! This command is read-only.

use anyhow::Result;
use clap::Args;

use strata::suggestions;
use strata::sync::ResourceClass;

use super::{Context, OutputFormat, ScopeArgs};

/// Print the canonical view of a resource class
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Resource class (schemas, media/tree, content, forms)
    #[arg(value_name = "CLASS")]
    pub class: String,

    /// Only print the item with this id
    #[arg(long, value_name = "ID")]
    pub id: Option<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

/// Look up a resource class by name, with a suggestion when unknown
pub fn resource_class(name: &str) -> Result<ResourceClass> {
    ResourceClass::named(name).ok_or_else(|| suggestions::unknown_resource_class(name))
}

/// Execute the `resolve` command.
pub fn execute(args: ResolveArgs, ctx: &Context) -> Result<()> {
    let class = resource_class(&args.class)?;
    let engine = ctx.engine()?;
    let scope = args.scope.scope();

    let rendered = match &args.id {
        Some(id) => {
            let item = engine
                .resolve_item(&scope, &class, id)
                .map_err(suggestions::explain)?;
            args.format.render(&item)?
        }
        None => {
            let items = engine.resolve(&scope, &class).map_err(suggestions::explain)?;
            args.format.render(&items)?
        }
    };
    println!("{}", rendered);
    Ok(())
}
