//! # Set-Item Command Implementation
//!
//! Writes or deletes a single item of a resource class, routed the same way
//! editors route their writes: to the remote when it accepts the write, to
//! the local store otherwise.
//!
//! Schemas go through the schema write path, which rejects locked schemas
//! and writes that would close an inheritance cycle. Media items are
//! normalized onto their folder before being written.

use anyhow::{Context as _, Result};
use clap::{ArgGroup, Args};
use serde_json::Value;

use strata::engine::Engine;
use strata::error::Error;
use strata::output::Status;
use strata::schema::Schema;
use strata::store::Scope;
use strata::suggestions;
use strata::sync::{ResourceClass, WriteOutcome};
use strata::tree::TreeItem;

use super::resolve::resource_class;
use super::{Context, ScopeArgs};

/// Write or delete a single item of a resource class
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("action").required(true).args(["json", "delete"])))]
pub struct SetItemArgs {
    /// Resource class (schemas, media/tree, content, forms)
    #[arg(value_name = "CLASS")]
    pub class: String,

    /// Id of the item
    #[arg(value_name = "ID")]
    pub id: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// JSON document to store under the id
    #[arg(long, value_name = "DOC")]
    pub json: Option<String>,

    /// Delete the item instead
    #[arg(long)]
    pub delete: bool,
}

/// Execute the `set-item` command.
pub fn execute(args: SetItemArgs, ctx: &Context) -> Result<()> {
    let class = resource_class(&args.class)?;
    let item = match &args.json {
        Some(json) if !args.delete => Some(
            serde_json::from_str::<Value>(json).context("--json is not a valid JSON document")?,
        ),
        _ => None,
    };

    let engine = ctx.engine()?;
    let scope = args.scope.scope();
    let outcome = write(&engine, &scope, &class, &args.id, item).map_err(suggestions::explain)?;

    let (status, target) = if outcome.written_remotely {
        (Status::Remote, "remote")
    } else {
        (Status::Local, "local store")
    };
    let verb = if args.delete { "Deleted" } else { "Wrote" };
    println!(
        "{} {} {} '{}' in {} ({})",
        status.marker(&ctx.output),
        verb,
        class,
        args.id,
        target,
        scope
    );
    Ok(())
}

fn write(
    engine: &Engine,
    scope: &Scope,
    class: &ResourceClass,
    id: &str,
    item: Option<Value>,
) -> strata::error::Result<WriteOutcome> {
    let item = item.map(|mut document| {
        if let Some(object) = document.as_object_mut() {
            object.insert("id".to_string(), Value::String(id.to_string()));
        }
        document
    });

    if class.tree {
        let tree_item = match item {
            Some(document) => Some(TreeItem::from_document(&document).ok_or_else(|| {
                Error::InvalidDocument {
                    collection: class.collection.clone(),
                    message: "expected a JSON object".to_string(),
                }
            })?),
            None => None,
        };
        return engine.write_tree_item(scope, id, tree_item);
    }

    if *class == ResourceClass::schemas() {
        return match item {
            Some(document) => engine.write_schema(scope, Schema::from_document(&document)?),
            None => engine.delete_schema(scope, id),
        };
    }

    engine.write(scope, class, id, item)
}
