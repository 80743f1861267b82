//! # Tree Command Implementation
//!
//! Displays the media tree of an environment as a folder hierarchy. The flat
//! media items are grouped under their folders, with the root folder `/` at
//! the top.
//!
//! This command is a safe, read-only operation.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::io::Write;

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, Style, TreeItem as PTreeItem};

use strata::path::{folder_depth, folder_segments, parent_folder, ROOT_FOLDER};
use strata::suggestions;
use strata::tree::{children_of, TreeItem};

use super::{Context, OutputFormat, ScopeArgs};

/// Display the media tree of an environment
#[derive(Args, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Maximum folder depth to display.
    ///
    /// If not specified, displays the full tree. Use 0 to show only the
    /// items in the root folder.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,

    /// Print the flat tree in a machine-readable format instead
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let scope = args.scope.scope();
    let tree = engine.media_tree(&scope).map_err(suggestions::explain)?;

    if let Some(format) = args.format {
        println!("{}", format.render(&tree)?);
        return Ok(());
    }

    let root = build_folder_node(&tree, args.depth.unwrap_or(usize::MAX));
    print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

/// Group the items of a flat tree under a folder hierarchy
fn build_folder_node(tree: &[TreeItem], max_depth: usize) -> TreeNode {
    let mut folders: BTreeSet<String> = BTreeSet::new();
    for item in tree {
        let mut folder = Some(item.folder.clone());
        while let Some(current) = folder {
            folder = parent_folder(&current);
            folders.insert(current);
        }
    }
    folder_node(tree, &folders, ROOT_FOLDER, max_depth)
}

fn folder_node(tree: &[TreeItem], folders: &BTreeSet<String>, folder: &str, max_depth: usize) -> TreeNode {
    let label = folder_segments(folder)
        .last()
        .map(|name| format!("{}/", name))
        .unwrap_or_else(|| ROOT_FOLDER.to_string());

    let mut children: Vec<TreeNode> = Vec::new();
    if folder_depth(folder) < max_depth {
        children.extend(
            folders
                .iter()
                .filter(|candidate| parent_folder(candidate).as_deref() == Some(folder))
                .map(|sub| folder_node(tree, folders, sub, max_depth)),
        );
    }
    if folder_depth(folder) <= max_depth {
        children.extend(children_of(tree, folder).into_iter().map(|item| TreeNode {
            label: item_label(item),
            children: Vec::new(),
        }));
    }

    TreeNode { label, children }
}

fn item_label(item: &TreeItem) -> String {
    match item.extra.get("name").and_then(|name| name.as_str()) {
        Some(name) => format!("{} ({})", name, item.id),
        None => item.id.clone(),
    }
}

/// Tree node structure for ptree visualization
#[derive(Clone, Debug)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl PTreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: Write>(&self, f: &mut W, _style: &Style) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}
