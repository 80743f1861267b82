//! Property-based tests for schema compilation.
//!
//! Chains of random length are generated with random tab and field overrides
//! at every level, and the compiled result is checked against the expected
//! precedence.

#[cfg(test)]
mod proptest_tests {
    use std::collections::BTreeMap;

    use crate::compile::{SchemaDefaults, SchemaResolver};
    use crate::error::Error;
    use crate::schema::{FieldDefinition, Schema, SchemaSet, SchemaType};
    use crate::tree::{build_tree, TreeItem, ROOT_ID};
    use proptest::prelude::*;

    /// One level of a generated chain: tab keys and field keys it defines
    fn level() -> impl Strategy<Value = (Vec<String>, Vec<String>, Option<String>)> {
        (
            prop::collection::vec("[a-d]", 0..4),
            prop::collection::vec("[p-s]", 0..4),
            prop::option::of("[a-z]{1,6}"),
        )
    }

    /// Build a linear chain `s0 <- s1 <- ... <- sN`
    fn chain(levels: &[(Vec<String>, Vec<String>, Option<String>)]) -> SchemaSet {
        SchemaSet::new(levels.iter().enumerate().map(|(depth, (tabs, fields, icon))| {
            let mut schema = Schema::new(format!("s{}", depth), SchemaType::Content);
            if depth > 0 {
                schema.parent_schema_id = Some(format!("s{}", depth - 1));
            }
            schema.icon = icon.clone();
            schema.tabs = tabs
                .iter()
                .map(|key| (key.clone(), format!("{}@{}", key, depth)))
                .collect::<BTreeMap<_, _>>();
            schema.fields.properties = fields
                .iter()
                .map(|key| {
                    (
                        key.clone(),
                        FieldDefinition {
                            label: Some(format!("{}@{}", key, depth)),
                            ..Default::default()
                        },
                    )
                })
                .collect();
            schema
        }))
    }

    proptest! {
        /// Property: compiling twice yields identical results
        #[test]
        fn compile_is_deterministic(levels in prop::collection::vec(level(), 1..6)) {
            let set = chain(&levels);
            let leaf = format!("s{}", levels.len() - 1);
            let resolver = SchemaResolver::default();

            let first = resolver.compile(&set, &leaf).unwrap();
            let second = resolver.compile(&set, &leaf).unwrap();
            prop_assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );
        }

        /// Property: every tab and field resolves to its most specific definer
        #[test]
        fn most_specific_ancestor_wins(levels in prop::collection::vec(level(), 1..6)) {
            let set = chain(&levels);
            let leaf_depth = levels.len() - 1;
            let compiled = SchemaResolver::default()
                .compile(&set, &format!("s{}", leaf_depth))
                .unwrap();

            for (key, tab) in &compiled.tabs {
                let depth = levels.iter().rposition(|(tabs, _, _)| tabs.contains(key)).unwrap();
                prop_assert_eq!(&tab.label, &format!("{}@{}", key, depth));
                prop_assert_eq!(tab.is_inherited(), depth != leaf_depth);
            }
            for (key, field) in &compiled.properties {
                let depth = levels.iter().rposition(|(_, fields, _)| fields.contains(key)).unwrap();
                prop_assert_eq!(field.definition.label.clone(), Some(format!("{}@{}", key, depth)));
            }

            let expected_icon = levels
                .iter()
                .rev()
                .find_map(|(_, _, icon)| icon.clone())
                .unwrap_or_else(|| SchemaDefaults::default().icon);
            prop_assert_eq!(compiled.icon, expected_icon);
            prop_assert_eq!(compiled.chain.len(), levels.len());
        }

        /// Property: closing the chain into a loop is always detected
        #[test]
        fn closed_chain_is_a_cycle(length in 1usize..8, entry in 0usize..8) {
            let mut schemas: Vec<Schema> = (0..length)
                .map(|i| {
                    let mut schema = Schema::new(format!("s{}", i), SchemaType::Content);
                    schema.parent_schema_id = Some(format!("s{}", (i + 1) % length));
                    schema
                })
                .collect();
            schemas.push(Schema::new("unrelated", SchemaType::Content));
            let set = SchemaSet::new(schemas);

            let result = SchemaResolver::default().compile(&set, &format!("s{}", entry % length));
            prop_assert!(matches!(result, Err(Error::CycleDetected { .. })), "expected CycleDetected, got {:?}", result);
        }

        /// Property: build_tree always yields exactly one root at "/"
        #[test]
        fn tree_has_single_root(
            items in prop::collection::vec(("[a-c*]{1,2}", ".{0,12}"), 0..12),
        ) {
            let tree = build_tree(
                items
                    .into_iter()
                    .map(|(id, folder)| TreeItem::new(id, folder))
                    .collect(),
            );
            let roots: Vec<&TreeItem> = tree.iter().filter(|item| item.id == ROOT_ID).collect();
            prop_assert_eq!(roots.len(), 1);
            prop_assert_eq!(roots[0].folder.as_str(), "/");
        }
    }
}
