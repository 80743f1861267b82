//! # Error Suggestions
//!
//! Helpers that turn engine failures into CLI errors carrying a hint on how
//! to fix them. Errors should tell users what went wrong AND what to try.
//!
//! ```rust,ignore
//! // Instead of:
//! anyhow::bail!("Configuration file not found: {}", path.display());
//!
//! // Use:
//! return Err(suggestions::config_not_found(path));
//! ```

use std::path::Path;

use crate::error::Error;
use crate::sync::ResourceClass;

/// The configuration file named by `--config` does not exist
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Configuration file not found: {path}\n\n\
         hint: Create a strata.yaml file in the working directory\n\
         hint: Use -c/--config to specify a different path\n\
         hint: Set the STRATA_CONFIG environment variable",
        path = path.display()
    )
}

/// A resource class name that is not one of the built-in classes
pub fn unknown_resource_class(name: &str) -> anyhow::Error {
    let known = ResourceClass::known_names();
    let did_you_mean = find_similar(name, known)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "Unknown resource class: {name}{did_you_mean}\n\n\
         Known classes are: {classes}",
        classes = known.join(", ")
    )
}

/// A schema inheritance cycle
pub fn cycle_detected(cycle: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Cycle detected in schema inheritance: {cycle}\n\n\
         hint: Change the parentSchemaId of one schema in the cycle\n\
         hint: Run 'strata validate' to list every broken chain"
    )
}

/// Convert an engine error into a CLI error, attaching hints where known
pub fn explain(error: Error) -> anyhow::Error {
    match error {
        Error::CycleDetected { cycle } => cycle_detected(&cycle),
        Error::Locked { id } => anyhow::anyhow!(
            "Schema '{id}' is locked\n\n\
             hint: Locked schemas are system-provided or synced from a remote\n\
             hint: Create a child schema with parentSchemaId: {id} instead"
        ),
        Error::NotFound { kind, id } => anyhow::anyhow!(
            "{kind} not found: {id}\n\n\
             hint: Check the project (-p) and environment (-e) flags"
        ),
        other => anyhow::Error::new(other),
    }
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Levenshtein distance between two strings
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        previous = current;
    }
    previous[b.len()]
}
