//! End-to-end tests for the `strata compile` command.
//!
//! These tests seed a file-backed local store and invoke the binary directly.

#[allow(dead_code)]
mod common;
use common::prelude::*;
use serde_json::json;

fn blog_schemas() -> TestFixture {
    TestFixture::new().with_collection(
        "blog",
        "live",
        "schemas",
        vec![
            json!({"id": "base", "icon": "doc", "tabs": {"meta": "Meta"}}),
            json!({"id": "post", "parentSchemaId": "base", "tabs": {"body": "Body"}}),
        ],
    )
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_compile_child_schema() {
    let fixture = blog_schemas();

    fixture
        .command()
        .args(["compile", "post", "-p", "blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id": "post""#))
        .stdout(predicate::str::contains(r#""inheritedFrom": "base""#))
        .stdout(predicate::str::contains(r#""icon": "doc""#))
        .stdout(predicate::str::contains(r#""body""#));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_compile_yaml_output() {
    let fixture = blog_schemas();

    fixture
        .command()
        .args(["compile", "post", "-p", "blog", "--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id: post"))
        .stdout(predicate::str::contains("inheritedFrom: base"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_compile_uses_configured_default_icon() {
    let fixture = TestFixture::new()
        .with_config(configs::WITH_DEFAULTS)
        .with_collection("blog", "live", "schemas", vec![json!({"id": "bare"})]);

    fixture
        .command()
        .args(["compile", "bare", "-p", "blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""icon": "page""#));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_compile_missing_schema() {
    let fixture = blog_schemas();

    fixture
        .command()
        .args(["compile", "nope", "-p", "blog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found: nope"))
        .stderr(predicate::str::contains("hint:"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_compile_cycle() {
    let fixture = TestFixture::new().with_collection(
        "blog",
        "live",
        "schemas",
        vec![
            json!({"id": "a", "parentSchemaId": "b"}),
            json!({"id": "b", "parentSchemaId": "a"}),
        ],
    );

    fixture
        .command()
        .args(["compile", "a", "-p", "blog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cycle detected"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_compile_all_reports_failures() {
    let fixture = TestFixture::new().with_collection(
        "blog",
        "live",
        "schemas",
        vec![
            json!({"id": "good"}),
            json!({"id": "orphan", "parentSchemaId": "gone"}),
        ],
    );

    fixture
        .command()
        .args(["compile", "--all", "-p", "blog"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""good""#))
        .stderr(predicate::str::contains("1 schema(s) failed to compile"))
        .stderr(predicate::str::contains("orphan"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_compile_all_other_environment() {
    let fixture = blog_schemas().with_collection(
        "blog",
        "draft",
        "schemas",
        vec![json!({"id": "draft-only"})],
    );

    fixture
        .command()
        .args(["compile", "--all", "-p", "blog", "-e", "draft"])
        .assert()
        .success()
        .stdout(predicate::str::contains("draft-only"))
        .stdout(predicate::str::contains(r#""post""#).not());
}

#[test]
fn test_compile_requires_schema_or_all() {
    let mut cmd = cargo_bin_cmd!("strata");
    cmd.args(["compile", "-p", "blog"]).assert().code(2);
}
