//! End-to-end tests for the `strata resolve` command.

#[allow(dead_code)]
mod common;
use common::prelude::*;
use serde_json::json;

fn content_fixture() -> TestFixture {
    TestFixture::new().with_collection(
        "blog",
        "live",
        "content",
        vec![
            json!({"id": "hello", "title": "Hello"}),
            json!({"id": "bye", "title": "Bye"}),
        ],
    )
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_resolve_class() {
    content_fixture()
        .command()
        .args(["resolve", "content", "-p", "blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""title": "Hello""#))
        .stdout(predicate::str::contains(r#""title": "Bye""#));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_resolve_single_item() {
    content_fixture()
        .command()
        .args(["resolve", "content", "--id", "bye", "-p", "blog", "--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("title: Bye"))
        .stdout(predicate::str::contains("Hello").not());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_resolve_missing_item() {
    content_fixture()
        .command()
        .args(["resolve", "content", "--id", "gone", "-p", "blog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found: gone"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_resolve_unknown_class_suggests() {
    content_fixture()
        .command()
        .args(["resolve", "contnt", "-p", "blog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown resource class: contnt"))
        .stderr(predicate::str::contains("Did you mean 'content'?"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_resolve_media_alias() {
    TestFixture::new()
        .with_collection("blog", "live", "media", vec![json!({"id": "a", "folder": "x"})])
        .command()
        .args(["resolve", "media", "-p", "blog"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""folder": "x""#));
}
