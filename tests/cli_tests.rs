//! CLI integration tests
//!
//! These tests run the built binary in a scratch directory.

#![cfg(feature = "cli")]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;
use xmlpopulate::schema::{validate, BundledSchema};
use xmlpopulate::Document;

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xmlpopulate"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn read(path: &Path) -> Document {
    Document::parse(&fs::read_to_string(path).unwrap(), true).unwrap()
}

#[test]
fn test_cli_default_file_names() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["--seed", "11", "--schema", "both"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "generate should succeed: {:?}", output);
    assert!(stdout.contains("Generating with:"));
    assert!(stdout.contains("  * seed: 11"));

    let common = read(&dir.path().join("consignment-11-common.xml"));
    let identifiers = read(&dir.path().join("consignment-11-identifiers.xml"));
    let common_schema = BundledSchema::ConsignmentCommon.load().unwrap();
    let identifier_schema = BundledSchema::ConsignmentIdentifier.load().unwrap();
    assert_eq!(validate(&common, &common_schema), None);
    assert_eq!(validate(&identifiers, &identifier_schema), None);
}

#[test]
fn test_cli_same_seed_same_output() {
    let dir = TempDir::new().unwrap();
    for name in ["a.xml", "b.xml"] {
        let output = run(dir.path(), &["-s", "7", "-r", "random", "-o", name]);
        assert!(output.status.success());
    }
    assert_eq!(
        fs::read_to_string(dir.path().join("a.xml")).unwrap(),
        fs::read_to_string(dir.path().join("b.xml")).unwrap()
    );
}

#[test]
fn test_cli_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("out.xml"), "keep").unwrap();

    let output = run(dir.path(), &["-s", "1", "-o", "out.xml"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("already exists"));
    assert_eq!(fs::read_to_string(dir.path().join("out.xml")).unwrap(), "keep");

    let output = run(dir.path(), &["-s", "1", "-o", "out.xml", "-w"]);
    assert!(output.status.success());
    assert_ne!(fs::read_to_string(dir.path().join("out.xml")).unwrap(), "keep");
}

#[test]
fn test_cli_overrides_and_deletes_in_order() {
    let dir = TempDir::new().unwrap();
    let output = run(
        dir.path(),
        &[
            "-s",
            "23",
            "-o",
            "out.xml",
            "-t",
            "consignment/mainCarriageTransportMovement/modeCode:=8",
            "-d",
            "consignment/includedConsignmentItem",
            "-p",
            "false",
        ],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "generate should succeed: {:?}", output);
    assert!(stdout.contains("Set \""));
    assert!(stdout.contains("Delete \""));

    let doc = read(&dir.path().join("out.xml"));
    assert!(doc.root.find_children("includedConsignmentItem").is_empty());
    for movement in doc.root.find_children("mainCarriageTransportMovement") {
        assert_eq!(movement.find_children("modeCode")[0].text().as_deref(), Some("8"));
    }
}

#[test]
fn test_cli_subsets() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["-s", "3", "-o", "out.xml", "--subsets", "FI01"]);
    assert!(output.status.success(), "generate should succeed: {:?}", output);

    let doc = read(&dir.path().join("out.xml"));
    assert!(doc.root.find_children("includedConsignmentItem").is_empty());
    assert!(doc.root.find_children("associatedDocument").is_empty());
    assert!(!doc.root.find_children("deliveryEvent").is_empty());
}

#[test]
fn test_cli_rejects_malformed_override() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["-s", "1", "-t", "no-separator"]);
    assert!(!output.status.success());
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}
