//! End-to-end tests for the CLI commands.

use clap::Parser;
use iapgen_cli::{run, Cli, CliError};
use std::path::{Path, PathBuf};

const FIXTURE: &str = "../../fixtures/iap.ir.json";

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(FIXTURE)
}

/// A fresh scratch directory per test.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("iapgen-cli-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn run_args(args: &[&str]) -> Result<i32, CliError> {
    let cli = Cli::try_parse_from(std::iter::once("iapgen").chain(args.iter().copied())).unwrap();
    run(cli)
}

/// Test `generate` writes one file per target into the output directory.
#[test]
fn test_generate_writes_files() {
    let out = scratch("generate");
    let schema = fixture_path();
    let code = run_args(&[
        "--quiet",
        "generate",
        "--schema",
        schema.to_str().unwrap(),
        "--out-dir",
        out.to_str().unwrap(),
        "--stem",
        "Iap",
    ])
    .unwrap();
    assert_eq!(code, 0);

    for name in ["Iap.swift", "Iap.kt", "Iap.gd", "Iap.ts"] {
        let contents = std::fs::read_to_string(out.join(name)).unwrap();
        assert!(contents.contains("Generated by iapgen"), "{name}");
    }
}

/// Test `generate --template` renders a custom profile.
#[test]
fn test_generate_with_template() {
    let out = scratch("template");
    let profile = out.join("enums.profile.json");
    std::fs::write(
        &profile,
        r#"{
            "name": "enums",
            "fileExtension": "txt",
            "defaultScalar": "any",
            "templates": {
                "enumDecl": [{ "template": "{{name}}" }]
            }
        }"#,
    )
    .unwrap();
    let schema = fixture_path();
    run_args(&[
        "-q",
        "generate",
        "--schema",
        schema.to_str().unwrap(),
        "--template",
        profile.to_str().unwrap(),
        "--out-dir",
        out.to_str().unwrap(),
    ])
    .unwrap();

    let contents = std::fs::read_to_string(out.join("IapTypes.txt")).unwrap();
    assert_eq!(
        contents,
        "Store\n\nIapPlatform\n\nProductType\n\nPurchaseState\n\nErrorCode\n"
    );
}

/// Test an unknown language is reported before anything is written.
#[test]
fn test_generate_unknown_language() {
    let out = scratch("unknown-language");
    let schema = fixture_path();
    let err = run_args(&[
        "generate",
        "--schema",
        schema.to_str().unwrap(),
        "--lang",
        "swift,cobol",
        "--out-dir",
        out.to_str().unwrap(),
    ])
    .unwrap_err();
    assert!(matches!(err, CliError::UnknownLanguage(ref name) if name == "cobol"));
    assert!(!out.join("IapTypes.swift").exists());
}

/// Test `check` passes the fixture and fails a broken schema.
#[test]
fn test_check() {
    let schema = fixture_path();
    assert_eq!(
        run_args(&["-q", "check", "--schema", schema.to_str().unwrap()]).unwrap(),
        0
    );

    let dir = scratch("check");
    let broken = dir.join("broken.ir.json");
    std::fs::write(
        &broken,
        r#"{
            "objects": [{
                "name": "Purchase",
                "fields": [{ "name": "store", "type": { "kind": "enum", "name": "Store" } }]
            }]
        }"#,
    )
    .unwrap();
    assert_eq!(
        run_args(&["check", "--schema", broken.to_str().unwrap(), "--format", "json"]).unwrap(),
        1
    );
}

/// Test `check` surfaces unreadable input as an error.
#[test]
fn test_check_missing_file() {
    let err = run_args(&["check", "--schema", "/nonexistent/iap.ir.json"]).unwrap_err();
    assert!(matches!(err, CliError::Read { .. }));
}

/// Test `decode` runs the lenient decoder and reports wire errors.
#[test]
fn test_decode() {
    let dir = scratch("decode");
    let schema = fixture_path();

    let payload = dir.join("store.json");
    std::fs::write(&payload, r#""apple""#).unwrap();
    let code = run_args(&[
        "decode",
        "--schema",
        schema.to_str().unwrap(),
        "--type",
        "Store",
        payload.to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(code, 0);

    std::fs::write(&payload, r#""horizon2""#).unwrap();
    let err = run_args(&[
        "decode",
        "--schema",
        schema.to_str().unwrap(),
        "--type",
        "Store",
        payload.to_str().unwrap(),
    ])
    .unwrap_err();
    assert_eq!(err.to_string(), "Invalid Store value: horizon2");

    // The null-propagating decoder never fails on bad data.
    let code = run_args(&[
        "decode",
        "--schema",
        schema.to_str().unwrap(),
        "--type",
        "Store",
        "--strict",
        payload.to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(code, 0);
}

/// Test `decode` rejects names that are not declared types.
#[test]
fn test_decode_unknown_type() {
    let dir = scratch("decode-unknown");
    let payload = dir.join("payload.json");
    std::fs::write(&payload, "{}").unwrap();
    let schema = fixture_path();
    let err = run_args(&[
        "decode",
        "--schema",
        schema.to_str().unwrap(),
        "--type",
        "Nope",
        payload.to_str().unwrap(),
    ])
    .unwrap_err();
    assert!(matches!(err, CliError::Wire(_)));
}
