//! `modelcall` CLI integration tests.
//!
//! None of these reach the network: they either stop before execution or
//! complete against a catalog file.
//!
//! ## Exit Codes
//! - 0: Success
//! - 1: Execution or backend failure
//! - 2: Invalid command text

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Result;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::Value as JsonValue;
use serde_json::json;
use tempfile::TempDir;

/// `modelcall` with an isolated home and no API key in the environment.
fn modelcall(home: &Path) -> Result<assert_cmd::Command> {
    let mut cmd = assert_cmd::Command::cargo_bin("modelcall")?;
    cmd.env("MODELCALL_HOME", home)
        .env_remove("MODELCALL_API_KEY")
        .env_remove("GEMINI_API_KEY")
        .env_remove("MODELCALL_PROVIDER")
        .env_remove("RUST_LOG")
        .current_dir(home);
    Ok(cmd)
}

fn write_catalog(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("models.json");
    let models = json!([
        {
            "name": "gemini-1.5-pro",
            "displayName": "Gemini 1.5 Pro",
            "supportedActions": ["generateContent", "countTokens"]
        },
        {
            "name": "gemini-1.5-flash",
            "supportedActions": ["generateContent"]
        },
        {
            "name": "embedding-001",
            "supportedActions": ["embedContent"]
        }
    ]);
    fs::write(&path, serde_json::to_string_pretty(&models)?)?;
    Ok(path)
}

#[test]
fn check_prints_parsed_command() -> Result<()> {
    let home = TempDir::new()?;
    let output = modelcall(home.path())?
        .args(["check", r#"Gemini.gemini-1.5-pro.generateContent("Hello. (world)")"#])
        .output()?;

    assert!(output.status.success());
    let parsed: JsonValue = serde_json::from_slice(&output.stdout)?;
    assert_eq!(
        parsed,
        json!({
            "provider": "Gemini",
            "model": "gemini-1.5-pro",
            "method": "generateContent",
            "query": "Hello. (world)"
        })
    );
    Ok(())
}

#[test]
fn check_ignores_backend_configuration() -> Result<()> {
    let home = TempDir::new()?;
    modelcall(home.path())?
        .env("MODELCALL_PROVIDER", "OpenAI")
        .args(["check", r#"Gemini.m.gen("hi")"#])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""query": "hi""#));

    // A config file that would fail validation is never read either.
    fs::write(home.path().join("config.toml"), "page_size = 0\n")?;
    modelcall(home.path())?
        .args(["check", r#"Gemini.m.gen("hi")"#])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""provider": "Gemini""#));
    Ok(())
}

#[test]
fn check_rejects_malformed_text() -> Result<()> {
    let home = TempDir::new()?;
    modelcall(home.path())?
        .args(["check", r#"Gemini.gemini-pro("hi")"#])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Invalid command: malformed-syntax"));
    Ok(())
}

#[test]
fn complete_models_from_catalog_file() -> Result<()> {
    let home = TempDir::new()?;
    let catalog = write_catalog(home.path())?;

    modelcall(home.path())?
        .args(["complete", "Gemini.GEM", "--catalog"])
        .arg(&catalog)
        .assert()
        .success()
        .stdout(predicate::str::contains("stage: model"))
        .stdout(predicate::str::contains("replace: 7..10"))
        .stdout(predicate::str::contains(
            "gemini-1.5-pro\tgemini-1.5-pro.\tGemini 1.5 Pro",
        ))
        .stdout(predicate::str::contains("gemini-1.5-flash\tgemini-1.5-flash."))
        .stdout(predicate::str::contains("embedding-001").not());
    Ok(())
}

#[test]
fn complete_methods_at_cursor_as_json() -> Result<()> {
    let home = TempDir::new()?;
    let catalog = write_catalog(home.path())?;
    let text = r#"Gemini.gemini-1.5-pro.gen("draft")"#;

    let output = modelcall(home.path())?
        .args(["complete", text, "--json", "--cursor", "25", "--catalog"])
        .arg(&catalog)
        .output()?;
    assert!(output.status.success());

    let completion: JsonValue = serde_json::from_slice(&output.stdout)?;
    assert_eq!(completion["context"]["stage"], "method");
    assert_eq!(completion["context"]["prefix"], "gen");
    assert_eq!(completion["context"]["model"], "gemini-1.5-pro");
    assert_eq!(
        completion["candidates"],
        json!([{
            "label": "generateContent",
            "insert_text": "generateContent(",
            "replace_range": { "start": 22, "end": 25 }
        }])
    );
    Ok(())
}

#[test]
fn complete_provider_without_catalog() -> Result<()> {
    let home = TempDir::new()?;
    modelcall(home.path())?
        .args(["complete", "gem"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stage: provider"))
        .stdout(predicate::str::contains("Gemini\tGemini."));

    // No key and no file: the model stage has nothing to offer.
    modelcall(home.path())?
        .args(["complete", "Gemini."])
        .assert()
        .success()
        .stdout(predicate::str::diff("stage: model  prefix: \"\"  replace: 7..7\n"));
    Ok(())
}

#[test]
fn run_reports_parse_failures_with_exit_2() -> Result<()> {
    let home = TempDir::new()?;
    modelcall(home.path())?
        .args(["run", "   "])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Editor is empty."));

    modelcall(home.path())?
        .args(["run", r#"Gemini.gemini-pro.generateContent("unterminated)"#])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid command:"));
    Ok(())
}

#[test]
fn run_reports_execution_failures_with_exit_1() -> Result<()> {
    let home = TempDir::new()?;
    modelcall(home.path())?
        .args(["run", r#"Gemini.gemini-pro.embedContent("hi")"#])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: Method not supported"));

    modelcall(home.path())?
        .args(["run", r#"Gemini.gemini-pro.generateContent("hi")"#])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: No API key configured"));
    Ok(())
}

#[test]
fn explicit_config_file_must_exist() -> Result<()> {
    let home = TempDir::new()?;
    modelcall(home.path())?
        .arg("--config")
        .arg(home.path().join("missing.toml"))
        .args(["run", r#"Gemini.m.generateContent("q")"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
    Ok(())
}

#[test]
fn config_with_unknown_provider_is_refused() -> Result<()> {
    let home = TempDir::new()?;
    fs::write(home.path().join("config.toml"), "provider = \"Claude\"\n")?;
    modelcall(home.path())?
        .args(["complete", "C"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no backend available for provider 'Claude'"));
    Ok(())
}
