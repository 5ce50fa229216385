use anyhow::Result;
use chrono::TimeZone;
use std::env;
use std::fs;
use std::process::Command;
use vergen_gitcl::{Emitter, GitclBuilder};

fn main() -> Result<()> {
    // Generate git information
    let gitcl = GitclBuilder::default()
        .describe(true, true, Some("[0-9]*"))
        .build()?;

    let gitcl_res = Emitter::default()
        .idempotent()
        .fail_on_error()
        .add_instructions(&gitcl)
        .and_then(|emitter| emitter.emit());

    if let Err(e) = gitcl_res {
        eprintln!("error occurred while generating instructions: {e:?}");
        Emitter::default().idempotent().fail_on_error().emit()?;
    }

    // Add build timestamp
    let now = env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|val| val.parse::<i64>().ok())
        .and_then(|secs| chrono::Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(chrono::Utc::now);

    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    );

    // Get taperaw library version using cargo metadata
    let taperaw_version = get_taperaw_version_from_metadata().unwrap_or_else(|_| {
        read_taperaw_version_fallback().unwrap_or_else(|_| "unknown".to_string())
    });
    println!("cargo:rustc-env=TAPERAW_VERSION={taperaw_version}");

    println!("cargo:rerun-if-changed=taperaw/Cargo.toml");

    Ok(())
}

/// Get taperaw version using cargo metadata (works with published and local dependencies)
fn get_taperaw_version_from_metadata() -> Result<String> {
    let output = Command::new("cargo")
        .args(["metadata", "--format-version", "1", "--no-deps"])
        .output()?;

    if !output.status.success() {
        anyhow::bail!("cargo metadata failed");
    }

    let metadata: serde_json::Value = serde_json::from_slice(&output.stdout)?;

    metadata["packages"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|package| package["name"].as_str() == Some("taperaw"))
        .and_then(|package| package["version"].as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("taperaw package not found in metadata"))
}

/// Fallback: manually parse taperaw/Cargo.toml
fn read_taperaw_version_fallback() -> Result<String> {
    let toml_content = fs::read_to_string("taperaw/Cargo.toml")?;

    for line in toml_content.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("version") {
            if let Some(version_part) = value.trim_start().strip_prefix('=') {
                let version = version_part.trim().trim_matches('"').trim_matches('\'');
                return Ok(version.to_string());
            }
        }
    }

    anyhow::bail!("Could not find version in taperaw/Cargo.toml");
}
