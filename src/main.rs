//! Dev Environment Reset Tool
//!
//! Keeps a local PostgreSQL database and S3-compatible bucket set in a
//! known, reproducible state: baseline resets, named snapshots, restores.

// devenvtool/src/main.rs
mod config;
mod errors;
mod registry;
mod reset;
mod snapshot;
mod store;

use anyhow::{Context, Result};
use config::AppConfig;
use reset::{RunOutcome, RunReport};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    match run_app().await {
        Ok(_) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    // Expects config.json in the working directory (the project root when
    // running with `cargo run`).
    let config_path = PathBuf::from("config.json");
    let app_config = AppConfig::load_from_json(&config_path).context(format!(
        "Failed to load application configuration from {}",
        config_path.display()
    ))?;

    let args: Vec<String> = env::args().collect();
    let choice = if args.len() > 1 {
        args[1].trim().to_string()
    } else {
        prompt_choice()?
    };

    match choice.as_str() {
        "1" | "reset" => {
            println!("🚀 Starting Baseline Reset...");
            let snapshot = args.get(2).map(|s| s.trim());
            let report = reset::run_reset_flow(&app_config, snapshot)
                .await
                .context("Reset process failed")?;
            print_report(&report)?;
        }
        "2" | "restore" => {
            let name = args
                .get(2)
                .map(|s| s.trim().to_string())
                .context("Usage: restore <snapshot-name>")?;
            println!("🔄 Starting Restore of '{}'...", name);
            let report = reset::run_reset_flow(&app_config, Some(&name))
                .await
                .context("Restore process failed")?;
            print_report(&report)?;
        }
        "3" | "snapshot" => {
            let name = args
                .get(2)
                .map(|s| s.trim().to_string())
                .context("Usage: snapshot <snapshot-name>")?;
            println!("📸 Starting Snapshot '{}'...", name);
            snapshot::run_snapshot_flow(&app_config, &name)
                .await
                .context("Snapshot process failed")?;
        }
        "4" | "list" => {
            snapshot::run_list_flow(&app_config)
                .await
                .context("Listing snapshots failed")?;
        }
        _ => {
            println!(
                "❌ Invalid choice. Please enter '1' (reset), '2' (restore), '3' (snapshot), or '4' (list)."
            );
            anyhow::bail!("Invalid operation choice");
        }
    }
    Ok(())
}

/// Prints the per-step report of a run and fails the process on a failed run.
fn print_report(report: &RunReport) -> Result<()> {
    for step in &report.completed {
        println!("  ✓ {}", step);
    }
    match &report.outcome {
        RunOutcome::Done => Ok(()),
        RunOutcome::Failed { step, phase, error } => {
            eprintln!("  ❌ {} (while {}): {}", step, phase, error);
            anyhow::bail!("Run failed at step '{}': {}", step, error)
        }
    }
}

/// Prompts the user to select an operation when none was given on the
/// command line.
fn prompt_choice() -> Result<String> {
    use std::io::{Write, stdin, stdout};

    println!("Select an operation:");
    println!("1. Baseline Reset (or type 'reset')");
    println!("2. Restore Snapshot (or type 'restore <name>')");
    println!("3. Take Snapshot (or type 'snapshot <name>')");
    println!("4. List Snapshots (or type 'list')");
    print!("Enter your choice: ");
    stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;
    Ok(input.trim().to_string())
}
