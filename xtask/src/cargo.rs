//! Running cargo sub-commands with timed, colored status lines.

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::{Command, Output};
use std::time::Instant;

/// Firmware target triple for the STM32H743.
pub const FIRMWARE_TARGET: &str = "thumbv7em-none-eabihf";

/// What a failed step does to the overall run.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Abort with an error.
    Abort,
    /// Print a warning and carry on.
    Warn,
}

/// Run `cargo <args>` under `label`. Returns the captured output on success.
pub fn step(label: &str, args: &[&str], on_failure: OnFailure) -> Result<Option<Output>> {
    println!("{}", format!("  {label}...").cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run cargo {}", args.join(" ")))?;

    if output.status.success() {
        println!(
            "{}",
            format!("  ✓ {label} passed in {:.2}s", start.elapsed().as_secs_f64()).green()
        );
        println!();
        return Ok(Some(output));
    }

    match on_failure {
        OnFailure::Abort => {
            eprintln!("{}", format!("  ✗ {label} failed").red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stdout));
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{label} failed");
        }
        OnFailure::Warn => {
            eprintln!("{}", format!("  ⚠ {label} reported problems").yellow().bold());
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            println!();
            Ok(None)
        }
    }
}

/// Print the closing line of a run.
pub fn finish(what: &str, start: Instant) {
    println!(
        "{}",
        format!("✓ All {what} completed in {:.2}s", start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();
}

/// "test result: ..." summary from libtest output, summed over binaries.
pub fn test_summary(stdout: &[u8]) -> String {
    let text = String::from_utf8_lossy(stdout);
    let (mut passed, mut failed, mut binaries) = (0u32, 0u32, 0u32);
    for line in text.lines() {
        let Some(result) = line.split("test result:").nth(1) else {
            continue;
        };
        binaries = binaries.saturating_add(1);
        for part in result.split(';') {
            let mut words = part.split_whitespace().rev();
            let (Some(kind), Some(count)) = (words.next(), words.next()) else {
                continue;
            };
            let count: u32 = count.parse().unwrap_or(0);
            match kind {
                "passed" => passed = passed.saturating_add(count),
                "failed" => failed = failed.saturating_add(count),
                _ => {}
            }
        }
    }
    if binaries == 0 {
        return "(summary not available)".to_string();
    }
    format!("({passed} passed, {failed} failed across {binaries} binaries)")
}
