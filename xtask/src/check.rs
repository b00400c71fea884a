use anyhow::Result;
use colored::Colorize;
use std::time::Instant;

use crate::cargo::{self, OnFailure, FIRMWARE_TARGET};

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking builds...".cyan().bold());
    println!();

    let start = Instant::now();

    cargo::step(
        "Firmware binary (STM32H7)",
        &[
            "check",
            "-p",
            "acep730",
            "--target",
            FIRMWARE_TARGET,
            "--features",
            "hardware",
        ],
        OnFailure::Abort,
    )?;

    cargo::step(
        "Driver library (host, std)",
        &["check", "-p", "acep730", "--features", "std"],
        OnFailure::Abort,
    )?;

    cargo::step(
        "Platform crate (no_std)",
        &[
            "check",
            "-p",
            "platform",
            "--target",
            FIRMWARE_TARGET,
            "--no-default-features",
        ],
        OnFailure::Abort,
    )?;

    cargo::step(
        "Clippy",
        &[
            "clippy",
            "-p",
            "platform",
            "-p",
            "acep730",
            "-p",
            "xtask",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ],
        OnFailure::Warn,
    )?;

    if cargo::step("Formatting", &["fmt", "--all", "--check"], OnFailure::Warn)?.is_none() {
        eprintln!("     Run 'cargo fmt --all' to fix");
    }

    cargo::finish("checks", start);
    Ok(())
}

#[cfg(test)]
mod tests {
    /// Firmware builds inherit the defmt filter from the workspace config.
    #[test]
    fn cargo_config_sets_default_defmt_level() {
        let config = include_str!("../../.cargo/config.toml");
        let env = config
            .split("[env]")
            .nth(1)
            .unwrap_or_default();
        assert!(
            env.lines().any(|l| l.trim() == r#"DEFMT_LOG = "info""#),
            "DEFMT_LOG missing from [env]"
        );
    }
}
