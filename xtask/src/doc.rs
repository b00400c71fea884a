use anyhow::Result;
use colored::Colorize;
use std::time::Instant;

use crate::cargo::{self, OnFailure};

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building documentation...".cyan().bold());
    println!();

    let start = Instant::now();

    let mut args = vec![
        "doc",
        "-p",
        "platform",
        "-p",
        "acep730",
        "--lib",
        "--no-deps",
        "--document-private-items",
    ];
    if open {
        args.push("--open");
    }
    cargo::step("Documentation", &args, OnFailure::Abort)?;

    if !open {
        println!(
            "   {}",
            "Open target/doc/acep730/index.html in your browser".dimmed()
        );
        println!(
            "   {}",
            "Or run 'cargo run -p xtask -- doc --open'".dimmed()
        );
        println!();
    }

    cargo::finish("documentation", start);
    Ok(())
}
