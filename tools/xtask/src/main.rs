//! Workspace automation tasks.
//!
//! Run with: `cargo xtask <command>`

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use herodex_catalog::{CatalogStore, JsonFileSource};

const OPENAPI_PATH: &str = "crates/herodex-api/openapi.json";

#[derive(Parser)]
#[command(name = "xtask", about = "herodex workspace automation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all CI checks locally
    Ci,
    /// Validate workspace conventions
    Lint,
    /// Generate coverage report
    Coverage,
    /// Write the OpenAPI document to crates/herodex-api/openapi.json
    Openapi,
    /// Load the catalog datasets and print the join report
    CheckData {
        /// Directory holding the dataset files
        #[arg(long, default_value = "json")]
        dir: PathBuf,
        /// Entity dataset file name
        #[arg(long, default_value = "superhero_info.json")]
        info: String,
        /// Attribute dataset file name
        #[arg(long, default_value = "superhero_powers.json")]
        powers: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci => run_ci(),
        Commands::Lint => run_lint(),
        Commands::Coverage => run_coverage(),
        Commands::Openapi => run_openapi(),
        Commands::CheckData { dir, info, powers } => run_check_data(&dir, &info, &powers),
    }
}

fn run_ci() -> Result<()> {
    println!("Running CI checks...\n");

    run_cmd("cargo", &["fmt", "--check"])?;
    run_cmd("cargo", &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])?;
    run_cmd("cargo", &["test", "--workspace"])?;
    run_cmd("cargo", &["doc", "--workspace", "--no-deps"])?;

    println!("\nAll CI checks passed!");
    Ok(())
}

fn run_lint() -> Result<()> {
    println!("Validating workspace conventions...\n");

    let crates = std::fs::read_dir("crates").context("read crates directory")?;
    for entry in crates {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("herodex-") {
            anyhow::bail!("Crate '{name}' does not follow herodex-* naming");
        }

        let lib = entry.path().join("src").join("lib.rs");
        let source = std::fs::read_to_string(&lib)
            .with_context(|| format!("read {}", lib.display()))?;
        if !source.contains("#![forbid(unsafe_code)]") {
            anyhow::bail!("{} is missing #![forbid(unsafe_code)]", lib.display());
        }
    }

    println!("All conventions validated!");
    Ok(())
}

fn run_coverage() -> Result<()> {
    run_cmd("cargo", &["llvm-cov", "--workspace", "--html"])?;
    println!("\nCoverage report: target/llvm-cov/html/index.html");
    Ok(())
}

fn run_openapi() -> Result<()> {
    let json = herodex_api::openapi::openapi_json().context("generate OpenAPI JSON")?;
    std::fs::write(OPENAPI_PATH, json).with_context(|| format!("write {OPENAPI_PATH}"))?;
    println!("Wrote {OPENAPI_PATH}");
    Ok(())
}

fn run_check_data(dir: &Path, info: &str, powers: &str) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    let store = CatalogStore::new(JsonFileSource::in_dir(dir, info, powers));
    let snapshot = runtime
        .block_on(store.load())
        .with_context(|| format!("load datasets from {}", dir.display()))?;

    let report = snapshot.report();
    let bounds = snapshot.bounds();
    println!("entities:                 {}", report.entities);
    println!("attribute rows:           {}", report.attribute_rows);
    println!("entities without powers:  {}", report.unmatched_entities);
    println!("duplicate attribute rows: {}", report.duplicate_attribute_rows);
    match bounds.max_id {
        Some(max_id) => println!("valid ids:                0..={max_id}"),
        None => println!("valid ids:                none (empty catalog)"),
    }
    Ok(())
}

fn run_cmd(cmd: &str, args: &[&str]) -> Result<()> {
    println!("$ {} {}", cmd, args.join(" "));
    let status = Command::new(cmd)
        .args(args)
        .status()
        .with_context(|| format!("Failed to run: {} {}", cmd, args.join(" ")))?;

    if !status.success() {
        anyhow::bail!("Command failed: {} {}", cmd, args.join(" "));
    }
    Ok(())
}
