//! CLI for the seed transformation tool.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use seed::config::source::absolute;
use seed::logging;
use seed::prelude::*;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seed")]
#[command(author, version, about = "Apply source transformations described in a YAML, TOML or JSON file", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fix the files of a directory according to a transformation description
    Fix {
        /// Transformation description file or http(s) URL
        #[arg(short = 't', long = "tdf", default_value = "./tdf.yml")]
        tdf: String,

        /// Directory to transform
        #[arg(default_value = ".")]
        directory: PathBuf,

        /// Number of worker threads (defaults to available parallelism)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Preview changes without writing them
        #[arg(long)]
        dry_run: bool,

        /// Skip invalid transformations instead of aborting
        #[arg(long)]
        keep_going: bool,
    },

    /// Convert a transformation description to another format
    Convert {
        /// Description file to convert
        file: PathBuf,

        /// Target format: yaml, toml or json
        format: String,
    },

    /// List the available procedures and preconditions
    Procedures,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match cli.command {
        Commands::Fix {
            tdf,
            directory,
            jobs,
            dry_run,
            keep_going,
        } => cmd_fix(tdf, directory, jobs, dry_run, keep_going, cli.verbose > 0),
        Commands::Convert { file, format } => cmd_convert(file, format),
        Commands::Procedures => cmd_procedures(),
    }
}

fn cmd_fix(
    tdf: String,
    directory: PathBuf,
    jobs: Option<usize>,
    dry_run: bool,
    keep_going: bool,
    verbose: bool,
) -> Result<()> {
    let source = DescriptionSource::from_arg(&tdf);
    let set = TransformationSet::load(&source)
        .with_context(|| format!("Unable to load the transformation description {source}"))?;

    let root = absolute(&directory);
    if !root.is_dir() {
        bail!("{} is not a directory", directory.display());
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if verbose {
        writeln!(out, "Apply transformations from: {source}.\n\n---")?;
    }

    let config = RunConfig {
        root,
        description: source.local_path(),
        jobs,
        dry_run,
        keep_going,
    };
    let summary = Fix::with_config(config)
        .apply(&set, &mut out)
        .context("Transformation failed")?;

    if dry_run && !summary.previews.is_empty() {
        writeln!(out)?;
        for change in &summary.previews {
            writeln!(out, "{}", colorized_diff(change))?;
        }
        writeln!(out, "{}", DiffSummary::total(&summary.previews))?;
    }

    if !summary.is_success() {
        for failure in &summary.failures {
            eprintln!("error: {failure}");
        }
        bail!("{} file(s) could not be processed", summary.failures.len());
    }

    Ok(())
}

fn cmd_convert(file: PathBuf, format: String) -> Result<()> {
    let target = Format::from_extension(&format)?;
    let source = DescriptionSource::File(file.clone());
    let set = TransformationSet::load(&source)
        .with_context(|| format!("Unable to load {}", file.display()))?;

    let output = file.with_extension(target.extension());
    if absolute(&output) == absolute(&file) {
        bail!("{} is already in {target} format", file.display());
    }

    let rendered = set.render(target)?;
    std::fs::write(&output, rendered)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Converted {} -> {}", file.display(), output.display());
    Ok(())
}

fn cmd_procedures() -> Result<()> {
    println!("Procedures:");
    for name in ProcedureRegistry::default().names() {
        println!("  {name}");
    }
    println!("Preconditions:");
    for name in PreconditionRegistry::default().names() {
        println!("  {name}");
    }
    Ok(())
}
