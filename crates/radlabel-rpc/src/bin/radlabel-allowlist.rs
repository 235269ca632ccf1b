//! radlabel allow-list tool - creates and inspects `doctor_whitelist.json`.
//!
//! Identifiers can be generated from a pattern, imported from a plain list or
//! a CSV column, or any mix of the three. Duplicates are dropped and the file
//! is written atomically with the identifiers sorted.

use anyhow::{bail, Context, Result};
use clap::Parser;
use radlabel_core::config::{AuthConfig, PathsConfig};
use radlabel_core::{AllowList, AllowListBuilder};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "radlabel-allowlist")]
#[command(about = "Create or inspect the reviewer allow-list")]
struct Args {
    /// Generate this many random identifiers
    #[arg(long, value_name = "N")]
    random: Option<usize>,

    /// Pattern for random identifiers; supports {number}, {random} and {letter}
    #[arg(long, default_value = AuthConfig::DEFAULT_ID_PATTERN)]
    pattern: String,

    /// Import identifiers from a file with one per line
    #[arg(long, value_name = "PATH")]
    from_file: Option<PathBuf>,

    /// Import identifiers from a CSV file
    #[arg(long, value_name = "PATH")]
    from_csv: Option<PathBuf>,

    /// Zero-based CSV column holding the identifier
    #[arg(long, default_value = "0")]
    csv_column: usize,

    /// Allow-list file to write
    #[arg(long, default_value = PathsConfig::ALLOWLIST_FILENAME)]
    output: PathBuf,

    /// Keep the identifiers already in the output file
    #[arg(long)]
    append: bool,

    /// Print the allow-list; on its own, nothing is modified
    #[arg(long)]
    show: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn has_sources(&self) -> bool {
        self.random.is_some() || self.from_file.is_some() || self.from_csv.is_some()
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    if !args.has_sources() {
        if args.show {
            return show(&args.output);
        }
        bail!("Nothing to do: pass --random, --from-file or --from-csv (or --show to list)");
    }

    let mut builder = if args.append {
        AllowListBuilder::from_existing(&args.output)
            .with_context(|| format!("Failed to read {}", args.output.display()))?
    } else {
        AllowListBuilder::new()
    };
    let existing = builder.len();

    if let Some(path) = &args.from_file {
        let added = builder
            .import_lines(path)
            .with_context(|| format!("Failed to import {}", path.display()))?;
        info!("Imported {} identifiers from {}", added, path.display());
    }

    if let Some(path) = &args.from_csv {
        let added = builder
            .import_csv(path, args.csv_column)
            .with_context(|| format!("Failed to import {}", path.display()))?;
        info!(
            "Imported {} identifiers from column {} of {}",
            added,
            args.csv_column,
            path.display()
        );
    }

    if let Some(count) = args.random {
        let generated = builder.generate_random(count, &args.pattern);
        if generated.len() < count {
            warn!(
                "Generated only {} of {} identifiers; the pattern '{}' has too few combinations",
                generated.len(),
                count,
                args.pattern
            );
        } else {
            info!("Generated {} identifiers", generated.len());
        }
    }

    if builder.is_empty() {
        bail!("No identifiers collected; {} was not written", args.output.display());
    }

    let file = builder
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!(
        "Wrote {} identifiers ({} new) to {}",
        file.total_doctors,
        file.total_doctors - existing,
        args.output.display()
    );

    if args.show {
        print_ids(file.whitelist.iter().map(String::as_str));
    }

    Ok(())
}

fn show(path: &Path) -> Result<()> {
    let list = AllowList::load(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match list {
        Some(list) => {
            println!("{}: {} identifiers", path.display(), list.len());
            print_ids(list.iter());
            Ok(())
        }
        None => bail!("Allow-list not found at {}", path.display()),
    }
}

fn print_ids<'a>(ids: impl Iterator<Item = &'a str>) {
    for (i, id) in ids.enumerate() {
        println!("{:>4}. {}", i + 1, id);
    }
}
