//! Command-line interface for the harvester.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{validate_region_filter, validate_request, HarvesterConfig, DEFAULT_ENCODING};
use crate::error::{HarvesterError, Result};
use crate::harvester::Harvester;
use crate::types::{Dataset, DatasetKind, DatasetRequest};

/// Urna Harvester - Download Brazilian electoral data from the TSE repository.
#[derive(Parser)]
#[command(name = "urna-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download party and coalition legends for an election year.
    Legend {
        /// Election year (e.g., 2018)
        year: u16,

        /// Read the single nationwide file instead of per-state files
        #[arg(long)]
        br_archive: bool,

        #[command(flatten)]
        options: DatasetOptions,
    },

    /// Download the number of seats in dispute for an election year.
    Seats {
        /// Election year (e.g., 2020)
        year: u16,

        #[command(flatten)]
        options: DatasetOptions,
    },
}

/// Options shared by every dataset command.
#[derive(Args, Debug, Clone)]
pub struct DatasetOptions {
    /// Federation units to include, comma-separated (e.g., SP,RJ), or 'all'
    #[arg(long, value_delimiter = ',', default_value = "all")]
    pub uf: Vec<String>,

    /// Encoding of the source files
    #[arg(long, default_value = DEFAULT_ENCODING)]
    pub encoding: String,

    /// Fold accented characters to plain ASCII
    #[arg(long)]
    pub ascii: bool,

    /// Write CSV and XPT copies of the result
    #[arg(long)]
    pub export: bool,

    /// Directory for exported files (default: current directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Keep the downloaded archive for later runs
    #[arg(long)]
    pub keep_cache: bool,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Legend {
            year,
            br_archive,
            options,
        } => harvest_command(DatasetKind::Legend, year, br_archive, &options),
        Commands::Seats { year, options } => {
            harvest_command(DatasetKind::Seats, year, false, &options)
        }
    }
}

/// Turn parsed arguments into a validated request.
pub fn build_request(
    kind: DatasetKind,
    year: u16,
    full_country: bool,
    options: &DatasetOptions,
) -> Result<DatasetRequest> {
    let regions = validate_region_filter(&options.uf)?;
    let request = DatasetRequest::new(kind, year)
        .with_regions(regions)
        .with_full_country(full_country)
        .with_encoding(options.encoding.as_str())
        .with_transliterate(options.ascii)
        .with_export(options.export)
        .with_keep_cache(options.keep_cache);
    validate_request(&request)?;
    Ok(request)
}

/// Execute a dataset command.
fn harvest_command(
    kind: DatasetKind,
    year: u16,
    full_country: bool,
    options: &DatasetOptions,
) -> Result<()> {
    // Validate inputs before making HTTP requests
    let request = build_request(kind, year, full_country, options)?;

    let mut config = HarvesterConfig::from_env();
    if let Some(output_dir) = options.output_dir.as_deref() {
        check_output_dir(output_dir)?;
        config.output_dir = output_dir.to_path_buf();
    }

    let scope = if full_country {
        "nationwide file".to_string()
    } else {
        format!("regions {}", request.regions)
    };
    println!(
        "{} {} data for {} ({})",
        style("Fetching").bold(),
        style(kind).cyan(),
        style(year).green(),
        scope
    );
    println!();

    let harvester = Harvester::new(config)?;

    // Create progress spinner
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let dataset = match harvester.fetch_with_progress(&request, |stage| {
        pb.set_message(stage.to_string());
    }) {
        Ok(dataset) => dataset,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    print_summary(&dataset);
    Ok(())
}

/// A user-supplied output directory must already exist.
fn check_output_dir(output_dir: &Path) -> Result<()> {
    if !output_dir.exists() {
        return Err(HarvesterError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Output directory does not exist: {}", output_dir.display()),
        )));
    }
    if !output_dir.is_dir() {
        return Err(HarvesterError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Output path is not a directory: {}", output_dir.display()),
        )));
    }
    Ok(())
}

fn print_summary(dataset: &Dataset) {
    let table = &dataset.table;
    println!("  Files: {}", table.sources.len());
    println!("  Rows: {}", style(table.len()).green());
    println!("  Columns: {}", table.columns.len());

    if !dataset.warnings.is_empty() {
        println!(
            "  Warnings: {}",
            style(dataset.warning_count()).yellow().bold()
        );
        for warning in &dataset.warnings {
            println!("    - {warning}");
        }
    }

    if let Some(files) = &dataset.exported {
        println!();
        println!("{} {}", style("Saved to:").green().bold(), files.csv.display());
        println!("{} {}", style("Saved to:").green().bold(), files.xpt.display());
    }
}
