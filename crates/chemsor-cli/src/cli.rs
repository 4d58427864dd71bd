//! Command-line arguments for `chemsor`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "chemsor",
    version,
    about = "ChemSoR - TRI source-reduction data pipeline",
    long_about = "Build the ChemSoR database from EPA Toxics Release Inventory 2a files.\n\n\
                  Downloads the yearly archives, reshapes the wide records into a\n\
                  normalized schema, resolves CAS numbers and SMILES for each chemical,\n\
                  and reloads the SQLite database."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Settings file (default: ./chemsor.toml when present).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Acquire, transform, enrich, and load in one run.
    Run(RunArgs),

    /// Download the yearly archives into the raw directory.
    Acquire(AcquireArgs),

    /// Turn the raw yearly files into the CSV tables.
    Transform(TransformArgs),

    /// Replace the SQLite database with the CSV tables.
    Load(PathArgs),

    /// Print the output tables declared by the schema registry.
    Schema,
}

/// Overrides for the directories in the settings file.
#[derive(Args, Default)]
pub struct PathArgs {
    /// Directory holding the yearly wide CSV files.
    #[arg(long = "raw-dir", value_name = "DIR")]
    pub raw_dir: Option<PathBuf>,

    /// Directory receiving the CSV tables.
    #[arg(long = "transformed-dir", value_name = "DIR")]
    pub transformed_dir: Option<PathBuf>,

    /// SQLite database file.
    #[arg(long = "database", value_name = "PATH")]
    pub database: Option<PathBuf>,
}

#[derive(Args)]
pub struct EnrichArgs {
    /// Skip CAS number and SMILES resolution.
    #[arg(long = "no-enrich")]
    pub no_enrich: bool,

    /// Concurrent lookup workers (overrides the settings file).
    #[arg(long = "workers", value_name = "N")]
    pub workers: Option<usize>,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    #[command(flatten)]
    pub enrich: EnrichArgs,

    /// Use the files already in the raw directory.
    #[arg(long = "skip-acquire")]
    pub skip_acquire: bool,

    /// Only acquire these years (repeatable).
    #[arg(long = "year", value_name = "YEAR")]
    pub years: Vec<i32>,
}

#[derive(Args)]
pub struct AcquireArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Only acquire these years (repeatable).
    #[arg(long = "year", value_name = "YEAR")]
    pub years: Vec<i32>,
}

#[derive(Args)]
pub struct TransformArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    #[command(flatten)]
    pub enrich: EnrichArgs,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
