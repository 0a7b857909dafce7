use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Polyscreen Developers",
    version,
    about = "polyscreen - high-throughput screening of co-polymer compositions with external structure and electronic-structure engines.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Number of compositions evaluated concurrently during a screen.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Screen every (or a random sample of) composition built from a monomer list.
    Screen(ScreenArgs),
    /// Run the full property pipeline for a single composition.
    Evaluate(EvaluateArgs),
    /// Sort an existing screening output file by its first two columns.
    Sort(SortArgs),
}

/// Session parameters shared by `screen` and `evaluate`.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Path to a session configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Session name; also the name of the session directory.
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,

    /// Directory in which the session directory is created.
    #[arg(short, long, value_name = "PATH")]
    pub directory: Option<PathBuf>,

    /// Number of monomers in one repeat unit.
    #[arg(short = 'l', long, value_name = "INT")]
    pub repeat_length: Option<usize>,

    /// Number of repeat units in the constructed chain.
    #[arg(short = 'u', long, value_name = "INT")]
    pub repeat_units: Option<usize>,

    /// Number of conformers embedded during the conformer search.
    #[arg(long, value_name = "INT")]
    pub conformers: Option<usize>,

    /// Implicit solvent for the semiempirical calculations (e.g. THF, H2O).
    #[arg(short = 's', long, value_name = "NAME")]
    pub solvent: Option<String>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S engines.xtb=/opt/xtb/bin/xtb
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Composition selection flags for `screen`.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Screen this many randomly drawn compositions instead of the full space.
    #[arg(short, long, value_name = "COUNT")]
    pub random: Option<u64>,

    /// Seed for the random selection.
    #[arg(long, value_name = "INT", requires = "random")]
    pub seed: Option<u64>,

    /// Continue an interrupted screen, skipping compositions already in the work-log.
    #[arg(long)]
    pub resume: bool,
}

/// Arguments for the `screen` subcommand.
#[derive(Args, Debug)]
pub struct ScreenArgs {
    /// Monomer list: one `<identifier> <descriptor>` pair per line.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub monomers: PathBuf,

    #[command(flatten)]
    pub session: SessionArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Arguments for the `evaluate` subcommand.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Monomer descriptors, in repeat-unit order. They are named A, B, C, ...
    #[arg(required = true, value_name = "DESCRIPTOR")]
    pub descriptors: Vec<String>,

    /// Name of the working directory created inside the session directory.
    #[arg(long, required = true, value_name = "NAME")]
    pub label: String,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// Arguments for the `sort` subcommand.
#[derive(Args, Debug)]
pub struct SortArgs {
    /// Screening output file to sort in place.
    #[arg(required = true, value_name = "PATH")]
    pub file: PathBuf,
}
