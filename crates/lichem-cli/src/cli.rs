use clap::{Args, Parser, Subcommand};
use lichem::core::io::poles::PoleUnits;
use lichem::core::multipoles::layout::SiteLayout;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Eric G. Kratz",
    version,
    about = "LICHEM CLI - local-frame multipoles to point-charge embedding fields for QM/MM simulations.",
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

    /// Total number of CPUs available to LICHEM; the worker pool is sized from this and the
    /// per-call QM CPU count. Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the point-charge embedding field and write one charge file per replica.
    Embed(EmbedArgs),
    /// Print the global-frame multipoles of every atom for one replica.
    GlobalPoles(GlobalPolesArgs),
    /// Validate a settings file and print the resulting run summary.
    Check(CheckArgs),
}

/// Structure and multipole inputs shared by the commands that build a system.
#[derive(Args, Debug, Clone)]
pub struct SystemInputs {
    /// LICHEM XYZ file with one replica of the structure (Å).
    #[arg(short = 'x', long, required = true, value_name = "PATH")]
    pub xyz: PathBuf,

    /// Local-frame multipole table (CSV).
    #[arg(short = 'p', long, required = true, value_name = "PATH")]
    pub poles: PathBuf,

    /// Simulation settings file in TOML format.
    #[arg(short = 'c', long, required = true, value_name = "PATH")]
    pub settings: PathBuf,

    /// Bead structure with `atoms * beads` entries, atom-major. Required for NEB and ENEB.
    #[arg(short = 'b', long, value_name = "PATH")]
    pub beads: Option<PathBuf>,

    /// Units of the pole table moments, overriding the settings file.
    #[arg(long, value_name = "UNITS")]
    pub pole_units: Option<PoleUnits>,

    /// Override the charge-site layout (octahedron, icosahedron, dodecahedron).
    #[arg(long, value_name = "LAYOUT")]
    pub layout: Option<SiteLayout>,

    /// Override the charge-site radius in bohr.
    #[arg(long, value_name = "FLOAT")]
    pub site_radius: Option<f64>,

    /// Override the highest multipole order reproduced by the sites (0-3).
    #[arg(long, value_name = "INT")]
    pub max_order: Option<usize>,

    /// Fail when the site layout cannot reproduce the requested order.
    #[arg(long)]
    pub strict: bool,

    /// Skip the per-atom charge and dipole conservation checks.
    #[arg(long)]
    pub no_checks: bool,

    /// Set a specific configuration value, overriding the settings file.
    /// Can be used multiple times. Example: -S embedding.site-radius=0.6
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `embed` subcommand.
#[derive(Args, Debug)]
pub struct EmbedArgs {
    #[command(flatten)]
    pub inputs: SystemInputs,

    /// Output path for the embedding charges. With several replicas the replica index is
    /// appended to the file stem.
    #[arg(short, long, default_value = "embedding.chg", value_name = "PATH")]
    pub output: PathBuf,
}

/// Arguments for the `global-poles` subcommand.
#[derive(Args, Debug)]
pub struct GlobalPolesArgs {
    #[command(flatten)]
    pub inputs: SystemInputs,

    /// Replica (bead) to report.
    #[arg(short, long, default_value_t = 0, value_name = "INT")]
    pub replica: usize,

    /// Write the report to a file instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Simulation settings file in TOML format.
    #[arg(short = 'c', long, required = true, value_name = "PATH")]
    pub settings: PathBuf,

    /// Number of atoms to validate region indices against.
    #[arg(short = 'n', long, value_name = "INT")]
    pub atoms: Option<usize>,

    /// Override the CPUs requested per QM engine invocation.
    #[arg(long, value_name = "NUM")]
    pub ncpus: Option<usize>,
}
