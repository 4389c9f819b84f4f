use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const ABOUT: &str = "rigidff CLI - a command-line harness for the rigidff molecular-mechanics \
force field for rigid-multibody dynamics.";
const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(version, about = ABOUT, help_template = HELP_TEMPLATE)]
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
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a two-body ethane demo, evaluate it, and print the energy
    /// breakdown and per-body spatial forces.
    Demo(DemoArgs),
    /// Print the human-readable dump of the compiled demo system.
    Dump,
}

/// Arguments for the `demo` subcommand.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// H-C-C-H dihedral angle between the two methyl bodies, in degrees.
    /// 60 is the staggered minimum, 0 the eclipsed maximum.
    #[arg(short, long, default_value_t = 60.0, value_name = "DEGREES")]
    pub angle: f64,
}
