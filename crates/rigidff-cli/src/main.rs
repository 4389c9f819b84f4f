mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};
use error::Result;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;
    match cli.command {
        Commands::Demo(args) => commands::demo::run(&args),
        Commands::Dump => commands::demo::dump(),
    }
}
