use std::process::ExitCode;

use clap::Parser;

use glassfe::{cli, logger};

fn main() -> ExitCode {
    // Session log (overwrites the previous session's log)
    logger::init();

    let args = cli::CliArgs::parse();
    cli::run(args)
}
