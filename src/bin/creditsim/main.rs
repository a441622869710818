use creditsim::utils;
use creditsim::utils::prelude::*;
use structopt::StructOpt;

mod cli;
mod commands;

fn main() -> Result<()> {
    // panic setup should be done early
    utils::panic::setup();

    // defaults and environment, then whatever the command line asks for
    utils::app_config::setup()?;
    let cli = cli::Cli::from_args();
    cli.apply_config()?;

    // logging is configured from the final config
    let _guard = utils::logging::setup()?;

    trace!("Start cli execution");

    cli.execute()
}
