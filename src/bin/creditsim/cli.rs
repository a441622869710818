use std::path::PathBuf;

use structopt::StructOpt;

use crate::commands::{self, Cmd};
use creditsim::utils::prelude::*;

/// Compare a single priority SRPT scheduler against an ideal oracle scheduler
#[derive(StructOpt)]
#[structopt(name = "creditsim")]
pub struct Cli {
    /// Set a custom config file
    #[structopt(short, long, value_name = "FILE", parse(from_os_str), global = true)]
    config: Option<PathBuf>,

    /// Apply a preset defined in the config
    #[structopt(short, long, value_name = "NAME", global = true)]
    preset: Option<String>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum Command {
    Config(commands::Config),
    Run(commands::Run),
    Sweep(commands::Sweep),
}

impl Cli {
    /// Merge the config file and the preset, in that order
    pub fn apply_config(&self) -> Result<()> {
        let mut cfg = config_mut();
        if let Some(path) = &self.config {
            cfg.use_file(path)?;
        }
        if let Some(name) = &self.preset {
            cfg.use_preset(name)?;
        }
        Ok(())
    }

    pub fn execute(self) -> Result<()> {
        match self.cmd {
            Command::Config(cmd) => cmd.run(),
            Command::Run(cmd) => cmd.run(),
            Command::Sweep(cmd) => cmd.run(),
        }
    }
}
