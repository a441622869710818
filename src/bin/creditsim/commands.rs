use itertools::Itertools;
use structopt::StructOpt;

use creditsim::penalty::message_penalties;
use creditsim::utils::prelude::*;

/// Should be implemented by individual subcommand
pub trait Cmd {
    fn run(self) -> Result<()>;
}

/// Show the effective configuration
#[derive(StructOpt)]
pub struct Config {}

impl Cmd for Config {
    fn run(self) -> Result<()> {
        print!("{}", config().dump()?);
        Ok(())
    }
}

/// Run both schedulers on one arrival trace and print the penalty
#[derive(StructOpt)]
pub struct Run {
    /// Override the configured input rate
    #[structopt(long)]
    rho: Option<f64>,

    /// Also print completion times of every message
    #[structopt(long)]
    per_message: bool,
}

impl Cmd for Run {
    fn run(self) -> Result<()> {
        let (outcome, report) = creditsim::run_sim(self.rho)?;

        if self.per_message {
            println!("id\tsize\tsimple\tideal\tpenalty");
            let simple = &outcome.simple.departures;
            let ideal = &outcome.ideal.departures;
            for msg in message_penalties(&outcome.messages, simple, ideal) {
                println!(
                    "{}\t{}\t{}\t{}\t{:.4}",
                    msg.id,
                    msg.size,
                    msg.completion_simple,
                    msg.completion_ideal,
                    msg.penalty()
                );
            }
        }

        println!("messages: {}", outcome.messages.len());
        println!("compared: {}", report.compared());
        println!("slots: simple {}, ideal {}", outcome.simple.slots, outcome.ideal.slots);
        println!("mean penalty: {:.4}", report.mean_penalty());
        println!("mean extra slots: {:.4}", report.mean_slot_difference());
        println!(
            "penalty per size: {}",
            report
                .per_size()
                .map(|(size, mean)| format!("{}={:.4}", size, mean.value()))
                .join(" ")
        );
        if !(outcome.simple.drained && outcome.ideal.drained) {
            warn!("drain limit reached, unfinished messages are not compared");
        }
        Ok(())
    }
}

/// Sweep the input rate and write the penalty tables
#[derive(StructOpt)]
pub struct Sweep {}

impl Cmd for Sweep {
    fn run(self) -> Result<()> {
        let points = creditsim::run_sweep()?;
        for point in points.iter() {
            println!(
                "{}\trho {:.2}\tmessages {}\tpenalty {:.4}",
                point.index,
                point.rho,
                point.messages,
                point.report.mean_penalty()
            );
        }
        Ok(())
    }
}
