use crate::config::AppConfigExt;
use crate::utils::prelude::*;

mod config;
pub mod output;
pub mod penalty;
pub mod queues;
pub mod randvars;
pub mod schedulers;
pub mod simulator;
pub mod sweep;
pub mod types;
pub mod utils;

pub use crate::penalty::PenaltyReport;
pub use crate::randvars::{DelayModel, SizeDistribution};
pub use crate::schedulers::{Engine, SchedulerKind};
pub use crate::simulator::{SimOutcome, SimParams, Simulation};
pub use crate::sweep::{SweepConfig, SweepPoint};

/// Run both schedulers once with the configured parameters, `rho` overrides the configured one
pub fn run_sim(rho: Option<f64>) -> Result<(SimOutcome, PenaltyReport)> {
    let _g = info_span!("sim").entered();

    let (dist, mut params) = {
        let cfg = config();
        (cfg.size_distribution()?, cfg.sim_params()?)
    };
    if let Some(rho) = rho {
        params.rho = rho;
    }
    let sim = Simulation::new(dist, params)?;

    let outcome = sim.run();
    let report = PenaltyReport::from_outcome(&outcome);
    info!(
        compared = report.compared(),
        penalty = report.mean_penalty(),
        "penalty of simple over ideal"
    );

    Ok((outcome, report))
}

/// Run the configured rho sweep and write the penalty tables to the output directory
pub fn run_sweep() -> Result<Vec<SweepPoint>> {
    let (dist, params, grid, output_dir) = {
        let cfg = config();
        (
            cfg.size_distribution()?,
            cfg.sim_params()?,
            cfg.sweep()?,
            cfg.output_dir()?,
        )
    };

    let points = sweep::run(&dist, &params, &grid)?;

    {
        let _g = info_span!("output").entered();
        let mean_delay = params.avg_delay + params.fixed_delay as f64;
        output::write_sweep(output_dir.path(), &points, mean_delay)?;
    }

    Ok(points)
}
