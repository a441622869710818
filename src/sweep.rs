use crate::penalty::PenaltyReport;
use crate::randvars::SizeDistribution;
use crate::simulator::{SimParams, Simulation};
use crate::utils::prelude::*;

/// The rho grid: `rho_start, rho_start + rho_step, ...` up to but excluding `rho_stop`
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SweepConfig {
    pub rho_start: f64,
    pub rho_stop: f64,
    pub rho_step: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            rho_start: 0.15,
            rho_stop: 1.05,
            rho_step: 0.10,
        }
    }
}

impl SweepConfig {
    pub fn grid(&self) -> Result<Vec<f64>> {
        let finite = self.rho_start.is_finite() && self.rho_stop.is_finite() && self.rho_step.is_finite();
        if !finite || self.rho_step <= 0.0 || self.rho_start <= 0.0 {
            return Err(Error::parameter(format!(
                "sweep needs positive rho_start and rho_step, got {:?}",
                self
            )));
        }
        let span = (self.rho_stop - self.rho_start) / self.rho_step;
        // the stop value itself is excluded even when float error puts it a hair below
        let points = (span - 1e-9).ceil().max(0.0) as usize;
        Ok((0..points)
            .map(|i| self.rho_start + i as f64 * self.rho_step)
            .map(|rho| (rho * 1e9).round() / 1e9)
            .collect())
    }
}

/// Result of one grid point
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    /// starts at 1
    pub index: usize,
    pub rho: f64,
    pub messages: usize,
    pub report: PenaltyReport,
}

/// Run a full simulation for every rho in the grid, with everything else taken from `base`.
///
/// All grid points are validated before the first one runs.
pub fn run(dist: &SizeDistribution, base: &SimParams, sweep: &SweepConfig) -> Result<Vec<SweepPoint>> {
    let _g = info_span!("sweep").entered();

    let sims: Result<Vec<_>> = sweep
        .grid()?
        .into_iter()
        .map(|rho| Simulation::new(dist.clone(), SimParams { rho, ..base.clone() }))
        .collect();
    let sims = sims?;
    info!(points = sims.len(), steps = base.steps, "starting sweep");

    Ok(sims
        .iter()
        .enumerate()
        .map(|(idx, sim)| {
            let outcome = sim.run();
            let report = PenaltyReport::from_outcome(&outcome);
            let rho = sim.params().rho;
            info!(
                point = idx + 1,
                rho,
                compared = report.compared(),
                penalty = report.mean_penalty(),
                "sweep point done"
            );
            SweepPoint {
                index: idx + 1,
                rho,
                messages: outcome.messages.len(),
                report,
            }
        })
        .collect())
}
