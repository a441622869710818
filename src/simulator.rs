use rand::distributions::Distribution;
use rand::Rng;
use rand_seeder::{Seeder, SipRng};

use crate::randvars::{DelayModel, SizeDistribution};
use crate::schedulers::{Engine, SchedulerKind};
use crate::types::{DepartureLog, Message, MessageRecord, MessageTable, Slot};
use crate::utils::prelude::*;

/// Knobs of a single simulation
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SimParams {
    /// slots during which messages may arrive
    pub steps: u64,
    /// average input packet rate over output packet rate
    pub rho: f64,
    pub avg_delay: f64,
    pub fixed_delay: u64,
    pub seed: String,
    /// cap on the slots spent draining after arrivals stop, unbounded if `None`
    #[serde(default)]
    pub drain_limit: Option<u64>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            steps: 10000,
            rho: 0.5,
            avg_delay: 3.0,
            fixed_delay: 1,
            seed: "stripy zebra".into(),
            drain_limit: None,
        }
    }
}

/// What one scheduler did with the message trace
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub kind: SchedulerKind,
    pub departures: DepartureLog,
    /// number of slots simulated, including draining
    pub slots: Slot,
    /// false if draining stopped at the drain limit with packets left
    pub drained: bool,
    pub transmitted: u64,
    pub retired: u64,
}

/// Both runs over one identical arrival trace
#[derive(Debug, Clone, PartialEq)]
pub struct SimOutcome {
    pub messages: MessageTable,
    pub simple: RunResult,
    pub ideal: RunResult,
}

impl SimOutcome {
    pub fn run(&self, kind: SchedulerKind) -> &RunResult {
        match kind {
            SchedulerKind::Simple => &self.simple,
            SchedulerKind::Ideal => &self.ideal,
        }
    }
}

/// Runs the simple scheduler on freshly generated arrivals, then replays the same arrivals
/// through the ideal scheduler.
#[derive(Debug, Clone)]
pub struct Simulation {
    dist: SizeDistribution,
    params: SimParams,
    delay: DelayModel,
    prob_per_slot: f64,
}

impl Simulation {
    /// Everything is validated here, a constructed simulation always runs
    pub fn new(dist: SizeDistribution, params: SimParams) -> Result<Self> {
        if !params.rho.is_finite() || params.rho <= 0.0 {
            return Err(Error::parameter(format!(
                "rho must be a positive number, got {}",
                params.rho
            )));
        }
        let delay = DelayModel::new(params.avg_delay, params.fixed_delay)?;
        let prob_per_slot = params.rho / dist.mean();
        if params.rho >= 1.0 && params.drain_limit.is_none() {
            warn!(rho = params.rho, "unstable load without drain_limit, draining may take very long");
        }
        Ok(Self {
            dist,
            params,
            delay,
            prob_per_slot,
        })
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Chance of a new message arriving in any slot
    pub fn prob_per_slot(&self) -> f64 {
        self.prob_per_slot
    }

    /// Run both schedulers. The whole outcome is determined by the params and the distribution.
    #[instrument(skip(self), fields(rho = self.params.rho, steps = self.params.steps))]
    pub fn run(&self) -> SimOutcome {
        let mut rng: SipRng = Seeder::from(self.params.seed.as_str()).make_rng();

        let (messages, simple) = self.generate(SchedulerKind::Simple, &mut rng);
        let ideal = self.replay(SchedulerKind::Ideal, &messages, &mut rng);

        info!(
            messages = messages.len(),
            simple.slots = simple.slots,
            ideal.slots = ideal.slots,
            "simulation done"
        );
        SimOutcome {
            messages,
            simple,
            ideal,
        }
    }

    /// Draw new arrivals for every slot in `[0, steps)` while driving `kind`
    fn generate<R: Rng + ?Sized>(&self, kind: SchedulerKind, rng: &mut R) -> (MessageTable, RunResult) {
        let _g = debug_span!("generate", scheduler = %kind).entered();

        let mut engine = Engine::new(kind, self.delay.clone());
        let mut messages = MessageTable::default();
        let mut log = DepartureLog::default();

        for slot in 0..self.params.steps {
            if rng.gen::<f64>() < self.prob_per_slot {
                let id = messages.len();
                let size = self.dist.sample(rng);
                messages.insert(id, MessageRecord { size, arrival: slot });
                engine.admit(Message::new(id, size, slot));
            }
            if let Some(departure) = engine.advance_one_slot(slot, rng) {
                log.record(departure);
            }
        }
        debug!(messages = messages.len(), "arrivals generated");

        let result = self.drain(engine, log, rng);
        (messages, result)
    }

    /// Feed the recorded arrivals to `kind` at their arrival slots
    fn replay<R: Rng + ?Sized>(&self, kind: SchedulerKind, messages: &MessageTable, rng: &mut R) -> RunResult {
        let _g = debug_span!("replay", scheduler = %kind).entered();

        let mut engine = Engine::new(kind, self.delay.clone());
        let mut log = DepartureLog::default();
        let mut arrivals = messages.iter().peekable();

        for slot in 0..self.params.steps {
            while let Some((id, msg)) = arrivals.next_if(|(_, msg)| msg.arrival == slot) {
                engine.admit(Message::new(*id, msg.size, msg.arrival));
            }
            if let Some(departure) = engine.advance_one_slot(slot, rng) {
                log.record(departure);
            }
        }

        self.drain(engine, log, rng)
    }

    /// Keep going after arrivals stop until every queue is empty, or the drain limit is hit
    fn drain<R: Rng + ?Sized>(&self, mut engine: Engine, mut log: DepartureLog, rng: &mut R) -> RunResult {
        let mut slot = self.params.steps;
        let mut drained = true;
        while !engine.is_idle() {
            if let Some(limit) = self.params.drain_limit {
                if slot - self.params.steps >= limit {
                    warn!(
                        scheduler = %engine.kind(),
                        limit,
                        backlog = engine.queues().transmit.backlog(),
                        in_flight = engine.queues().delay.len(),
                        "drain limit reached, giving up on remaining packets"
                    );
                    drained = false;
                    break;
                }
            }
            if let Some(departure) = engine.advance_one_slot(slot, rng) {
                log.record(departure);
            }
            slot += 1;
        }
        debug!(scheduler = %engine.kind(), slots = slot, drained, "run finished");

        RunResult {
            kind: engine.kind(),
            departures: log,
            slots: slot,
            drained,
            transmitted: engine.transmitted(),
            retired: engine.retired(),
        }
    }
}
