use parse_display::{Display, FromStr};
use rand::distributions::Distribution;
use rand::Rng;

use crate::queues::{QueueSet, TransmitQueue};
use crate::randvars::DelayModel;
use crate::types::{Departure, Message, Packet, Slot};
use crate::utils::prelude::*;

/// Priority of every packet sent by [`Simple`]
pub const SIMPLE_PRIORITY: u64 = 0;

/// A scheduling policy only decides which packets leave the transmit queue in a slot.
/// Everything after that is the same for all policies and handled by [`Engine`].
pub trait Scheduler {
    fn kind(&self) -> SchedulerKind;

    /// Cut the packets to send in this slot off the transmit queue
    fn transmit(&mut self, queue: &mut TransmitQueue) -> Vec<Packet>;
}

impl Scheduler for Box<dyn Scheduler> {
    #[inline]
    fn kind(&self) -> SchedulerKind {
        (**self).kind()
    }

    #[inline]
    fn transmit(&mut self, queue: &mut TransmitQueue) -> Vec<Packet> {
        (**self).transmit(queue)
    }
}

/// SRPT with a single priority class.
///
/// One packet per slot, from the message with the least remaining size. All packets share one
/// priority, so the receive queue is FIFO and a packet that is delayed longer in the network blocks
/// the ones behind it.
#[derive(Debug, Default)]
pub struct Simple;

impl Scheduler for Simple {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Simple
    }

    fn transmit(&mut self, queue: &mut TransmitQueue) -> Vec<Packet> {
        queue.take_from_head(SIMPLE_PRIORITY).into_iter().collect()
    }
}

/// The oracle: one packet from every pending message in each slot, each with its remaining size as
/// priority. The receive queue then always serves the smallest remaining message first, hiding
/// the variance of the network delay.
#[derive(Debug, Default)]
pub struct Ideal;

impl Scheduler for Ideal {
    fn kind(&self) -> SchedulerKind {
        SchedulerKind::Ideal
    }

    fn transmit(&mut self, queue: &mut TransmitQueue) -> Vec<Packet> {
        queue.take_from_each(|msg| msg.remaining)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromStr, serde::Deserialize, serde::Serialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    Simple,
    Ideal,
}

impl SchedulerKind {
    pub const ALL: [SchedulerKind; 2] = [SchedulerKind::Simple, SchedulerKind::Ideal];
}

pub fn from_kind(kind: SchedulerKind) -> Box<dyn Scheduler> {
    match kind {
        SchedulerKind::Simple => Box::new(Simple),
        SchedulerKind::Ideal => Box::new(Ideal),
    }
}

/// Drives one scheduler over its own set of queues, one slot at a time
pub struct Engine {
    scheduler: Box<dyn Scheduler>,
    queues: QueueSet,
    delay: DelayModel,
    transmitted: u64,
    retired: u64,
}

impl Engine {
    pub fn new(kind: SchedulerKind, delay: DelayModel) -> Self {
        Self::with_scheduler(from_kind(kind), delay)
    }

    pub fn with_scheduler(scheduler: Box<dyn Scheduler>, delay: DelayModel) -> Self {
        Self {
            scheduler,
            queues: QueueSet::new(),
            delay,
            transmitted: 0,
            retired: 0,
        }
    }

    /// Put a newly arrived message into the transmit queue
    pub fn admit(&mut self, msg: Message) {
        trace!(scheduler = %self.kind(), %msg, "admit");
        self.queues.transmit.insert(msg);
    }

    /// Run a single slot: transmit, propagate through the network, retire at most one packet
    pub fn advance_one_slot<R: Rng + ?Sized>(&mut self, slot: Slot, rng: &mut R) -> Option<Departure> {
        let packets = self.scheduler.transmit(&mut self.queues.transmit);
        self.transmitted += packets.len() as u64;
        for packet in packets {
            let delay = self.delay.sample(rng);
            self.queues.inject(slot, packet, delay);
        }

        self.queues.deplete(slot);

        let departure = self
            .queues
            .receive
            .pop()
            .map(|packet| Departure::new(slot, packet));
        if let Some(departure) = &departure {
            self.retired += 1;
            trace!(scheduler = %self.kind(), %departure, "retire");
        }
        departure
    }

    /// Nothing left in any queue
    pub fn is_idle(&self) -> bool {
        self.queues.is_empty()
    }

    pub fn kind(&self) -> SchedulerKind {
        self.scheduler.kind()
    }

    pub fn queues(&self) -> &QueueSet {
        &self.queues
    }

    /// Packets handed to the network so far
    pub fn transmitted(&self) -> u64 {
        self.transmitted
    }

    /// Packets that left the receive queue so far
    pub fn retired(&self) -> u64 {
        self.retired
    }
}
