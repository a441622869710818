//! The three queues a scheduler works on.
//!
//! Every queue keeps its sort order by inserting at the right spot, and ties always go behind
//! existing entries, so equal keys are served in insertion order.

use std::collections::VecDeque;

use crate::types::{DelayedPacket, Message, MsgId, Packet, Slot};
use crate::utils::prelude::*;

/// Messages waiting to be sent, ascending by remaining size
#[derive(Debug, Clone, Default)]
pub struct TransmitQueue {
    messages: Vec<Message>,
}

impl TransmitQueue {
    pub fn insert(&mut self, msg: Message) {
        let idx = self
            .messages
            .partition_point(|other| other.remaining <= msg.remaining);
        self.messages.insert(idx, msg);
    }

    /// Take one packet from the message with the least remaining size
    pub fn take_from_head(&mut self, priority: u64) -> Option<Packet> {
        let head = self.messages.first_mut()?;
        let packet = head.take_packet(priority);
        // decrementing the smallest entry keeps it the smallest
        if head.is_done() {
            self.messages.remove(0);
        }
        Some(packet)
    }

    /// Take one packet from every message, priority chosen from the remaining size before the cut.
    ///
    /// A uniform decrement keeps the order intact.
    pub fn take_from_each(&mut self, priority: impl Fn(&Message) -> u64) -> Vec<Packet> {
        let packets = self
            .messages
            .iter_mut()
            .map(|msg| {
                let prio = priority(&*msg);
                msg.take_packet(prio)
            })
            .collect();
        self.messages.retain(|msg| !msg.is_done());
        packets
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Packets not yet handed to the network
    pub fn backlog(&self) -> u64 {
        self.messages.iter().map(|m| m.remaining).sum()
    }
}

/// Packets in flight, ascending by remaining delay
#[derive(Debug, Clone, Default)]
pub struct DelayQueue {
    packets: VecDeque<DelayedPacket>,
}

impl DelayQueue {
    pub fn insert(&mut self, packet: DelayedPacket) {
        let idx = self
            .packets
            .partition_point(|other| other.remaining_delay <= packet.remaining_delay);
        self.packets.insert(idx, packet);
    }

    /// Pop the packets that have finished their delay before `slot`.
    ///
    /// Packets injected at `slot` itself stay, even with zero delay.
    fn release(&mut self, slot: Slot) -> impl Iterator<Item = Packet> + '_ {
        std::iter::from_fn(move || {
            let ready = self
                .packets
                .front()
                .map_or(false, |front| front.remaining_delay == 0 && front.injected < slot);
            if ready {
                self.packets.pop_front().map(|d| d.packet)
            } else {
                None
            }
        })
    }

    fn tick(&mut self) {
        for packet in self.packets.iter_mut() {
            packet.remaining_delay = packet.remaining_delay.saturating_sub(1);
        }
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DelayedPacket> {
        self.packets.iter()
    }
}

/// Packets out of the network, ascending by priority, FIFO within a priority
#[derive(Debug, Clone, Default)]
pub struct ReceiveQueue {
    packets: VecDeque<Packet>,
}

impl ReceiveQueue {
    pub fn insert(&mut self, packet: Packet) {
        let idx = self
            .packets
            .partition_point(|other| other.priority <= packet.priority);
        self.packets.insert(idx, packet);
    }

    pub fn pop(&mut self) -> Option<Packet> {
        self.packets.pop_front()
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.packets.iter()
    }
}

/// The queues owned by a single scheduler run
#[derive(Debug, Clone, Default)]
pub struct QueueSet {
    pub transmit: TransmitQueue,
    pub delay: DelayQueue,
    pub receive: ReceiveQueue,
}

impl QueueSet {
    /// Fresh, empty queues
    pub fn new() -> Self {
        Default::default()
    }

    pub fn inject(&mut self, slot: Slot, packet: Packet, delay: u64) {
        self.delay.insert(DelayedPacket {
            packet,
            remaining_delay: delay,
            injected: slot,
        });
    }

    /// Move packets that made it through the network to the receive queue,
    /// then age everything still in flight by one slot.
    ///
    /// Release happens before aging, so nothing leaves in the slot it was injected in.
    pub fn deplete(&mut self, slot: Slot) -> usize {
        let receive = &mut self.receive;
        let mut released = 0;
        for packet in self.delay.release(slot) {
            receive.insert(packet);
            released += 1;
        }
        self.delay.tick();
        trace!(slot, released, in_flight = self.delay.len(), "depleted delay queue");
        released
    }

    pub fn is_empty(&self) -> bool {
        self.transmit.is_empty() && self.delay.is_empty() && self.receive.is_empty()
    }

    /// Packets of a message still held somewhere in the queues
    pub fn outstanding(&self, id: MsgId) -> u64 {
        let transmit: u64 = self
            .transmit
            .iter()
            .filter(|m| m.id == id)
            .map(|m| m.remaining)
            .sum();
        let delay = self.delay.iter().filter(|d| d.packet.msg_id == id).count() as u64;
        let receive = self.receive.iter().filter(|p| p.msg_id == id).count() as u64;
        transmit + delay + receive
    }
}
