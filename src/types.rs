use std::collections::btree_map::{self, BTreeMap};

use parse_display::Display;
use serde::Serialize;

/// A discrete simulation time unit, one packet time
pub type Slot = u64;

/// Message ids are handed out sequentially from 0
pub type MsgId = usize;

/// A message waiting in the transmit queue
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("Message({id}, {remaining}/{size} @{arrival})")]
pub struct Message {
    pub id: MsgId,
    /// size in packets, never changes
    pub size: u64,
    /// packets not yet handed to the network
    pub remaining: u64,
    pub arrival: Slot,
}

impl Message {
    pub fn new(id: MsgId, size: u64, arrival: Slot) -> Self {
        Self {
            id,
            size,
            remaining: size,
            arrival,
        }
    }

    /// Cut one packet off this message.
    ///
    /// The packet carries the remaining size before the cut.
    pub fn take_packet(&mut self, priority: u64) -> Packet {
        debug_assert!(self.remaining > 0, "{} has nothing left to send", self);
        let packet = Packet {
            msg_id: self.id,
            remaining_size: self.remaining,
            priority,
        };
        self.remaining -= 1;
        packet
    }

    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("Packet({msg_id}, rem {remaining_size}, prio {priority})")]
pub struct Packet {
    pub msg_id: MsgId,
    /// remaining size of the message when this packet was scheduled
    pub remaining_size: u64,
    /// smaller is served first
    pub priority: u64,
}

/// A packet travelling through the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("{packet} +{remaining_delay}")]
pub struct DelayedPacket {
    pub packet: Packet,
    /// slots left until the packet exits the network
    pub remaining_delay: u64,
    /// slot at which the packet entered the network
    pub injected: Slot,
}

/// One packet leaving the receive queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[display("@{slot} prio {priority} rem {remaining_size}")]
pub struct PacketDeparture {
    pub slot: Slot,
    pub priority: u64,
    pub remaining_size: u64,
}

/// A departure together with the message it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("Departure({msg_id}, {record})")]
pub struct Departure {
    pub msg_id: MsgId,
    pub record: PacketDeparture,
}

impl Departure {
    pub fn new(slot: Slot, packet: Packet) -> Self {
        Self {
            msg_id: packet.msg_id,
            record: PacketDeparture {
                slot,
                priority: packet.priority,
                remaining_size: packet.remaining_size,
            },
        }
    }
}

/// What is remembered of a generated message once it is handed to a scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[display("size {size} @{arrival}")]
pub struct MessageRecord {
    pub size: u64,
    pub arrival: Slot,
}

/// All messages generated in one simulation, keyed by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageTable(BTreeMap<MsgId, MessageRecord>);

impl MessageTable {
    pub fn insert(&mut self, id: MsgId, record: MessageRecord) {
        self.0.insert(id, record);
    }

    pub fn get(&self, id: MsgId) -> Option<&MessageRecord> {
        self.0.get(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// In id order, which is also arrival order
    pub fn iter(&self) -> btree_map::Iter<'_, MsgId, MessageRecord> {
        self.0.iter()
    }

    /// Total number of packets over all messages
    pub fn packet_count(&self) -> u64 {
        self.0.values().map(|r| r.size).sum()
    }
}

/// Per-message departure records of one scheduler run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartureLog(BTreeMap<MsgId, Vec<PacketDeparture>>);

impl DepartureLog {
    pub fn record(&mut self, departure: Departure) {
        self.0
            .entry(departure.msg_id)
            .or_default()
            .push(departure.record);
    }

    pub fn packets(&self, id: MsgId) -> &[PacketDeparture] {
        self.0.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Slot of the last departure of a message, if any of its packets left
    pub fn last_departure(&self, id: MsgId) -> Option<Slot> {
        self.packets(id).iter().map(|d| d.slot).max()
    }

    /// Completion time of a message, only if all of its packets left
    pub fn completion_time(&self, id: MsgId, msg: &MessageRecord) -> Option<Slot> {
        if self.packets(id).len() as u64 != msg.size {
            return None;
        }
        self.last_departure(id).map(|last| last - msg.arrival)
    }

    /// Number of messages with at least one departure
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, MsgId, Vec<PacketDeparture>> {
        self.0.iter()
    }

    pub fn packet_count(&self) -> u64 {
        self.0.values().map(|v| v.len() as u64).sum()
    }
}
