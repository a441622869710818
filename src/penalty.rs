use std::collections::BTreeMap;

use crate::simulator::SimOutcome;
use crate::types::{DepartureLog, MessageTable, MsgId, Slot};

/// Running sum and count
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// 0.0 when nothing was added
    pub fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Completion times of one message under both schedulers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessagePenalty {
    pub id: MsgId,
    pub size: u64,
    pub completion_simple: Slot,
    pub completion_ideal: Slot,
}

impl MessagePenalty {
    /// Extra completion time of the simple scheduler, relative to the ideal one
    pub fn penalty(&self) -> f64 {
        self.slot_difference() / self.completion_ideal as f64
    }

    pub fn slot_difference(&self) -> f64 {
        self.completion_simple as f64 - self.completion_ideal as f64
    }
}

/// Every message that completed under both schedulers
pub fn message_penalties<'a>(
    messages: &'a MessageTable,
    simple: &'a DepartureLog,
    ideal: &'a DepartureLog,
) -> impl Iterator<Item = MessagePenalty> + 'a {
    messages.iter().filter_map(move |(id, msg)| {
        let completion_simple = simple.completion_time(*id, msg)?;
        // a completion takes at least one slot, guard the division anyway
        let completion_ideal = ideal.completion_time(*id, msg).filter(|c| *c > 0)?;
        Some(MessagePenalty {
            id: *id,
            size: msg.size,
            completion_simple,
            completion_ideal,
        })
    })
}

/// Penalty of the simple scheduler over the ideal one, overall and per message size
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PenaltyReport {
    overall: Mean,
    slot_difference: Mean,
    per_size: BTreeMap<u64, Mean>,
}

impl PenaltyReport {
    pub fn from_logs(messages: &MessageTable, simple: &DepartureLog, ideal: &DepartureLog) -> Self {
        message_penalties(messages, simple, ideal).collect()
    }

    pub fn from_outcome(outcome: &SimOutcome) -> Self {
        Self::from_logs(
            &outcome.messages,
            &outcome.simple.departures,
            &outcome.ideal.departures,
        )
    }

    pub fn add(&mut self, msg: &MessagePenalty) {
        let penalty = msg.penalty();
        self.overall.add(penalty);
        self.slot_difference.add(msg.slot_difference());
        self.per_size.entry(msg.size).or_default().add(penalty);
    }

    /// Number of messages that completed under both schedulers
    pub fn compared(&self) -> usize {
        self.overall.count()
    }

    pub fn mean_penalty(&self) -> f64 {
        self.overall.value()
    }

    /// Mean of `completion_simple - completion_ideal`, in slots
    pub fn mean_slot_difference(&self) -> f64 {
        self.slot_difference.value()
    }

    pub fn mean_penalty_for(&self, size: u64) -> Option<f64> {
        self.per_size.get(&size).map(Mean::value)
    }

    /// Ascending by size
    pub fn per_size(&self) -> impl Iterator<Item = (u64, &Mean)> {
        self.per_size.iter().map(|(size, mean)| (*size, mean))
    }
}

impl Extend<MessagePenalty> for PenaltyReport {
    fn extend<T: IntoIterator<Item = MessagePenalty>>(&mut self, iter: T) {
        for msg in iter {
            self.add(&msg);
        }
    }
}

impl std::iter::FromIterator<MessagePenalty> for PenaltyReport {
    fn from_iter<T: IntoIterator<Item = MessagePenalty>>(iter: T) -> Self {
        let mut report = Self::default();
        report.extend(iter);
        report
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::types::{Departure, MessageRecord, Packet};

    fn depart(log: &mut DepartureLog, id: MsgId, slots: &[Slot]) {
        for (idx, slot) in slots.iter().enumerate() {
            let packet = Packet {
                msg_id: id,
                remaining_size: (slots.len() - idx) as u64,
                priority: 0,
            };
            log.record(Departure::new(*slot, packet));
        }
    }

    #[test]
    fn penalty_per_message_and_size() {
        let mut messages = MessageTable::default();
        messages.insert(0, MessageRecord { size: 1, arrival: 0 });
        messages.insert(1, MessageRecord { size: 2, arrival: 5 });
        messages.insert(2, MessageRecord { size: 1, arrival: 6 });

        let mut simple = DepartureLog::default();
        let mut ideal = DepartureLog::default();
        depart(&mut simple, 0, &[4]);
        depart(&mut ideal, 0, &[2]);
        depart(&mut simple, 1, &[8, 11]);
        depart(&mut ideal, 1, &[8, 10]);
        depart(&mut simple, 2, &[9]);
        depart(&mut ideal, 2, &[9]);

        let report = PenaltyReport::from_logs(&messages, &simple, &ideal);
        assert_eq!(report.compared(), 3);
        // (4 - 2) / 2, (6 - 5) / 5, 0
        assert_abs_diff_eq!(report.mean_penalty(), (1.0 + 0.2 + 0.0) / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.mean_slot_difference(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.mean_penalty_for(1).unwrap(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(report.mean_penalty_for(2).unwrap(), 0.2, epsilon = 1e-12);
        assert_eq!(report.mean_penalty_for(3), None);
        let sizes: Vec<_> = report.per_size().map(|(size, m)| (size, m.count())).collect();
        assert_eq!(sizes, vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn messages_missing_from_a_log_are_skipped() {
        let mut messages = MessageTable::default();
        messages.insert(0, MessageRecord { size: 1, arrival: 0 });
        messages.insert(1, MessageRecord { size: 2, arrival: 0 });
        messages.insert(2, MessageRecord { size: 1, arrival: 0 });

        let mut simple = DepartureLog::default();
        let mut ideal = DepartureLog::default();
        depart(&mut simple, 0, &[3]);
        depart(&mut ideal, 0, &[3]);
        // only half of message 1 made it out under the simple scheduler
        depart(&mut simple, 1, &[4]);
        depart(&mut ideal, 1, &[4, 5]);
        depart(&mut ideal, 2, &[6]);

        let penalties: Vec<_> = message_penalties(&messages, &simple, &ideal).collect();
        assert_eq!(penalties.len(), 1);
        assert_eq!(penalties[0].id, 0);
    }

    #[test]
    fn empty_report() {
        let report = PenaltyReport::from_logs(&Default::default(), &Default::default(), &Default::default());
        assert_eq!(report.compared(), 0);
        assert_eq!(report.mean_penalty(), 0.0);
        assert_eq!(report.mean_slot_difference(), 0.0);
        assert_eq!(report.per_size().count(), 0);
    }
}
