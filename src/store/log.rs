use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::{AgentId, Message, MessageId, MessagePatch};

/// Aggregate over one agent's sequence, consumed by the hierarchy projector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentStats {
    pub message_count: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Append-only, per-agent ordered message sequences.
///
/// Order is append order, never re-sorted. The log does not cross-check agent
/// ids against the directory; an unseen agent id simply gets an empty
/// sequence on first write.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: BTreeMap<AgentId, Vec<Message>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message. Idempotent by message id: a duplicate id within
    /// the same agent's sequence is a no-op returning `false`. This tolerates
    /// replays from asynchronous completions racing to record the same turn.
    pub fn append(&mut self, message: Message) -> bool {
        let sequence = self.entries.entry(message.agent_id.clone()).or_default();
        if sequence.iter().any(|m| m.id == message.id) {
            debug!(message = %message.id, agent = %message.agent_id, "duplicate append ignored");
            return false;
        }
        sequence.push(message);
        true
    }

    /// Merge a patch into the message with this id, wherever it lives.
    /// Message ids are globally unique, so the first hit is the only hit.
    /// No-op returning `false` when the id is unknown.
    pub fn update(&mut self, message_id: &MessageId, patch: MessagePatch) -> bool {
        for sequence in self.entries.values_mut() {
            if let Some(message) = sequence.iter_mut().find(|m| &m.id == message_id) {
                patch.apply_to(message);
                return true;
            }
        }
        false
    }

    /// Remove one entry, preserving the relative order of the remainder.
    pub fn delete(&mut self, agent_id: &AgentId, message_id: &MessageId) -> bool {
        let Some(sequence) = self.entries.get_mut(agent_id) else {
            return false;
        };
        let before = sequence.len();
        sequence.retain(|m| &m.id != message_id);
        sequence.len() != before
    }

    /// Drop the entire sequence for one agent (privacy/reset flows).
    pub fn clear(&mut self, agent_id: &AgentId) {
        self.entries.remove(agent_id);
    }

    /// The sequence in append order. Empty slice for unknown agents, never an
    /// error.
    pub fn list(&self, agent_id: &AgentId) -> &[Message] {
        self.entries
            .get(agent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self, agent_id: &AgentId) -> usize {
        self.list(agent_id).len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    pub fn stats_for(&self, agent_id: &AgentId) -> AgentStats {
        let sequence = self.list(agent_id);
        AgentStats {
            message_count: sequence.len(),
            last_activity: sequence.last().map(|m| m.timestamp),
        }
    }

    /// Per-agent aggregates for every agent the log has seen.
    pub fn stats(&self) -> BTreeMap<AgentId, AgentStats> {
        self.entries
            .keys()
            .map(|id| (id.clone(), self.stats_for(id)))
            .collect()
    }

    /// Trim one agent's sequence to its newest `keep` messages. Returns how
    /// many were dropped.
    pub fn enforce_retention(&mut self, agent_id: &AgentId, keep: usize) -> usize {
        let Some(sequence) = self.entries.get_mut(agent_id) else {
            return 0;
        };
        if sequence.len() <= keep {
            return 0;
        }
        let dropped = sequence.len() - keep;
        sequence.drain(..dropped);
        debug!(agent = %agent_id, dropped, keep, "retention trimmed message log");
        dropped
    }
}
