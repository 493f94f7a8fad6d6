use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{AgentId, SessionId};

/// Opaque key/value blob copied from the creator at branch time.
/// The core stores it verbatim; inheritance policy lives with the caller.
pub type ContextData = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Main,
    Branch,
}

/// Informational lifecycle state. The core enforces no transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Suspended,
    Completed,
}

/// One conversation session node in the forest.
///
/// `id`, `created_at` and the hierarchy edge (`parent_id`) are immutable
/// after creation; `topic`, `status` and `context_data` may be patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub session_id: SessionId,
    #[serde(default)]
    pub parent_id: Option<AgentId>,
    pub agent_type: AgentType,
    pub topic: String,
    #[serde(default)]
    pub context_data: ContextData,
    pub stack_depth: u32,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Root of a new conversation tree: depth 0, no parent.
    pub fn main(
        id: AgentId,
        session_id: SessionId,
        topic: impl Into<String>,
        context_data: ContextData,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            session_id,
            parent_id: None,
            agent_type: AgentType::Main,
            topic: topic.into(),
            context_data,
            stack_depth: 0,
            status: AgentStatus::Active,
            created_at,
        }
    }

    /// Child derived from `parent`: depth is parent depth + 1, session is
    /// inherited from the parent.
    pub fn branch_of(
        parent: &Agent,
        id: AgentId,
        topic: impl Into<String>,
        context_data: ContextData,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            session_id: parent.session_id.clone(),
            parent_id: Some(parent.id.clone()),
            agent_type: AgentType::Branch,
            topic: topic.into(),
            context_data,
            stack_depth: parent.stack_depth + 1,
            status: AgentStatus::Active,
            created_at,
        }
    }

    pub fn is_main(&self) -> bool {
        matches!(self.agent_type, AgentType::Main)
    }

    pub fn suspend(&mut self) {
        self.status = AgentStatus::Suspended;
    }

    pub fn resume(&mut self) {
        self.status = AgentStatus::Active;
    }

    pub fn complete(&mut self) {
        self.status = AgentStatus::Completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_agent() -> Agent {
        Agent::main(
            "a01".into(),
            "s1".into(),
            "rust lifetimes",
            ContextData::new(),
            Utc::now(),
        )
    }

    #[test]
    fn main_agent_has_depth_zero_and_no_parent() {
        let agent = main_agent();
        assert_eq!(agent.stack_depth, 0);
        assert!(agent.parent_id.is_none());
        assert!(agent.is_main());
        assert_eq!(agent.status, AgentStatus::Active);
    }

    #[test]
    fn branch_inherits_session_and_increments_depth() {
        let parent = main_agent();
        let child = Agent::branch_of(
            &parent,
            "a02".into(),
            "borrow checker",
            ContextData::new(),
            Utc::now(),
        );

        assert_eq!(child.stack_depth, 1);
        assert_eq!(child.parent_id, Some(parent.id.clone()));
        assert_eq!(child.session_id, parent.session_id);
        assert!(!child.is_main());
    }

    #[test]
    fn status_helpers_mutate_only_status() {
        let mut agent = main_agent();
        agent.suspend();
        assert_eq!(agent.status, AgentStatus::Suspended);
        agent.resume();
        assert_eq!(agent.status, AgentStatus::Active);
        agent.complete();
        assert_eq!(agent.status, AgentStatus::Completed);
        assert_eq!(agent.stack_depth, 0);
    }

    #[test]
    fn agent_type_serializes_lowercase() {
        let json = serde_json::to_string(&AgentType::Branch).unwrap();
        assert_eq!(json, "\"branch\"");
    }
}
