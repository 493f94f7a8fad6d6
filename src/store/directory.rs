use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::model::{Agent, AgentId, AgentStatus, ContextData, SessionId};

/// Flat map of agent id -> agent record, plus the current-selection pointer.
///
/// Source of truth for hierarchy edges (`parent_id`). The directory is always
/// a forest: a branch can only be created once its parent already exists, so
/// cycles cannot form. All mutation entry points live here; callers hold the
/// store explicitly rather than going through ambient state.
#[derive(Debug, Clone, Default)]
pub struct AgentDirectory {
    agents: BTreeMap<AgentId, Agent>,
    selection: Option<AgentId>,
}

impl AgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root agent. Always succeeds.
    pub fn create_main(
        &mut self,
        session_id: SessionId,
        topic: impl Into<String>,
        context_data: ContextData,
    ) -> Agent {
        let agent = Agent::main(
            AgentId::generate(),
            session_id,
            topic,
            context_data,
            Utc::now(),
        );
        info!(agent = %agent.id, topic = %agent.topic, "created main agent");
        self.agents.insert(agent.id.clone(), agent.clone());
        agent
    }

    /// Create a child under `parent_id`. The context blob is stored verbatim;
    /// which parts of the parent's context it carries is the caller's call.
    pub fn create_branch(
        &mut self,
        parent_id: &AgentId,
        topic: impl Into<String>,
        context_data: ContextData,
        max_depth: u32,
    ) -> Result<Agent, StoreError> {
        let parent = self
            .agents
            .get(parent_id)
            .ok_or_else(|| StoreError::NotFound(parent_id.clone()))?;

        let depth = parent.stack_depth + 1;
        if depth > max_depth {
            return Err(StoreError::DepthExceeded {
                depth,
                max: max_depth,
            });
        }

        let agent = Agent::branch_of(
            parent,
            AgentId::generate(),
            topic,
            context_data,
            Utc::now(),
        );
        info!(agent = %agent.id, parent = %parent_id, depth, "created branch agent");
        self.agents.insert(agent.id.clone(), agent.clone());
        Ok(agent)
    }

    /// Mutate the topic label only. No hierarchy change.
    pub fn rename(&mut self, id: &AgentId, new_topic: impl Into<String>) -> Result<(), StoreError> {
        let agent = self
            .agents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        agent.topic = new_topic.into();
        Ok(())
    }

    pub fn set_status(&mut self, id: &AgentId, status: AgentStatus) -> Result<(), StoreError> {
        let agent = self
            .agents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        agent.status = status;
        Ok(())
    }

    /// Remove `id` and its entire descendant subtree in one atomic step.
    /// Returns every removed id. Clears the selection if it named any of them.
    ///
    /// Subtree collection uses an explicit worklist so the traversal is bound
    /// by heap, not call stack, whatever depth ceiling is configured.
    pub fn remove(&mut self, id: &AgentId) -> Result<BTreeSet<AgentId>, StoreError> {
        if !self.agents.contains_key(id) {
            return Err(StoreError::NotFound(id.clone()));
        }

        let mut removed = BTreeSet::new();
        let mut worklist = vec![id.clone()];
        while let Some(next) = worklist.pop() {
            if !removed.insert(next.clone()) {
                continue;
            }
            for (child_id, agent) in &self.agents {
                if agent.parent_id.as_ref() == Some(&next) {
                    worklist.push(child_id.clone());
                }
            }
        }

        for removed_id in &removed {
            self.agents.remove(removed_id);
        }

        if self
            .selection
            .as_ref()
            .is_some_and(|sel| removed.contains(sel))
        {
            self.selection = None;
        }

        info!(root = %id, count = removed.len(), "removed agent subtree");
        Ok(removed)
    }

    pub fn select(&mut self, id: &AgentId) -> Result<(), StoreError> {
        if !self.agents.contains_key(id) {
            return Err(StoreError::NotFound(id.clone()));
        }
        self.selection = Some(id.clone());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Drop the selection if it no longer names a live agent. Used after
    /// reconciliation replaces directory contents wholesale.
    pub fn revalidate_selection(&mut self) {
        if self
            .selection
            .as_ref()
            .is_some_and(|sel| !self.agents.contains_key(sel))
        {
            debug!("selection pointed at a vanished agent, clearing");
            self.selection = None;
        }
    }

    /// Replace or insert an already-validated agent record. Reconciliation
    /// entry point; normal creation goes through `create_main`/`create_branch`.
    pub fn upsert(&mut self, agent: Agent) {
        self.agents.insert(agent.id.clone(), agent);
    }

    pub fn selection(&self) -> Option<&AgentId> {
        self.selection.as_ref()
    }

    pub fn get(&self, id: &AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.agents.contains_key(id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
