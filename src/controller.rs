//! Orchestration surface over the directory and log.
//!
//! The controller sequences store mutations, selection changes and
//! collaborator round-trips as single logical operations. The stores stay
//! synchronous; only the collaborator calls await. A failed backend call is
//! translated into an appended synthetic assistant message — the optimistic
//! user message is never rolled back.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::CoreConfig;
use crate::error::{BackendError, StoreError};
use crate::hierarchy::AgentNode;
use crate::layout::{compute_layout, Layout};
use crate::model::{
    Agent, AgentId, AgentStatus, ContextData, Message, MessageId, MessageMetadata, MessagePatch,
    SessionId,
};
use crate::payload;
use crate::store::{AgentDirectory, MessageLog};

/// AI backend client: given an agent and its trailing history, produce the
/// assistant's next turn.
#[async_trait]
pub trait AiBackend: Send + Sync {
    async fn complete(
        &self,
        agent: &Agent,
        history: &[Message],
        user_text: &str,
    ) -> Result<BackendReply, BackendError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReply {
    pub content: String,
    pub model: Option<String>,
    pub tokens: Option<u32>,
}

/// Persistence/sync client: enumerates every agent a durable store knows
/// about, as raw payloads the controller validates at the boundary.
#[async_trait]
pub trait SyncClient: Send + Sync {
    async fn fetch_agents(&self) -> Result<Vec<Value>, BackendError>;
}

/// Result of one conversation turn. `backend_failed` means `reply` is the
/// synthetic error message, not a real completion.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub user: Message,
    pub reply: Message,
    pub backend_failed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub applied: usize,
    pub quarantined: usize,
}

pub struct SessionController<B, S> {
    config: CoreConfig,
    backend: B,
    sync: S,
    directory: AgentDirectory,
    log: MessageLog,
    /// Most recently used agents first; feeds sibling ordering in the
    /// projection.
    recent: Vec<AgentId>,
}

impl<B: AiBackend, S: SyncClient> SessionController<B, S> {
    pub fn new(config: CoreConfig, backend: B, sync: S) -> Self {
        Self {
            config,
            backend,
            sync,
            directory: AgentDirectory::new(),
            log: MessageLog::new(),
            recent: Vec::new(),
        }
    }

    pub fn directory(&self) -> &AgentDirectory {
        &self.directory
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn selection(&self) -> Option<&AgentId> {
        self.directory.selection()
    }

    /// Create a main agent under a fresh session and make it current.
    pub fn start_session(&mut self, topic: impl Into<String>, context_data: ContextData) -> Agent {
        let agent = self
            .directory
            .create_main(SessionId::generate(), topic, context_data);
        self.directory
            .select(&agent.id)
            .expect("freshly created agent is selectable");
        self.touch_recent(&agent.id);
        agent
    }

    /// Create a branch under `parent_id` and make it current. The context
    /// blob is whatever inheritance the caller decided on.
    pub fn branch_from(
        &mut self,
        parent_id: &AgentId,
        topic: impl Into<String>,
        context_data: ContextData,
    ) -> Result<Agent, StoreError> {
        let agent = self.directory.create_branch(
            parent_id,
            topic,
            context_data,
            self.config.max_branch_depth,
        )?;
        self.directory.select(&agent.id)?;
        self.touch_recent(&agent.id);
        Ok(agent)
    }

    pub fn select_agent(&mut self, id: &AgentId) -> Result<(), StoreError> {
        self.directory.select(id)?;
        self.touch_recent(id);
        Ok(())
    }

    pub fn rename_agent(
        &mut self,
        id: &AgentId,
        new_topic: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.directory.rename(id, new_topic)
    }

    pub fn set_status(&mut self, id: &AgentId, status: AgentStatus) -> Result<(), StoreError> {
        self.directory.set_status(id, status)
    }

    /// Cascade-remove a subtree together with its message logs. When the
    /// removal took the current selection with it, the removed root's parent
    /// (if it survives) becomes current; otherwise the selection stays empty.
    pub fn remove_agent(&mut self, id: &AgentId) -> Result<BTreeSet<AgentId>, StoreError> {
        let parent_id = self
            .directory
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?
            .parent_id
            .clone();
        let previous_selection = self.directory.selection().cloned();

        let removed = self.directory.remove(id)?;
        for removed_id in &removed {
            self.log.clear(removed_id);
        }
        self.recent.retain(|r| !removed.contains(r));

        let selection_lost = previous_selection.is_some_and(|sel| removed.contains(&sel));
        if selection_lost {
            if let Some(parent_id) = parent_id.filter(|p| self.directory.contains(p)) {
                self.select_agent(&parent_id)?;
            }
        }
        Ok(removed)
    }

    /// One optimistic conversation turn.
    ///
    /// Phase 1 appends the user message immediately. Phase 2 appends the
    /// backend reply, or a synthetic assistant error message when the
    /// round-trip fails. The log keeps both phases either way; idempotent
    /// append absorbs replayed completions.
    pub async fn send_message(
        &mut self,
        agent_id: &AgentId,
        text: impl Into<String>,
    ) -> Result<TurnOutcome, StoreError> {
        let agent = self
            .directory
            .get(agent_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(agent_id.clone()))?;

        let user = Message::user(agent_id.clone(), text);
        self.log.append(user.clone());

        let history = self.trailing_history(agent_id);
        let (reply, backend_failed) =
            match self.backend.complete(&agent, &history, &user.content).await {
                Ok(completion) => {
                    let reply = Message::assistant(agent_id.clone(), completion.content)
                        .with_metadata(MessageMetadata {
                            branchable: Some(true),
                            tokens: completion.tokens,
                            model: completion.model,
                        });
                    (reply, false)
                }
                Err(err) => {
                    warn!(agent = %agent_id, %err, "backend turn failed, appending error message");
                    let reply = Message::assistant(
                        agent_id.clone(),
                        format!("The assistant could not respond: {err}"),
                    )
                    .with_metadata(MessageMetadata {
                        branchable: Some(false),
                        ..Default::default()
                    });
                    (reply, true)
                }
            };

        self.log.append(reply.clone());
        if let Some(keep) = self.config.retention_limit {
            self.log.enforce_retention(agent_id, keep);
        }

        Ok(TurnOutcome {
            user,
            reply,
            backend_failed,
        })
    }

    /// Message-log mutations, forwarded so callers only hold the controller.
    pub fn update_message(&mut self, message_id: &MessageId, patch: MessagePatch) -> bool {
        self.log.update(message_id, patch)
    }

    pub fn delete_message(&mut self, agent_id: &AgentId, message_id: &MessageId) -> bool {
        self.log.delete(agent_id, message_id)
    }

    pub fn clear_messages(&mut self, agent_id: &AgentId) {
        self.log.clear(agent_id);
    }

    /// Rebuild the directory from the durable store: every valid returned
    /// agent is replaced/inserted, malformed ones are quarantined (counted
    /// and logged, never stored), then the selection is re-validated.
    pub async fn reconcile(&mut self) -> Result<ReconcileReport, BackendError> {
        let raw_agents = self.sync.fetch_agents().await?;

        let mut report = ReconcileReport::default();
        for value in &raw_agents {
            match payload::parse_agent(value) {
                Ok(agent) => {
                    self.directory.upsert(agent);
                    report.applied += 1;
                }
                Err(err) => {
                    warn!(%err, "quarantined malformed agent payload");
                    report.quarantined += 1;
                }
            }
        }

        self.directory.revalidate_selection();
        self.recent.retain(|id| self.directory.contains(id));
        info!(
            applied = report.applied,
            quarantined = report.quarantined,
            "reconciled agent directory"
        );
        Ok(report)
    }

    /// Fresh navigation forest over the current directory and log.
    pub fn project(&self) -> Vec<AgentNode> {
        let agents: Vec<Agent> = self.directory.agents().cloned().collect();
        crate::hierarchy::project(&agents, &self.log.stats(), &self.recent)
    }

    /// Projection plus geometry for a canvas of the given size.
    pub fn layout(&self, width: f64, height: f64) -> Layout {
        let forest = self.project();
        compute_layout(&forest, self.directory.selection(), width, height)
    }

    fn trailing_history(&self, agent_id: &AgentId) -> Vec<Message> {
        let sequence = self.log.list(agent_id);
        let start = sequence
            .len()
            .saturating_sub(self.config.max_context_messages);
        sequence[start..].to_vec()
    }

    fn touch_recent(&mut self, id: &AgentId) {
        self.recent.retain(|r| r != id);
        self.recent.insert(0, id.clone());
    }
}
