use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{AgentId, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Whether this turn may be used as a branch point in the UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branchable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// One turn of dialogue. Created once; immutable afterwards except via an
/// explicit [`MessagePatch`] or deletion. Log order is append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub agent_id: AgentId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl Message {
    pub fn new(
        id: MessageId,
        agent_id: AgentId,
        role: Role,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            agent_id,
            role,
            content: content.into(),
            timestamp,
            metadata: MessageMetadata::default(),
        }
    }

    /// Fresh user turn with a generated id, stamped now.
    pub fn user(agent_id: AgentId, content: impl Into<String>) -> Self {
        Self::new(MessageId::generate(), agent_id, Role::User, content, Utc::now())
    }

    /// Fresh assistant turn with a generated id, stamped now.
    pub fn assistant(agent_id: AgentId, content: impl Into<String>) -> Self {
        Self::new(
            MessageId::generate(),
            agent_id,
            Role::Assistant,
            content,
            Utc::now(),
        )
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Partial update for an existing message. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl MessagePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            metadata: None,
        }
    }

    pub fn metadata(metadata: MessageMetadata) -> Self {
        Self {
            content: None,
            metadata: Some(metadata),
        }
    }

    /// Merge into `message`, field by field.
    pub fn apply_to(self, message: &mut Message) {
        if let Some(content) = self.content {
            message.content = content;
        }
        if let Some(metadata) = self.metadata {
            message.metadata = metadata;
        }
    }
}
