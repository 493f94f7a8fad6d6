//! Boundary validation for loosely-typed payloads.
//!
//! Agents and messages arriving from a durable store or network peer come in
//! as raw JSON. They are converted into the strict records of [`crate::model`]
//! here, or rejected; a malformed payload never reaches the directory or log.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::PayloadError;
use crate::model::{
    Agent, AgentType, ContextData, Message, MessageMetadata, Role,
};

const MAX_TOPIC_LEN: usize = 255;

#[derive(Deserialize)]
struct RawAgent {
    id: String,
    session_id: String,
    #[serde(default)]
    parent_id: Option<String>,
    agent_type: AgentType,
    topic: String,
    #[serde(default)]
    context_data: ContextData,
    stack_depth: u32,
    status: crate::model::AgentStatus,
    created_at: String,
}

#[derive(Deserialize)]
struct RawMessage {
    id: String,
    agent_id: String,
    role: Role,
    content: String,
    timestamp: String,
    #[serde(default)]
    metadata: MessageMetadata,
}

/// Validate and convert one raw agent payload.
pub fn parse_agent(value: &Value) -> Result<Agent, PayloadError> {
    let raw: RawAgent =
        serde_json::from_value(value.clone()).map_err(|e| PayloadError::Json(e.to_string()))?;

    if raw.id.is_empty() {
        return Err(PayloadError::MissingField("id"));
    }
    if raw.session_id.is_empty() {
        return Err(PayloadError::MissingField("session_id"));
    }
    validate_topic(&raw.topic)?;

    match (raw.agent_type, &raw.parent_id) {
        (AgentType::Branch, None) => {
            return Err(PayloadError::InvalidField {
                field: "parent_id",
                reason: "branch agent requires a parent".into(),
            });
        }
        (AgentType::Main, Some(_)) => {
            return Err(PayloadError::InvalidField {
                field: "parent_id",
                reason: "main agent cannot have a parent".into(),
            });
        }
        (AgentType::Main, None) if raw.stack_depth != 0 => {
            return Err(PayloadError::InvalidField {
                field: "stack_depth",
                reason: format!("main agent must sit at depth 0, got {}", raw.stack_depth),
            });
        }
        (AgentType::Branch, Some(parent)) if *parent == raw.id => {
            return Err(PayloadError::InvalidField {
                field: "parent_id",
                reason: "agent cannot be its own parent".into(),
            });
        }
        (AgentType::Branch, Some(_)) if raw.stack_depth == 0 => {
            return Err(PayloadError::InvalidField {
                field: "stack_depth",
                reason: "branch agent cannot sit at depth 0".into(),
            });
        }
        _ => {}
    }

    Ok(Agent {
        id: raw.id.into(),
        session_id: raw.session_id.into(),
        parent_id: raw.parent_id.map(Into::into),
        agent_type: raw.agent_type,
        topic: raw.topic,
        context_data: raw.context_data,
        stack_depth: raw.stack_depth,
        status: raw.status,
        created_at: parse_timestamp("created_at", &raw.created_at)?,
    })
}

/// Validate and convert one raw message payload.
pub fn parse_message(value: &Value) -> Result<Message, PayloadError> {
    let raw: RawMessage =
        serde_json::from_value(value.clone()).map_err(|e| PayloadError::Json(e.to_string()))?;

    if raw.id.is_empty() {
        return Err(PayloadError::MissingField("id"));
    }
    if raw.agent_id.is_empty() {
        return Err(PayloadError::MissingField("agent_id"));
    }
    if raw.content.is_empty() {
        return Err(PayloadError::MissingField("content"));
    }

    Ok(Message {
        id: raw.id.into(),
        agent_id: raw.agent_id.into(),
        role: raw.role,
        content: raw.content,
        timestamp: parse_timestamp("timestamp", &raw.timestamp)?,
        metadata: raw.metadata,
    })
}

fn validate_topic(topic: &str) -> Result<(), PayloadError> {
    if topic.is_empty() {
        return Err(PayloadError::MissingField("topic"));
    }
    if topic.chars().count() > MAX_TOPIC_LEN {
        return Err(PayloadError::InvalidField {
            field: "topic",
            reason: format!("longer than {MAX_TOPIC_LEN} characters"),
        });
    }
    Ok(())
}

fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, PayloadError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PayloadError::InvalidField {
            field,
            reason: e.to_string(),
        })
}
