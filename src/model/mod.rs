pub mod agent;
pub mod ids;
pub mod message;

pub use agent::{Agent, AgentStatus, AgentType, ContextData};
pub use ids::{AgentId, MessageId, SessionId};
pub use message::{Message, MessageMetadata, MessagePatch, Role};
