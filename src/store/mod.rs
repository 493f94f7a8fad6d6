pub mod directory;
pub mod log;

pub use directory::AgentDirectory;
pub use log::{AgentStats, MessageLog};
