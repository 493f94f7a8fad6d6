use serde::{Deserialize, Serialize};

/// Tunables supplied by the embedding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Ceiling on branch nesting: a child at depth > this is rejected.
    #[serde(default = "default_max_branch_depth")]
    pub max_branch_depth: u32,

    /// How many trailing messages are handed to the AI backend per turn.
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,

    /// When set, each agent's log is trimmed to this many newest messages
    /// after a completed turn. `None` keeps everything.
    #[serde(default)]
    pub retention_limit: Option<usize>,
}

fn default_max_branch_depth() -> u32 {
    5
}

fn default_max_context_messages() -> usize {
    10
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_branch_depth: default_max_branch_depth(),
            max_context_messages: default_max_context_messages(),
            retention_limit: None,
        }
    }
}
