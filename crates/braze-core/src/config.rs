//! Engine-level configuration.
//!
//! Settings the dispatch core itself consumes: command prefixes for the
//! `command` middleware, the superuser list for the `from_superuser` filter,
//! and the outbound call deadline an adapter should honor. Loading these
//! from files or the environment is the runtime crate's job.

use serde::{Deserialize, Serialize};

/// Settings consumed by the engine and its middleware library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Prefixes that introduce a command message.
    #[serde(default = "default_command_prefixes")]
    pub command_prefixes: Vec<String>,

    /// User ids granted the superuser filter.
    #[serde(default)]
    pub superusers: Vec<i64>,

    /// Deadline in seconds adapters should apply to outbound API calls.
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_prefixes: default_command_prefixes(),
            superusers: Vec::new(),
            api_timeout_secs: default_api_timeout_secs(),
        }
    }
}

fn default_command_prefixes() -> Vec<String> {
    vec!["/".to_string()]
}

fn default_api_timeout_secs() -> u64 {
    30
}
