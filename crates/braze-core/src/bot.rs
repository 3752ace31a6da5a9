//! Bot capability trait.
//!
//! The engine never talks to a wire protocol itself. An adapter collaborator
//! implements [`Bot`] and the engine injects it into every dispatch context;
//! terminal actions and middlewares reach the platform exclusively through
//! [`Bot::call_api`]. The engine neither retries calls nor interprets their
//! results.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiResult;

/// Handle to the platform connection behind the engine.
#[async_trait]
pub trait Bot: Send + Sync {
    /// The account id this bot is logged in as.
    fn self_id(&self) -> i64;

    /// Performs one API call and returns the raw response data.
    async fn call_api(&self, action: &str, params: Value) -> ApiResult<Value>;
}
