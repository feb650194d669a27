//! Dynamic tool dispatch for gateway-requested invocations.

use async_trait::async_trait;

mod registry;

pub use registry::ToolRegistry;

/// A named, side-effecting operation the completion gateway may invoke
/// before producing a final answer.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the argument object.
    fn parameters(&self) -> serde_json::Value;

    /// Execute with the decoded argument payload, returning result text.
    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<String>;
}
