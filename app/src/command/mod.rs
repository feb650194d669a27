//! Static strategy pattern for CLI commands.
//!
//! Each command is its own type implementing [`CommandStrategy`], so dispatch
//! is monomorphized at compile time with no boxing.

mod init;
mod serve;
mod version;

pub use init::InitStrategy;
pub use serve::{ServeInput, ServeStrategy};
pub use version::VersionStrategy;

/// Contract for all command strategies.
///
/// Each strategy defines its own input type via an associated type, so
/// parameters pass through without runtime casting.
pub trait CommandStrategy: Send + Sync + 'static {
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}
