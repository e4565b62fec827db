//! Command handlers for the swift-scip CLI
//!
//! Each module implements one top-level command:
//! - `index` - build or update the index (full, incremental, or fast-switch)
//! - `status` - report repository, state and branch-cache information
//!
//! Handlers take their `Args` struct from `cli.rs` and a shared
//! `CommandContext`, and return the text the driver prints on success.

pub mod index;
pub mod status;

pub use index::{run_index, run_index_with};
pub use status::run_status;

/// Shared context passed to all command handlers
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Show verbose output
    pub verbose: bool,
}

impl CommandContext {
    pub fn from_cli(verbose: bool) -> Self {
        Self { verbose }
    }
}
