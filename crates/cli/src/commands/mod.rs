//! Command handlers for the govbrief CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod classify;
pub mod retrieve;
pub mod serve;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use classify::ClassifyCommand;
pub use retrieve::RetrieveCommand;
pub use serve::ServeCommand;
