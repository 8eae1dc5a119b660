//! Scribe core: intent routing, the chat, commits and documentation workflows,
//! configuration, and the git collaborator.

pub mod bootstrap;
pub mod channel;
pub mod commits;
pub mod config;
pub mod error;
pub mod git;
pub mod history;
pub mod intent;
pub mod release_notes;
pub mod router;
pub mod secret;
pub mod session;
pub mod tools;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use channel::{Channel, ChannelError, ChannelMessage};
pub use config::Config;
pub use error::WorkflowError;
pub use router::{Mode, ModeClassifier};
pub use session::Session;
