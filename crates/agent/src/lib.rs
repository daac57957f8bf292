//! The agent service: a multi-round model loop that edits a blueprint graph
//! through registered tools, streaming text, tool activity and graph deltas
//! to the client as they happen.
//!
//! A turn is: stream one model completion, execute the tool calls it
//! produced against the session's [`blueprint::StateManager`], feed the
//! results back as tool messages, repeat until the model stops asking for
//! tools (or the round cap is hit). Each session runs at most one turn at a
//! time; a new message cancels the turn in flight.

mod config;
mod error;
mod executor;
mod orchestrator;
mod registry;
mod session;
mod system_prompt;
mod tool;
pub mod tools;
mod update;

pub use config::*;
pub use error::*;
pub use executor::*;
pub use orchestrator::*;
pub use registry::*;
pub use session::*;
pub use system_prompt::SYSTEM_PROMPT;
pub use tool::*;
pub use update::*;
