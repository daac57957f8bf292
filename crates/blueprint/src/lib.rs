//! Blueprint graph domain model and versioned state engine.
//!
//! A [`Blueprint`] is a typed visual-scripting graph: nodes with ordered,
//! typed pins, connections between pins, free-floating comments and declared
//! variables. All mutation goes through [`StateManager`], which snapshots the
//! graph before every change, bumps the version counter once per emitted
//! [`Delta`], and keeps undo/redo stacks of full serialized snapshots.

mod error;
mod model;
mod state;

pub use error::*;
pub use model::*;
pub use state::*;
