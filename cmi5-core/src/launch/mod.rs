//! Launch parameter handling
//!
//! An AU is launched with a set of LMS-provided parameters. They are
//! validated once, at the boundary, into a [`LaunchContext`] that the rest
//! of the runtime treats as immutable.

mod actor;
mod context;

pub use actor::{Agent, AgentAccount};
pub use context::LaunchContext;
