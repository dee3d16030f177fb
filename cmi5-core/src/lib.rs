//! cmi5-core: AU-side runtime for the cmi5 profile of xAPI
//!
//! This crate is the session-tracking core embedded in an Assignable Unit
//! (AU). It speaks the cmi5 protocol to a Learning Record Store under
//! orchestration by a Learning Management System:
//!
//! - **Launch handling** - [`LaunchContext`] validates the LMS-provided
//!   launch parameters once, at the boundary
//! - **Session lifecycle** - [`Session`] is the state machine driving one
//!   AU attempt: credential fetch, launch data, learner preferences,
//!   initialize, the lifecycle verbs, terminate
//! - **Statements** - [`StatementBuilder`] assembles protocol-compliant
//!   statements from cached session state
//! - **LRS client** - [`LrsClient`] performs the four network operations
//!   behind a single [`Transport`] seam ([`MockTransport`] for tests)
//!
//! # Quick start
//!
//! ```no_run
//! use cmi5_core::{Cmi5Error, Score, Session};
//!
//! async fn run(launch_url: &str) -> Result<(), Cmi5Error> {
//!     let mut session = Session::from_launch_url(launch_url)?;
//!
//!     // fetch credentials, load launch data and preferences, initialize
//!     session.start(None).await?;
//!
//!     session.passed(Some(Score::scaled(0.9))).await?;
//!     session.terminate(None).await?;
//!     Ok(())
//! }
//! ```
//!
//! Network failures are surfaced to the caller, never retried internally;
//! a failed operation leaves session state unchanged so the identical call
//! may be retried.

pub mod duration;
pub mod error;
pub mod launch;
pub mod lrs;
pub mod session;
pub mod statement;

// Re-export key types for convenience
pub use error::{
    Cmi5Error, ConfigError, NetworkError, ProtocolError, StateError, ValidationError,
};
pub use launch::{Agent, AgentAccount, LaunchContext};
pub use lrs::{
    HttpRequest, HttpResponse, HttpTransport, LrsClient, Method, MockTransport, ProfileDocument,
    ProfileWriteOutcome, Transport,
};
pub use session::{
    AudioPreference, EntitlementKey, LaunchData, LaunchMethod, LaunchMode, LearnerPreferences,
    MoveOn, PreferenceState, Session, SessionConfig,
};
pub use statement::{
    Activity, ActivityDefinition, AdditionalProperties, Context, ContextActivities, LanguageMap,
    Score, Statement, StatementBuilder, StatementResult, Verb, append_provided_properties,
};
