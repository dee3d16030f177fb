//! LRS communication layer
//!
//! One [`Transport`] seam with one real HTTP implementation, a scriptable
//! [`MockTransport`] for tests, and the [`LrsClient`] that performs the four
//! protocol operations and classifies their responses.

mod client;
mod mock;
mod transport;

pub use client::{LrsClient, ProfileDocument, ProfileWriteOutcome};
pub use mock::MockTransport;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, Transport};
