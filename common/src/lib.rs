//! Shared plumbing for the Docs++ naming server, storage server, and client:
//! wire framing, configuration, logging, the error taxonomy, blob
//! persistence, and filename validation. Everything here is the "ambient
//! stack" spec.md treats as out-of-scope interfaces; the NM and SS crates
//! build the domain logic on top of it.

pub mod blob;
pub mod config;
pub mod error;
pub mod logging;
pub mod proto;
pub mod sentence;
pub mod session_id;
pub mod time;
pub mod validate;

pub use error::{DocsError, DocsResult};
