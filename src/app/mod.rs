//! # Application Module
//!
//! The contract between the dispatcher and the applications mounted behind it.
//!
//! An application is anything that turns a [`PartyRequest`] into a
//! [`PartyResponse`]. Its internal routing, templating and storage are its own
//! business; the dispatcher only calls it. Closures qualify:
//!
//! ```rust
//! use partyline::app::{Application, PartyRequest, PartyResponse};
//! use serde_json::json;
//!
//! let hello = |req: PartyRequest| -> anyhow::Result<PartyResponse> {
//!     Ok(PartyResponse::ok_json(json!({ "path": req.path_info })))
//! };
//! let resp = hello.call(PartyRequest::new(http::Method::GET, "/hi")).unwrap();
//! assert_eq!(resp.body["path"], "/hi");
//! ```
//!
//! Applications are shared as [`SharedApplication`] (`Arc<dyn Application>`);
//! identity is the allocation, so mounting one `Arc` twice mounts the same
//! application twice.

mod request;
mod response;

use std::sync::Arc;

pub use request::{ContextValue, HeaderVec, PartyRequest, MAX_INLINE_HEADERS};
pub use response::PartyResponse;

/// A request-handling application.
pub trait Application: Send + Sync {
    /// Handle one request. Errors propagate to whoever called the dispatcher.
    fn call(&self, request: PartyRequest) -> anyhow::Result<PartyResponse>;
}

impl<F> Application for F
where
    F: Fn(PartyRequest) -> anyhow::Result<PartyResponse> + Send + Sync,
{
    fn call(&self, request: PartyRequest) -> anyhow::Result<PartyResponse> {
        self(request)
    }
}

/// Shared handle to a mounted application
pub type SharedApplication = Arc<dyn Application>;
