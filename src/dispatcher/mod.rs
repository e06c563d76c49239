//! # Dispatcher Module
//!
//! The front door: one default application plus applications mounted at
//! sub-paths, and the invitation handshake that puts all of them on one
//! [`Partyline`](crate::partyline::Partyline).
//!
//! ## Routing
//!
//! The most specific mount wins, matched on whole path segments:
//!
//! ```rust
//! use std::sync::Arc;
//! use partyline::app::{PartyRequest, PartyResponse, SharedApplication};
//! use partyline::config::PartyConfig;
//! use partyline::dispatcher::Dispatcher;
//! use serde_json::json;
//!
//! fn echo(name: &'static str) -> SharedApplication {
//!     Arc::new(move |req: PartyRequest| -> anyhow::Result<PartyResponse> {
//!         Ok(PartyResponse::ok_json(json!({
//!             "app": name,
//!             "script_name": req.script_name,
//!             "path_info": req.path_info,
//!         })))
//!     })
//! }
//!
//! let dispatcher = Dispatcher::new(
//!     echo("main"),
//!     [("/blog", echo("blog"))],
//!     PartyConfig::default(),
//! )
//! .unwrap();
//!
//! let resp = dispatcher
//!     .route(PartyRequest::new(http::Method::GET, "/blog/posts/1"))
//!     .unwrap();
//! assert_eq!(resp.body["app"], "blog");
//! assert_eq!(resp.body["script_name"], "/blog");
//! assert_eq!(resp.body["path_info"], "/posts/1");
//!
//! // "/blogroll" is not inside "/blog"
//! let resp = dispatcher
//!     .route(PartyRequest::new(http::Method::GET, "/blogroll"))
//!     .unwrap();
//! assert_eq!(resp.body["app"], "main");
//! ```
//!
//! ## Invitations
//!
//! Construction sends every application (default first, then mounts in
//! order) a GET to the invite path (`/__invite__/` by default) whose context
//! carries a fresh [`Operator`](crate::partyline::Operator) under the
//! partyline key. Applications that speak the protocol join through a
//! [`PartylineConnector`](crate::connector::PartylineConnector); the others
//! answer however they answer unknown paths, which is tolerated unless the
//! invitation policy is strict.

mod core;
mod mount;

pub use core::{
    Dispatcher, Invitation, InvitationOutcome, InvitationReport, DEFAULT_TARGET,
};
pub use mount::{MountTable, Resolution};
