//! # partyline
//!
//! **partyline** mounts independently written request-handling applications
//! behind one front door and lets them ask each other for services at
//! runtime, without holding references to one another.
//!
//! ## Overview
//!
//! - **[`dispatcher`]** - Mount table, segment-aligned routing, and the
//!   invitation handshake run when a [`Dispatcher`] is built
//! - **[`partyline`]** - The broker: service registry, per-application
//!   [`Operator`]s, and the lazy ask-around broadcast
//! - **[`connector`]** - The application side of the handshake: join once,
//!   register handlers, keep the operator
//! - **[`app`]** - The [`Application`] contract and the request context
//! - **[`config`]** - Invite path, partyline key, base URL, invitation policy
//! - **[`logging`]** - `tracing` subscriber setup for binaries
//! - **[`ids`]** - ULID-backed request, operator and handler identifiers
//! - **[`cli`]** - The `partyline-demo` binary: route paths and ask around in
//!   a sample composition
//!
//! ## Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant D as Dispatcher
//!     participant P as Partyline
//!     participant A as App A (connector)
//!     participant B as App B (connector)
//!
//!     D->>P: operator()
//!     D->>A: GET /__invite__/ {partyline: Operator A}
//!     A->>P: connect("ping", handler A) via Operator A
//!     D->>P: operator()
//!     D->>B: GET /__invite__/ {partyline: Operator B}
//!     B->>P: connect("ping", handler B) via Operator B
//!
//!     Note over A,B: later, while serving a request
//!     A->>P: ask_around("ping", payload) via Operator A
//!     P->>B: handler B(payload)
//!     B-->>A: answer (handler A skipped)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use partyline::app::{PartyRequest, PartyResponse, SharedApplication};
//! use partyline::config::PartyConfig;
//! use partyline::connector::{PartylineApp, PartylineConnector};
//! use partyline::dispatcher::Dispatcher;
//! use partyline::partyline::{Handler, Reply};
//! use serde_json::json;
//!
//! fn member(name: &'static str) -> (Arc<PartylineConnector>, SharedApplication) {
//!     let connector = Arc::new(
//!         PartylineConnector::builder()
//!             .service("ping", Handler::new(move |_| Ok(Reply::Answer(json!(name)))))
//!             .build(),
//!     );
//!     let app = PartylineApp::with_shared(
//!         Arc::clone(&connector),
//!         |_req: PartyRequest| -> anyhow::Result<PartyResponse> {
//!             Ok(PartyResponse::ok_json(json!({})))
//!         },
//!     );
//!     (connector, Arc::new(app))
//! }
//!
//! let (main, main_app) = member("main");
//! let (_blog, blog_app) = member("blog");
//! let _dispatcher =
//!     Dispatcher::new(main_app, [("/blog", blog_app)], PartyConfig::default()).unwrap();
//!
//! let answers = main.ask_around("ping", json!({})).unwrap().answers().unwrap();
//! assert_eq!(answers, vec![json!("blog")]);
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod connector;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod partyline;

pub use app::{Application, PartyRequest, PartyResponse, SharedApplication};
pub use config::{InvitationPolicy, PartyConfig};
pub use connector::{JoinOutcome, PartylineApp, PartylineConnector};
pub use dispatcher::Dispatcher;
pub use error::{PartylineError, Result};
pub use partyline::{AskAround, Handler, Operator, Partyline, Reply};
