//! # Partyline Module
//!
//! The broker that lets mounted applications offer services to each other.
//!
//! ## Overview
//!
//! - [`Partyline`] maps service names to handlers in registration order.
//! - [`Operator`] is one application's capability token: it registers that
//!   application's handlers and asks on its behalf, excluding them.
//! - [`Handler`] wraps a `Fn(&Value) -> anyhow::Result<Reply>`; replying
//!   [`Reply::NoAnswer`] declines without failing.
//! - [`AskAround`] is the lazy, ordered sequence of answers to one broadcast.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use partyline::partyline::{Handler, Partyline, Reply};
//! use serde_json::json;
//!
//! let broker = Arc::new(Partyline::new());
//! let blog = broker.operator();
//! let shop = broker.operator();
//!
//! blog.connect("ping", Handler::new(|_| Ok(Reply::Answer(json!("blog")))));
//! shop.connect("ping", Handler::new(|_| Ok(Reply::Answer(json!("shop")))));
//!
//! let answers = blog.ask_around("ping", json!({})).answers().unwrap();
//! assert_eq!(answers, vec![json!("shop")]);
//! ```
//!
//! ## Concurrency
//!
//! Broadcasts run synchronously on the caller's thread. There is no timeout:
//! a slow handler stalls its asker. Callers that need a deadline should stop
//! pulling the iterator when it expires.

mod ask;
mod broker;
mod handler;
mod operator;

pub use ask::AskAround;
pub use broker::Partyline;
pub use handler::{Handler, HandlerResult, Reply};
pub use operator::Operator;
