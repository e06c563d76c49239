//! # Connector Module
//!
//! The application side of the invitation handshake.
//!
//! An application that wants to join the partyline owns a
//! [`PartylineConnector`] and routes requests for the invite path to it
//! (or wraps itself in a [`PartylineApp`], which does that routing). The
//! connector moves from not-joined to joined exactly once:
//!
//! 1. take the [`Operator`] out of the invitation's context slot,
//! 2. run the optional `before_join` hook, which may veto,
//! 3. claim the one-shot join guard (a second invitation stops here),
//! 4. run the optional `on_join` hook,
//! 5. register every declared service handler through the operator,
//! 6. keep the operator for later [`ask_around`](PartylineConnector::ask_around) calls.
//!
//! A repeated invitation is answered with `200 {"joined": false}` and
//! registers nothing.
//!
//! ```rust
//! use partyline::connector::PartylineConnector;
//! use partyline::partyline::{Handler, Reply};
//! use serde_json::json;
//!
//! let connector = PartylineConnector::builder()
//!     .service("ping", Handler::new(|_| Ok(Reply::Answer(json!("pong")))))
//!     .on_join(|operator| tracing::info!(operator_id = %operator.id(), "joined"))
//!     .build();
//! assert!(!connector.is_joined());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::app::{Application, PartyRequest, PartyResponse};
use crate::config::{DEFAULT_INVITE_PATH, DEFAULT_PARTYLINE_KEY};
use crate::error::{PartylineError, Result};
use crate::partyline::{AskAround, Handler, Operator};

/// Result of delivering an invitation to a connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// This invitation joined the application to the partyline
    Joined,
    /// The application was already on the partyline (or the pre-join hook
    /// vetoed); nothing was registered
    AlreadyJoined,
}

/// Verdict of a `before_join` hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinGate {
    Proceed,
    /// Treat this invitation as a duplicate
    Veto,
}

type BeforeJoin = Box<dyn Fn(&PartyRequest) -> JoinGate + Send + Sync>;
type OnJoin = Box<dyn Fn(&Operator) + Send + Sync>;

/// One application's membership in the partyline.
pub struct PartylineConnector {
    invite_path: String,
    partyline_key: String,
    services: Vec<(String, Handler)>,
    before_join: Option<BeforeJoin>,
    on_join: Option<OnJoin>,
    joined: AtomicBool,
    operator: OnceLock<Arc<Operator>>,
}

impl fmt::Debug for PartylineConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartylineConnector")
            .field("invite_path", &self.invite_path)
            .field("partyline_key", &self.partyline_key)
            .field(
                "services",
                &self.services.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("joined", &self.is_joined())
            .finish()
    }
}

impl PartylineConnector {
    #[must_use]
    pub fn builder() -> PartylineConnectorBuilder {
        PartylineConnectorBuilder::default()
    }

    /// Whether `request` is addressed to the invite path
    #[must_use]
    pub fn is_invitation(&self, request: &PartyRequest) -> bool {
        request.path_info == self.invite_path
    }

    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.joined.load(Ordering::Acquire)
    }

    /// The operator received when joining
    #[must_use]
    pub fn operator(&self) -> Option<&Arc<Operator>> {
        self.operator.get()
    }

    /// Service names this connector registers on joining
    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|(name, _)| name.as_str())
    }

    /// Join the partyline using the operator carried by `request`.
    ///
    /// Fails only when the request carries no operator; the connector stays
    /// not-joined in that case.
    pub fn join_party(&self, request: &PartyRequest) -> Result<JoinOutcome> {
        let operator = request
            .context::<Operator>(&self.partyline_key)
            .ok_or_else(|| PartylineError::MissingOperator {
                key: self.partyline_key.clone(),
            })?;

        if let Some(before_join) = &self.before_join {
            if before_join(request) == JoinGate::Veto {
                debug!(operator_id = %operator.id(), "Join vetoed by before_join hook");
                return Ok(JoinOutcome::AlreadyJoined);
            }
        }

        if self
            .joined
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(operator_id = %operator.id(), "Already on the partyline - ignoring invitation");
            return Ok(JoinOutcome::AlreadyJoined);
        }

        if let Some(on_join) = &self.on_join {
            on_join(operator.as_ref());
        }

        for (service, handler) in &self.services {
            operator.connect(service, handler.clone());
        }

        info!(
            operator_id = %operator.id(),
            services = ?self.services.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            "Joined the partyline"
        );
        // The join guard makes this the only writer.
        if self.operator.set(operator).is_err() {
            debug!("Operator slot already filled");
        }
        Ok(JoinOutcome::Joined)
    }

    /// Answer an invitation request.
    pub fn respond(&self, request: &PartyRequest) -> anyhow::Result<PartyResponse> {
        let outcome = self.join_party(request)?;
        Ok(PartyResponse::ok_json(json!({
            "joined": outcome == JoinOutcome::Joined,
        })))
    }

    /// Broadcast through this application's operator.
    pub fn ask_around(&self, service: &str, payload: Value) -> Result<AskAround<'_>> {
        let operator = self.operator().ok_or(PartylineError::NotJoined)?;
        Ok(operator.ask_around(service, payload))
    }
}

/// Builder for [`PartylineConnector`]
pub struct PartylineConnectorBuilder {
    invite_path: String,
    partyline_key: String,
    services: Vec<(String, Handler)>,
    before_join: Option<BeforeJoin>,
    on_join: Option<OnJoin>,
}

impl Default for PartylineConnectorBuilder {
    fn default() -> Self {
        Self {
            invite_path: DEFAULT_INVITE_PATH.to_string(),
            partyline_key: DEFAULT_PARTYLINE_KEY.to_string(),
            services: Vec::new(),
            before_join: None,
            on_join: None,
        }
    }
}

impl PartylineConnectorBuilder {
    /// Match a dispatcher configured with a non-default invite path
    #[must_use]
    pub fn invite_path(mut self, path: impl Into<String>) -> Self {
        self.invite_path = path.into();
        self
    }

    /// Match a dispatcher configured with a non-default partyline key
    #[must_use]
    pub fn partyline_key(mut self, key: impl Into<String>) -> Self {
        self.partyline_key = key.into();
        self
    }

    /// Take invite path and key from a dispatcher configuration
    #[must_use]
    pub fn config(self, config: &crate::config::PartyConfig) -> Self {
        self.invite_path(config.invite_path.clone())
            .partyline_key(config.partyline_key.clone())
    }

    /// Offer `handler` under `service` once joined. May be called repeatedly,
    /// also with the same name.
    #[must_use]
    pub fn service(mut self, service: impl Into<String>, handler: Handler) -> Self {
        self.services.push((service.into(), handler));
        self
    }

    #[must_use]
    pub fn before_join<F>(mut self, hook: F) -> Self
    where
        F: Fn(&PartyRequest) -> JoinGate + Send + Sync + 'static,
    {
        self.before_join = Some(Box::new(hook));
        self
    }

    /// Runs once, after the join guard and before any handler is registered
    #[must_use]
    pub fn on_join<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Operator) + Send + Sync + 'static,
    {
        self.on_join = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn build(self) -> PartylineConnector {
        PartylineConnector {
            invite_path: self.invite_path,
            partyline_key: self.partyline_key,
            services: self.services,
            before_join: self.before_join,
            on_join: self.on_join,
            joined: AtomicBool::new(false),
            operator: OnceLock::new(),
        }
    }
}

/// An application plus its connector: invitations go to the connector,
/// everything else to the application.
pub struct PartylineApp<A> {
    connector: Arc<PartylineConnector>,
    inner: A,
}

impl<A: Application> PartylineApp<A> {
    pub fn new(connector: PartylineConnector, inner: A) -> Self {
        Self::with_shared(Arc::new(connector), inner)
    }

    /// Share the connector with the wrapped application, which typically
    /// needs it to ask around.
    pub fn with_shared(connector: Arc<PartylineConnector>, inner: A) -> Self {
        Self { connector, inner }
    }

    #[must_use]
    pub fn connector(&self) -> &Arc<PartylineConnector> {
        &self.connector
    }
}

impl<A: Application> Application for PartylineApp<A> {
    fn call(&self, request: PartyRequest) -> anyhow::Result<PartyResponse> {
        if self.connector.is_invitation(&request) {
            return self.connector.respond(&request);
        }
        self.inner.call(request)
    }
}
