use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use tracing::{debug, info};

use super::ask::AskAround;
use super::handler::Handler;
use super::operator::Operator;

/// Service name to handlers, in registration order.
type ServiceMap = HashMap<String, Arc<Vec<Handler>>>;

/// The shared broker every participating application talks to.
///
/// The registry only grows. Registration swaps in a new map (copy-on-write),
/// so a broadcast works on the snapshot it started with and never holds a
/// lock while handlers run. A handler may therefore register or broadcast
/// itself without deadlocking.
pub struct Partyline {
    services: ArcSwap<ServiceMap>,
    operators_issued: AtomicUsize,
}

impl Default for Partyline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Partyline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let services = self.services.load();
        let counts: HashMap<&str, usize> = services
            .iter()
            .map(|(name, handlers)| (name.as_str(), handlers.len()))
            .collect();
        f.debug_struct("Partyline")
            .field("services", &counts)
            .field("operators_issued", &self.operators_issued.load(Ordering::Relaxed))
            .finish()
    }
}

impl Partyline {
    /// Create an empty broker
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: ArcSwap::from_pointee(HashMap::new()),
            operators_issued: AtomicUsize::new(0),
        }
    }

    /// Mint a fresh operator bound to this broker.
    ///
    /// Hand exactly one to each application per invitation.
    #[must_use]
    pub fn operator(self: &Arc<Self>) -> Arc<Operator> {
        self.operators_issued.fetch_add(1, Ordering::Relaxed);
        let operator = Operator::new(Arc::clone(self));
        debug!(operator_id = %operator.id(), "Operator issued");
        Arc::new(operator)
    }

    /// Append `handler` to the handlers of `service`.
    ///
    /// Registering the same handler twice makes it answer twice.
    pub fn connect(&self, service: &str, handler: Handler) {
        let handler_id = handler.id();
        self.services.rcu(|current| {
            let mut next = ServiceMap::clone(current);
            let entry = next.entry(service.to_string()).or_default();
            let mut handlers = Vec::clone(entry);
            handlers.push(handler.clone());
            *entry = Arc::new(handlers);
            next
        });
        info!(
            service = %service,
            handler_id = %handler_id,
            total_handlers = self.handler_count(service),
            "Service handler connected"
        );
    }

    /// Broadcast `payload` to every handler of `service` not owned by `operator`.
    ///
    /// Nothing runs until the returned iterator is pulled; see [`AskAround`].
    /// An unknown service yields nothing.
    #[must_use]
    pub fn ask_around<'a>(
        &self,
        operator: &'a Operator,
        service: &str,
        payload: Value,
    ) -> AskAround<'a> {
        let handlers = self.services.load().get(service).map(Arc::clone);
        debug!(
            service = %service,
            operator_id = %operator.id(),
            candidates = handlers.as_ref().map_or(0, |h| h.len()),
            "Ask around"
        );
        AskAround::new(operator, service, payload, handlers)
    }

    /// Names of all services with at least one handler, sorted
    #[must_use]
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registrations under `service`, duplicates included
    #[must_use]
    pub fn handler_count(&self, service: &str) -> usize {
        self.services.load().get(service).map_or(0, |h| h.len())
    }

    /// Number of operators minted so far
    #[must_use]
    pub fn operator_count(&self) -> usize {
        self.operators_issued.load(Ordering::Relaxed)
    }
}
