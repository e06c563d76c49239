use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ask::AskAround;
use super::broker::Partyline;
use super::handler::Handler;
use crate::error::Result;
use crate::ids::{HandlerId, OperatorId};

/// One application's line into the partyline.
///
/// Records which handlers the application registered so that its own
/// broadcasts never reach them, and forwards everything else to the shared
/// [`Partyline`]. Never share one operator between two applications: each
/// would stop hearing the other.
pub struct Operator {
    id: OperatorId,
    partyline: Arc<Partyline>,
    handlers: RwLock<HashSet<HandlerId>>,
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("id", &self.id)
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl Operator {
    pub(crate) fn new(partyline: Arc<Partyline>) -> Self {
        Self {
            id: OperatorId::new(),
            partyline,
            handlers: RwLock::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn id(&self) -> OperatorId {
        self.id
    }

    /// The broker this operator is bound to
    #[must_use]
    pub fn partyline(&self) -> &Arc<Partyline> {
        &self.partyline
    }

    /// Register `handler` for `service` on behalf of this application.
    pub fn connect(&self, service: &str, handler: Handler) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handler.id());
        self.partyline.connect(service, handler);
    }

    /// Ask every other application's `service` handlers about `payload`.
    #[must_use]
    pub fn ask_around(&self, service: &str, payload: Value) -> AskAround<'_> {
        self.partyline.ask_around(self, service, payload)
    }

    /// Like [`ask_around`](Self::ask_around), decoding each answer into `T`.
    pub fn ask_around_as<T: DeserializeOwned>(
        &self,
        service: &str,
        payload: Value,
    ) -> impl Iterator<Item = Result<T>> + '_ {
        self.ask_around(service, payload)
            .map(|answer| answer.and_then(|value| Ok(serde_json::from_value(value)?)))
    }

    /// First answer only; handlers after the first answering one are not called.
    pub fn ask_first(&self, service: &str, payload: Value) -> Result<Option<Value>> {
        self.ask_around(service, payload).next().transpose()
    }

    /// Whether `handler` was registered through this operator
    #[must_use]
    pub fn owns(&self, handler: HandlerId) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&handler)
    }

    /// Number of distinct handlers registered through this operator
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
