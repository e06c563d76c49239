use std::iter::FusedIterator;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::handler::{Handler, Reply};
use super::operator::Operator;
use crate::error::{PartylineError, Result};

/// Lazy sequence of answers to one broadcast.
///
/// Handlers run one at a time, inline, when [`Iterator::next`] is called,
/// in registration order. Handlers owned by the asking operator are skipped
/// without being called, and so are handlers that reply
/// [`Reply::NoAnswer`]. A handler error is yielded once and ends the
/// sequence; later handlers are never called. Dropping the iterator early
/// leaves the remaining handlers uncalled.
pub struct AskAround<'a> {
    operator: &'a Operator,
    service: String,
    payload: Value,
    handlers: Option<Arc<Vec<Handler>>>,
    position: usize,
    finished: bool,
}

impl<'a> AskAround<'a> {
    pub(crate) fn new(
        operator: &'a Operator,
        service: &str,
        payload: Value,
        handlers: Option<Arc<Vec<Handler>>>,
    ) -> Self {
        Self {
            operator,
            service: service.to_string(),
            payload,
            handlers,
            position: 0,
            finished: false,
        }
    }

    /// Service being asked about
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Payload sent to every handler
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Drain the broadcast, stopping at the first handler failure.
    pub fn answers(self) -> Result<Vec<Value>> {
        self.collect()
    }
}

impl Iterator for AskAround<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let Some(handlers) = self.handlers.as_ref().map(Arc::clone) else {
            self.finished = true;
            return None;
        };

        while let Some(handler) = handlers.get(self.position) {
            self.position += 1;

            if self.operator.owns(handler.id()) {
                debug!(
                    service = %self.service,
                    handler_id = %handler.id(),
                    "Skipping own handler"
                );
                continue;
            }

            match handler.call(&self.payload) {
                Ok(Reply::Answer(answer)) => return Some(Ok(answer)),
                Ok(Reply::NoAnswer) => {
                    debug!(
                        service = %self.service,
                        handler_id = %handler.id(),
                        "Handler declined to answer"
                    );
                }
                Err(source) => {
                    warn!(
                        service = %self.service,
                        handler_id = %handler.id(),
                        error = %source,
                        "Handler failed - broadcast aborted"
                    );
                    self.finished = true;
                    return Some(Err(PartylineError::Handler {
                        service: self.service.clone(),
                        source,
                    }));
                }
            }
        }

        self.finished = true;
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            return (0, Some(0));
        }
        let remaining = self
            .handlers
            .as_ref()
            .map_or(0, |h| h.len().saturating_sub(self.position));
        (0, Some(remaining))
    }
}

impl FusedIterator for AskAround<'_> {}
