use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::ids::HandlerId;

/// What a service handler says to a broadcast.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// An answer for the asker
    Answer(Value),
    /// "I have nothing to say about this payload." Skipped by the broadcast.
    NoAnswer,
}

impl From<Option<Value>> for Reply {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Reply::NoAnswer, Reply::Answer)
    }
}

/// Result type for handler functions.
pub type HandlerResult = anyhow::Result<Reply>;

type HandlerFn = dyn Fn(&Value) -> HandlerResult + Send + Sync;

/// A service handler registered with the partyline.
///
/// Cloning is cheap and keeps the [`HandlerId`]: the clone is the same
/// handler as far as self-exclusion is concerned.
#[derive(Clone)]
pub struct Handler {
    id: HandlerId,
    func: Arc<HandlerFn>,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("id", &self.id).finish()
    }
}

impl Handler {
    /// Wrap a raw JSON handler.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            id: HandlerId::new(),
            func: Arc::new(func),
        }
    }

    /// Wrap a handler that works on typed payloads and answers.
    ///
    /// A payload that does not deserialize into `P` is declined, since a
    /// handler cannot answer a question it cannot read. Returning `Ok(None)`
    /// also declines.
    pub fn typed<P, R, F>(func: F) -> Self
    where
        P: DeserializeOwned,
        R: Serialize,
        F: Fn(P) -> anyhow::Result<Option<R>> + Send + Sync + 'static,
    {
        Self::new(move |payload: &Value| {
            let parsed: P = match P::deserialize(payload) {
                Ok(p) => p,
                Err(e) => {
                    debug!(
                        payload_type = std::any::type_name::<P>(),
                        error = %e,
                        "Payload does not fit typed handler - declining"
                    );
                    return Ok(Reply::NoAnswer);
                }
            };
            match func(parsed)? {
                Some(answer) => Ok(Reply::Answer(serde_json::to_value(answer)?)),
                None => Ok(Reply::NoAnswer),
            }
        })
    }

    #[must_use]
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Invoke the handler on a payload.
    pub fn call(&self, payload: &Value) -> HandlerResult {
        (self.func)(payload)
    }
}
