//! Error types for the partyline dispatcher and broker.
//!
//! "Already joined" and "decline to answer" are not errors here: they are
//! [`JoinOutcome::AlreadyJoined`](crate::connector::JoinOutcome) and
//! [`Reply::NoAnswer`](crate::partyline::Reply) values. Everything in this
//! enum is a real failure.

use thiserror::Error;

/// Main error type for all partyline operations.
#[derive(Debug, Error)]
pub enum PartylineError {
    /// A mount-table key does not start with `/`.
    #[error("invalid mount '{mount}': sub-paths must start with '/'")]
    InvalidMount {
        /// The offending mount key
        mount: String,
    },

    /// Configuration value rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An invitation arrived without an operator in its context slot.
    #[error("invitation carries no operator under context key '{key}'")]
    MissingOperator {
        /// The context key that was looked up
        key: String,
    },

    /// `ask_around` was called through a connector that never joined.
    #[error("application has not joined the partyline")]
    NotJoined,

    /// A service handler failed (anything other than declining to answer).
    ///
    /// Yielded once by the broadcast iterator, which then stops.
    #[error("handler for service '{service}' failed: {source}")]
    Handler {
        /// Service name being broadcast
        service: String,
        /// The handler's own error
        #[source]
        source: anyhow::Error,
    },

    /// An application answered its invitation with a non-success status
    /// (only raised under the strict invitation policy).
    #[error("application '{target}' rejected its invitation with status {status}")]
    InvitationRejected {
        /// Mount key of the application, `<default>` for the default application
        target: String,
        /// Status code returned by the application
        status: u16,
    },

    /// An application failed while handling its invitation
    /// (only raised under the strict invitation policy).
    #[error("application '{target}' failed its invitation: {source}")]
    InvitationFailed {
        /// Mount key of the application, `<default>` for the default application
        target: String,
        /// The application's error
        #[source]
        source: anyhow::Error,
    },

    /// An answer could not be decoded into the requested type.
    #[error("could not decode answer: {0}")]
    Decode(#[from] serde_json::Error),

    /// A YAML configuration document could not be parsed.
    #[error("could not parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error while reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using PartylineError.
pub type Result<T> = std::result::Result<T, PartylineError>;
