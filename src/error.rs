//! Error type used by the emitter, the component lifecycle, the hub and tasks.
//!
//! A single [`Error`] enum covers every failure the kernel surfaces:
//!
//! - lifecycle contract violations ([`Error::InvalidTransition`]);
//! - handler failures ([`Error::Rejected`], [`Error::Panicked`]);
//! - bad declarations or configuration ([`Error::InvalidSpecial`], [`Error::Configuration`]);
//! - cooperative cancellation ([`Error::Canceled`]).
//!
//! Handlers return the same type, so a handler can forward a nested kernel
//! failure with `?` and it reaches the caller of the enclosing emission unchanged.
//! `Error` is `Clone` because a settled task outcome is shared by every waiter.

use thiserror::Error;

use crate::core::Phase;

/// # Errors produced by the kernel and by user handlers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `start`/`stop` requested from a phase that does not allow it.
    ///
    /// Surfaced before any signal is emitted; the phase is left unchanged.
    #[error("can't transition phase from '{from}' to '{to}'")]
    InvalidTransition {
        /// Phase the component was in when the call was made.
        from: Phase,
        /// Phase the call tried to enter.
        to: Phase,
    },

    /// A handler (or task resolver) rejected.
    #[error("rejected: {reason}")]
    Rejected {
        /// Human-readable rejection reason.
        reason: String,
    },

    /// A handler panicked while being polled.
    #[error("handler for '{topic}' panicked: {info}")]
    Panicked {
        /// Topic being emitted when the panic happened.
        topic: String,
        /// Panic payload, if it was a string.
        info: String,
    },

    /// A configuration partial could not be merged.
    #[error("invalid configuration: {reason}")]
    Configuration {
        /// What was wrong with the partial.
        reason: String,
    },

    /// A declarative handler key is not `sig/`, `hub/` or `on/` prefixed.
    #[error("invalid declarative handler key '{key}'")]
    InvalidSpecial {
        /// The offending key.
        key: String,
    },

    /// The operation was cancelled (task cancelled, resolver dropped, component gone).
    #[error("cancelled")]
    Canceled,
}

impl Error {
    /// Shorthand for [`Error::Rejected`].
    ///
    /// # Example
    /// ```
    /// use sigvisor::Error;
    ///
    /// let err = Error::rejected("boom");
    /// assert_eq!(err.to_string(), "rejected: boom");
    /// ```
    pub fn rejected(reason: impl Into<String>) -> Self {
        Error::Rejected {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use sigvisor::{Error, Phase};
    ///
    /// let err = Error::InvalidTransition { from: Phase::Started, to: Phase::Initialize };
    /// assert_eq!(err.as_label(), "invalid_transition");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::Rejected { .. } => "handler_rejected",
            Error::Panicked { .. } => "handler_panicked",
            Error::Configuration { .. } => "invalid_configuration",
            Error::InvalidSpecial { .. } => "invalid_special",
            Error::Canceled => "canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            Error::InvalidTransition { from, to } => format!("transition {from} -> {to}"),
            Error::Rejected { reason } => format!("rejected: {reason}"),
            Error::Panicked { topic, info } => format!("panic on {topic}: {info}"),
            Error::Configuration { reason } => format!("configuration: {reason}"),
            Error::InvalidSpecial { key } => format!("special: {key}"),
            Error::Canceled => "cancelled".to_string(),
        }
    }

    /// True for [`Error::InvalidTransition`].
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Error::InvalidTransition { .. })
    }
}
