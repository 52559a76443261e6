//! Ordered asynchronous event emitter.
//!
//! This module groups the handler **data model** and the [`Emitter`] that
//! owns per-topic handler buckets and runs emissions through a [`Runner`](crate::Runner).
//!
//! ## Contents
//! - [`Callback`], [`CallbackId`] shared async handler functions and their identity
//! - [`Context`], [`ContextId`] the target a callback runs against
//! - [`Registration`], [`HandlerId`] one subscription of a callback to a topic
//! - [`Emitter`], [`Emission`] subscribe/unsubscribe/emit
//!
//! ## Topics
//! ```text
//! "sig/<name>"   signal topics (never trigger setup/teardown)
//! "sig/setup"    meta-signal: first handler attached to a non-signal topic
//! "sig/teardown" meta-signal: last handler removed from a non-signal topic
//! "<anything>"   regular topics
//! ```

mod bucket;
mod callback;
mod context;
mod emitter;

pub use bucket::{HandlerId, Registration};
pub use callback::{Callback, CallbackId, HandlerFuture, HandlerResult};
pub use context::{Context, ContextId};
pub use emitter::{Emission, Emitter};

use serde_json::Value;

/// Argument list of one emission.
pub type Args = Vec<Value>;

/// Prefix of signal topics.
pub const SIG_PREFIX: &str = "sig/";
/// Meta-signal emitted before the first handler of a topic becomes visible.
pub const SIG_SETUP: &str = "sig/setup";
/// Meta-signal emitted after the last handler of a topic was removed.
pub const SIG_TEARDOWN: &str = "sig/teardown";

/// True for `sig/*` topics.
#[inline]
pub fn is_signal(topic: &str) -> bool {
    topic.starts_with(SIG_PREFIX)
}
