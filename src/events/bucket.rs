//! Per-topic handler storage.
//!
//! A [`Bucket`] holds the insertion-ordered registrations of one topic plus a
//! monotonically increasing count of removed handlers.
//!
//! ## Rules
//! - Removal keeps the relative order of the remaining registrations.
//! - A removed registration is deactivated immediately, so an emission that
//!   snapshotted it skips it from then on.
//! - A bucket is `Settling` while its `setup`/`teardown` meta-signal runs;
//!   membership changes wait until it settles.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};

use serde_json::{Value, json};
use tokio::sync::watch;

use super::callback::{Callback, CallbackId};
use super::context::Context;

static HANDLER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identity of one registration, returned by `on`/`subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One subscription of a callback (with its context and data) to a topic.
pub struct Registration<C> {
    id: HandlerId,
    context: C,
    callback: Callback<C>,
    data: Option<Value>,
    active: AtomicBool,
}

impl<C: Context> Registration<C> {
    fn new(context: C, callback: Callback<C>, data: Option<Value>) -> Self {
        Self {
            id: HandlerId(HANDLER_SEQ.fetch_add(1, AtomicOrdering::Relaxed)),
            context,
            callback,
            data,
            active: AtomicBool::new(true),
        }
    }

    /// Registration identity.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Context the callback runs against.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// The registered callback.
    pub fn callback(&self) -> &Callback<C> {
        &self.callback
    }

    /// Opaque data attached by the subscriber.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// False once the registration has been removed.
    pub fn is_active(&self) -> bool {
        self.active.load(AtomicOrdering::Acquire)
    }

    fn matches(&self, context: Option<&C>, callback: Option<CallbackId>) -> bool {
        context.is_none_or(|c| *c == self.context)
            && callback.is_none_or(|id| id == self.callback.id())
    }
}

impl<C> fmt::Debug for Registration<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("callback", &self.callback)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// Membership state of a bucket.
pub(crate) enum BucketState {
    Ready,
    /// A meta-signal is in flight; the sender side is dropped once it settles.
    Settling(watch::Receiver<()>),
}

pub(crate) struct Bucket<C> {
    /// Creation order among the emitter's buckets.
    pub(crate) created: u64,
    pub(crate) handlers: Vec<Arc<Registration<C>>>,
    pub(crate) removed: u64,
    pub(crate) state: BucketState,
}

impl<C: Context> Bucket<C> {
    pub(crate) fn new(created: u64, state: BucketState) -> Self {
        Self {
            created,
            handlers: Vec::new(),
            removed: 0,
            state,
        }
    }

    pub(crate) fn push(&mut self, context: C, callback: Callback<C>, data: Option<Value>) -> HandlerId {
        let reg = Arc::new(Registration::new(context, callback, data));
        let id = reg.id();
        self.handlers.push(reg);
        id
    }

    /// Removes matching registrations, returning how many were removed.
    pub(crate) fn remove_matching(&mut self, context: Option<&C>, callback: Option<CallbackId>) -> usize {
        let before = self.handlers.len();
        self.handlers.retain(|reg| {
            if reg.matches(context, callback) {
                reg.active.store(false, AtomicOrdering::Release);
                false
            } else {
                true
            }
        });
        let n = before - self.handlers.len();
        self.removed += n as u64;
        n
    }

    /// Summary handed to `setup`/`teardown` handlers.
    pub(crate) fn info(&self, topic: &str) -> Value {
        json!({
            "topic": topic,
            "handlers": self.handlers.len(),
            "removed": self.removed,
        })
    }
}
