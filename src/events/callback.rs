//! # Function-backed handler (`Callback`)
//!
//! [`Callback`] wraps a closure `F: Fn(C, Args) -> Fut`, producing a fresh boxed
//! future per invocation. Clones share the closure and its [`CallbackId`], which
//! is the identity used when unsubscribing a specific callback.
//!
//! ## Example
//! ```rust
//! use serde_json::{Value, json};
//! use sigvisor::{Callback, ContextId};
//!
//! let double: Callback<ContextId> = Callback::new(|_ctx: ContextId, args: Vec<Value>| async move {
//!     let n = args.first().and_then(Value::as_i64).unwrap_or(0);
//!     Ok(json!(n * 2))
//! });
//!
//! let same = double.clone();
//! assert_eq!(same.id(), double.id());
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use super::Args;
use crate::error::Error;

static CALLBACK_SEQ: AtomicU64 = AtomicU64::new(1);

/// Outcome of one handler invocation. `Value::Null` means "no result".
pub type HandlerResult = Result<Value, Error>;

/// Boxed future returned by every callback.
pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

type HandlerFn<C> = dyn Fn(C, Args) -> HandlerFuture + Send + Sync;

/// Stable identity of a callback, shared by its clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

impl CallbackId {
    fn next() -> Self {
        Self(CALLBACK_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// Shared asynchronous handler invoked with its registration's context.
pub struct Callback<C> {
    id: CallbackId,
    f: Arc<HandlerFn<C>>,
}

impl<C: 'static> Callback<C> {
    /// Creates a callback with a fresh identity.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(C, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::with_id(CallbackId::next(), f)
    }

    /// Creates a callback that reuses an existing identity.
    ///
    /// Used when a callback is adapted to another context type but must still
    /// be removable by the identity the caller knows.
    pub(crate) fn with_id<F, Fut>(id: CallbackId, f: F) -> Self
    where
        F: Fn(C, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            id,
            f: Arc::new(move |ctx, args| f(ctx, args).boxed()),
        }
    }

    /// Returns the identity of this callback.
    #[inline]
    pub fn id(&self) -> CallbackId {
        self.id
    }

    /// Invokes the callback, returning its (not yet polled) future.
    pub fn call(&self, ctx: C, args: Args) -> HandlerFuture {
        (self.f)(ctx, args)
    }
}

impl<C> Clone for Callback<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            f: Arc::clone(&self.f),
        }
    }
}

impl<C> fmt::Debug for Callback<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("id", &self.id).finish()
    }
}
