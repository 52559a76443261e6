use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::events::{Args, Callback, CallbackId, ContextId, Emission, Emitter, HandlerId};
use crate::runners::Runner;

static GLOBAL: LazyLock<Hub> = LazyLock::new(Hub::new);

#[derive(Default)]
struct HubInner {
    emitter: Emitter<ContextId>,
    memory: RwLock<HashMap<String, Args>>,
}

/// Shared publish/subscribe registry.
///
/// Cheap to clone: clones share subscribers and memory.
///
/// # Example
/// ```
/// use serde_json::json;
/// use sigvisor::Hub;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), sigvisor::Error> {
/// let hub = Hub::new();
/// assert_eq!(hub.peek("price", vec![json!("none")]), vec![json!("none")]);
///
/// hub.publish("price", vec![json!(42)]).await?;
/// assert_eq!(hub.peek("price", vec![]), vec![json!(42)]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    /// Creates an isolated hub (no subscribers, no memory).
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide hub, created on first use.
    pub fn global() -> Hub {
        GLOBAL.clone()
    }

    /// Stores `args` as the memory of `topic`, then runs its subscribers through
    /// the pipeline runner.
    ///
    /// Resolves to the final argument list of the pipeline.
    pub async fn publish(&self, topic: &str, args: Args) -> Result<Args, Error> {
        self.inner
            .memory
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(topic.to_owned(), args.clone());

        debug!(topic, args = args.len(), "publish");
        self.inner
            .emitter
            .emit_with(Emission::new(topic).with_runner(Runner::Pipeline), args)
            .await
    }

    /// Subscribes `callback` to `topic` on behalf of `context`.
    pub async fn subscribe(
        &self,
        topic: &str,
        context: ContextId,
        callback: Callback<ContextId>,
        data: Option<Value>,
    ) -> Result<HandlerId, Error> {
        self.inner.emitter.on(topic, context, callback, data).await
    }

    /// Removes the subscriptions of `context` to `topic` (only `callback`'s, if given).
    pub async fn unsubscribe(
        &self,
        topic: &str,
        context: ContextId,
        callback: Option<CallbackId>,
    ) -> Result<usize, Error> {
        self.inner.emitter.off(topic, Some(&context), callback).await
    }

    /// Last published arguments of `topic`, or `default` if it was never published.
    pub fn peek(&self, topic: &str, default: Args) -> Args {
        self.memory(topic).unwrap_or(default)
    }

    /// Last published arguments of `topic`, if any.
    pub fn memory(&self, topic: &str) -> Option<Args> {
        self.inner
            .memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .cloned()
    }

    /// Number of current subscribers of `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner.emitter.handler_count(topic)
    }

    /// True when both handles share the same registry.
    pub fn ptr_eq(&self, other: &Hub) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("topics", &self.inner.emitter.topics())
            .finish_non_exhaustive()
    }
}
