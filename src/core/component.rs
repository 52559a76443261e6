//! # Component: lifecycle state machine over a private emitter.
//!
//! A [`Component`] owns an [`Emitter`] whose handlers all run against the
//! component itself. Its lifecycle is driven by `sig/*` signals emitted through
//! the sequence runner, and it reaches other components through the [`Hub`].
//!
//! ## Lifecycle
//! ```text
//! start(args):
//!   phase ∈ {Uninitialized, Finalized}? ── no ──► Err(InvalidTransition), nothing emitted
//!   ├─► phase = Initialize ─► signal("initialize", args)
//!   ├─► phase = Start      ─► signal("start", args)
//!   └─► phase = Started    ─► Ok(initialize results ++ start results)
//!
//! stop(args):
//!   phase == Started? ── no ──► Err(InvalidTransition), nothing emitted
//!   ├─► phase = Stop       ─► signal("stop", args)
//!   ├─► phase = Finalize   ─► signal("finalize", args)
//!   └─► phase = Finalized  ─► Ok(stop results ++ finalize results)
//! ```
//!
//! ## Rules
//! - A rejected signal aborts the call and leaves the phase at the failed stage.
//! - Lifecycle signals never overlap: each stage awaits the previous one.
//! - Handlers hold the component weakly; a handle dropped by every owner
//!   rejects later invocations with [`Error::Canceled`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::FutureExt;
use futures::future;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::builder::ComponentBuilder;
use super::config::Config;
use super::configuration;
use super::phase::Phase;
use crate::error::Error;
use crate::events::{Args, Callback, CallbackId, ContextId, Emission, Emitter, HandlerId, SIG_PREFIX};
use crate::hub::Hub;
use crate::mixins::{Special, SpecialKind};
use crate::tasks::{Task, TaskResolver};

/// Prefix of local topics bridged to the hub.
pub(crate) const HUB_PREFIX: &str = "hub/";

pub(crate) struct Inner {
    id: ContextId,
    config: Config,
    phase: Mutex<Phase>,
    configuration: Mutex<Map<String, Value>>,
    emitter: Emitter<ComponentRef>,
    hub: Hub,
    specials: Vec<Special>,
    /// Hub proxies by local `hub/<topic>` topic.
    proxies: Mutex<HashMap<String, Callback<ContextId>>>,
}

/// Weak handle used as the context of the component's own registrations.
#[derive(Clone)]
pub(crate) struct ComponentRef(Weak<Inner>);

impl ComponentRef {
    pub(crate) fn upgrade(&self) -> Option<Component> {
        self.0.upgrade().map(|inner| Component { inner })
    }
}

impl PartialEq for ComponentRef {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

/// Lifecycle-managed unit of behavior.
///
/// Cheap to clone; clones are the same component.
///
/// # Example
/// ```
/// use serde_json::{Value, json};
/// use sigvisor::{Callback, Component, Config, Hub, Phase, Special};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), sigvisor::Error> {
/// let component = Component::builder()
///     .with_config(Config::default().with_display_name("demo"))
///     .with_hub(Hub::new())
///     .with_special(Special::signal(
///         "start",
///         Callback::new(|c: Component, _| async move {
///             c.configure([json!({"ready": true})])?;
///             Ok(json!("started"))
///         }),
///     ))
///     .build();
///
/// let results = component.start(vec![]).await?;
/// assert!(results.contains(&json!("started")));
/// assert_eq!(component.phase(), Phase::Started);
/// assert_eq!(component.configuration()["ready"], Value::Bool(true));
///
/// assert!(component.start(vec![]).await.is_err());
/// component.stop(vec![]).await?;
/// assert_eq!(component.phase(), Phase::Finalized);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Component {
    inner: Arc<Inner>,
}

impl Component {
    /// Builder with the default [`Config`] and the process-wide hub.
    pub fn builder() -> ComponentBuilder {
        ComponentBuilder::new(Config::default())
    }

    pub(crate) fn from_parts(config: Config, hub: Hub, specials: Vec<Special>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: ContextId::next(),
                config,
                phase: Mutex::new(Phase::default()),
                configuration: Mutex::new(Map::new()),
                emitter: Emitter::new(),
                hub,
                specials,
                proxies: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Instance identity (process-wide counter).
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// Display name from the build [`Config`].
    pub fn display_name(&self) -> &str {
        &self.inner.config.display_name
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        *lock(&self.inner.phase)
    }

    /// Hub this component publishes to and subscribes on.
    pub fn hub(&self) -> &Hub {
        &self.inner.hub
    }

    /// Build settings.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub(crate) fn context(&self) -> ComponentRef {
        ComponentRef(Arc::downgrade(&self.inner))
    }

    pub(crate) fn specials(&self) -> &[Special] {
        &self.inner.specials
    }

    // ---- events ----

    /// Registers `callback` for a local `topic`.
    ///
    /// The first handler of a non-signal topic triggers `sig/setup` first.
    pub async fn on(
        &self,
        topic: &str,
        callback: Callback<Component>,
        data: Option<Value>,
    ) -> Result<HandlerId, Error> {
        self.inner.emitter.on(topic, self.context(), bind(callback), data).await
    }

    /// Removes this component's handlers of `topic` (only `callback`'s, if given).
    ///
    /// Emptying a non-signal topic triggers `sig/teardown`.
    pub async fn off(&self, topic: &str, callback: Option<CallbackId>) -> Result<usize, Error> {
        self.inner.emitter.off(topic, Some(&self.context()), callback).await
    }

    /// Emits a local topic through the sequence runner.
    pub async fn emit(&self, topic: &str, args: Args) -> Result<Args, Error> {
        self.inner.emitter.emit(topic, args).await
    }

    /// Emits a local topic as described by `emission`.
    pub async fn emit_with(&self, emission: Emission, args: Args) -> Result<Args, Error> {
        self.inner.emitter.emit_with(emission, args).await
    }

    /// Emits `sig/<name>` through the sequence runner.
    pub async fn signal(&self, name: &str, args: Args) -> Result<Args, Error> {
        self.emit(&format!("{SIG_PREFIX}{name}"), args).await
    }

    /// Number of local handlers of `topic`.
    pub fn handler_count(&self, topic: &str) -> usize {
        self.inner.emitter.handler_count(topic)
    }

    /// Local topics with handlers, in creation order.
    pub fn topics(&self) -> Vec<String> {
        self.inner.emitter.topics()
    }

    pub(crate) fn attach_specials(&self) {
        for special in &self.inner.specials {
            if let SpecialKind::Signal(name) = special.kind() {
                self.inner.emitter.attach_signal(
                    name,
                    self.context(),
                    bind(special.callback().clone()),
                    special.data().cloned(),
                );
            }
        }
    }

    // ---- lifecycle ----

    /// Runs `initialize` then `start`, resolving to both signals' results.
    ///
    /// Fails with [`Error::InvalidTransition`] (emitting nothing) unless the
    /// component is uninitialized or finalized.
    pub async fn start(&self, args: Args) -> Result<Args, Error> {
        self.transition(Phase::can_start, Phase::Initialize)?;
        let mut results = self.signal("initialize", args.clone()).await?;

        self.set_phase(Phase::Start);
        results.extend(self.signal("start", args).await?);

        self.set_phase(Phase::Started);
        Ok(results)
    }

    /// Runs `stop` then `finalize`, resolving to both signals' results.
    ///
    /// Fails with [`Error::InvalidTransition`] (emitting nothing) unless the
    /// component is started.
    pub async fn stop(&self, args: Args) -> Result<Args, Error> {
        self.transition(Phase::can_stop, Phase::Stop)?;
        let mut results = self.signal("stop", args.clone()).await?;

        self.set_phase(Phase::Finalize);
        results.extend(self.signal("finalize", args).await?);

        self.set_phase(Phase::Finalized);
        Ok(results)
    }

    fn transition(&self, allowed: fn(Phase) -> bool, to: Phase) -> Result<(), Error> {
        let mut phase = lock(&self.inner.phase);
        let from = *phase;
        if !allowed(from) {
            warn!(component = %self, %from, %to, "invalid phase transition");
            return Err(Error::InvalidTransition { from, to });
        }
        *phase = to;
        debug!(component = %self, %from, %to, "phase");
        Ok(())
    }

    fn set_phase(&self, to: Phase) {
        let from = std::mem::replace(&mut *lock(&self.inner.phase), to);
        debug!(component = %self, %from, %to, "phase");
    }

    // ---- configuration ----

    /// Deep-merges each partial into the instance configuration and returns the result.
    ///
    /// Every partial must be a JSON object; otherwise nothing is merged.
    pub fn configure(&self, partials: impl IntoIterator<Item = Value>) -> Result<Value, Error> {
        let partials = partials
            .into_iter()
            .map(configuration::as_partial)
            .collect::<Result<Vec<_>, _>>()?;

        let mut current = lock(&self.inner.configuration);
        for partial in partials {
            configuration::merge(&mut current, partial);
        }
        Ok(Value::Object(current.clone()))
    }

    /// Current instance configuration (a JSON object).
    pub fn configuration(&self) -> Value {
        Value::Object(lock(&self.inner.configuration).clone())
    }

    // ---- tasks ----

    /// Creates a task, hands its resolver to `resolver`, then signals `task`
    /// with the task's info (`finished` still unset).
    ///
    /// A rejection of the `task` signal is returned instead of the task.
    ///
    /// `sig/task` handlers (and hub `task` subscribers) receive a JSON snapshot
    /// of [`TaskInfo`](crate::TaskInfo), not the [`Task`] itself: they cannot
    /// await it, follow its progress or observe `finished` being set.
    pub async fn task<F>(&self, resolver: F, name: Option<&str>) -> Result<Task, Error>
    where
        F: FnOnce(TaskResolver) + Send,
    {
        let (task, settle) = Task::new(
            self.id(),
            name.map(str::to_owned),
            self.inner.config.progress_capacity_clamped(),
        );
        let info = task.info().to_value();
        resolver(settle);

        debug!(component = %self, task = ?task.name(), "task");
        self.signal("task", vec![info]).await?;
        Ok(task)
    }

    // ---- hub bridge ----

    /// Subscribes `callback` to hub `topic` (registered locally as `hub/<topic>`).
    pub async fn subscribe(
        &self,
        topic: &str,
        callback: Callback<Component>,
        data: Option<Value>,
    ) -> Result<HandlerId, Error> {
        self.on(&format!("{HUB_PREFIX}{topic}"), callback, data).await
    }

    /// Removes this component's subscriptions to hub `topic`.
    pub async fn unsubscribe(&self, topic: &str, callback: Option<CallbackId>) -> Result<usize, Error> {
        self.off(&format!("{HUB_PREFIX}{topic}"), callback).await
    }

    /// Publishes on the hub.
    pub async fn publish(&self, topic: &str, args: Args) -> Result<Args, Error> {
        self.inner.hub.publish(topic, args).await
    }

    /// Hub memory of `topic`, or `default`.
    pub fn peek(&self, topic: &str, default: Args) -> Args {
        self.inner.hub.peek(topic, default)
    }

    pub(crate) fn insert_proxy(&self, topic: &str, proxy: Callback<ContextId>) {
        lock(&self.inner.proxies).insert(topic.to_owned(), proxy);
    }

    pub(crate) fn take_proxy(&self, topic: &str) -> Option<Callback<ContextId>> {
        lock(&self.inner.proxies).remove(topic)
    }

    pub(crate) fn drain_proxies(&self) -> Vec<(String, Callback<ContextId>)> {
        lock(&self.inner.proxies).drain().collect()
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.inner.config.display_name, self.inner.id)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.inner.config.display_name)
            .field("id", &self.inner.id)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Adapts a component callback to the weak context, keeping its identity.
pub(crate) fn bind(callback: Callback<Component>) -> Callback<ComponentRef> {
    Callback::with_id(callback.id(), move |ctx: ComponentRef, args| match ctx.upgrade() {
        Some(component) => callback.call(component, args),
        None => future::ready(Err(Error::Canceled)).boxed(),
    })
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
