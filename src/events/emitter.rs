//! # Emitter: ordered async handlers per topic.
//!
//! [`Emitter`] keeps, per topic, an insertion-ordered list of registrations and
//! runs them through a [`Runner`] when the topic is emitted.
//!
//! ## Architecture
//! ```text
//! on(topic) ──► first handler of a non-signal topic?
//!                 ├─ yes ─► bucket Settling ─► emit sig/setup ─► bucket Ready ─► push
//!                 │                                  └─ rejected ─► emit sig/teardown ─► discard bucket
//!                 └─ no  ─► push
//!
//! off(topic) ─► remove matching (deactivate) ─► bucket empty and non-signal?
//!                 ├─ yes ─► bucket Settling ─► emit sig/teardown ─► discard bucket
//!                 └─ no  ─► done
//!
//! emit(topic) ─► snapshot registrations ─► Runner::run(snapshot, args)
//! ```
//!
//! ## Rules
//! - An emission works on the membership snapshot taken when it starts;
//!   handlers added later are not invoked by it, removed ones are skipped.
//! - `setup` completes before the triggering registration is visible to `emit`.
//! - `teardown` completes before the bucket is discarded.
//! - No lock is held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::bucket::{Bucket, BucketState, HandlerId, Registration};
use super::callback::{Callback, CallbackId};
use super::context::Context;
use super::{Args, SIG_SETUP, SIG_TEARDOWN, is_signal};
use crate::error::Error;
use crate::runners::Runner;

/// Describes one emission: topic, runner and an optional callback filter.
///
/// ```
/// use sigvisor::{Emission, Runner};
///
/// let emission = Emission::new("price").with_runner(Runner::Pipeline);
/// assert_eq!(emission.topic(), "price");
/// assert_eq!(emission.runner(), Runner::Pipeline);
/// ```
#[derive(Debug, Clone)]
pub struct Emission {
    topic: String,
    runner: Runner,
    callback: Option<CallbackId>,
}

impl Emission {
    /// Emission of `topic` through the sequence runner.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            runner: Runner::default(),
            callback: None,
        }
    }

    /// Selects the runner.
    #[inline]
    pub fn with_runner(mut self, runner: Runner) -> Self {
        self.runner = runner;
        self
    }

    /// Restricts the emission to registrations of one callback.
    #[inline]
    pub fn with_callback(mut self, callback: CallbackId) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Topic being emitted.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Runner combining the handlers' results.
    pub fn runner(&self) -> Runner {
        self.runner
    }
}

struct Buckets<C> {
    by_topic: HashMap<String, Bucket<C>>,
    created: u64,
}

impl<C: Context> Buckets<C> {
    /// Returns the bucket of `topic`, creating it in `state` if missing.
    fn entry(&mut self, topic: &str, state: BucketState) -> &mut Bucket<C> {
        let created = &mut self.created;
        self.by_topic.entry(topic.to_owned()).or_insert_with(|| {
            *created += 1;
            Bucket::new(*created, state)
        })
    }

    /// Recovers a bucket whose meta-signal future was dropped before settling.
    fn abandon(&mut self, topic: &str) {
        let Some(bucket) = self.by_topic.get_mut(topic) else {
            return;
        };
        if bucket.handlers.is_empty() {
            self.by_topic.remove(topic);
        } else {
            bucket.state = BucketState::Ready;
        }
    }
}

enum Admit {
    Added(HandlerId),
    Retry,
    Wait(watch::Receiver<()>),
    Setup(watch::Sender<()>, Value),
}

enum Release {
    Done(usize),
    Retry,
    Wait(watch::Receiver<()>),
    Teardown(watch::Sender<()>, Value, usize),
}

/// Topic-keyed collection of ordered async handlers.
pub struct Emitter<C: Context> {
    buckets: Mutex<Buckets<C>>,
}

impl<C: Context> Emitter<C> {
    /// Creates an emitter with no topics.
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(Buckets {
                by_topic: HashMap::new(),
                created: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Buckets<C>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `callback` for `topic`, to be invoked against `context`.
    ///
    /// The first registration of a non-signal topic emits `sig/setup` with
    /// `[topic, bucket_info]` and only becomes visible once that settles.
    /// A rejected setup emits `sig/teardown` for the topic, discards the bucket
    /// and is returned as the error.
    pub async fn on(
        &self,
        topic: &str,
        context: C,
        callback: Callback<C>,
        data: Option<Value>,
    ) -> Result<HandlerId, Error> {
        loop {
            let admit = {
                let mut buckets = self.lock();
                match buckets.by_topic.get_mut(topic) {
                    Some(bucket) => match &bucket.state {
                        BucketState::Ready => {
                            Admit::Added(bucket.push(context.clone(), callback.clone(), data.clone()))
                        }
                        BucketState::Settling(rx) if rx.has_changed().is_ok() => Admit::Wait(rx.clone()),
                        BucketState::Settling(_) => {
                            buckets.abandon(topic);
                            Admit::Retry
                        }
                    },
                    None if is_signal(topic) => {
                        let bucket = buckets.entry(topic, BucketState::Ready);
                        Admit::Added(bucket.push(context.clone(), callback.clone(), data.clone()))
                    }
                    None => {
                        let (tx, rx) = watch::channel(());
                        let bucket = buckets.entry(topic, BucketState::Settling(rx));
                        Admit::Setup(tx, bucket.info(topic))
                    }
                }
            };

            match admit {
                Admit::Added(id) => return Ok(id),
                Admit::Retry => {}
                Admit::Wait(mut rx) => {
                    let _ = rx.changed().await;
                }
                Admit::Setup(settled, info) => {
                    debug!(topic, "setup");
                    let res = self
                        .emit(SIG_SETUP, vec![Value::from(topic), info.clone()])
                        .await;
                    if let Err(e) = res {
                        // Setup handlers that ran before the rejection are undone.
                        if let Err(undo) = self
                            .emit(SIG_TEARDOWN, vec![Value::from(topic), info])
                            .await
                        {
                            warn!(topic, error = %undo, "teardown after rejected setup failed");
                        }
                        self.lock().by_topic.remove(topic);
                        drop(settled);
                        return Err(e);
                    }
                    let id = {
                        let mut buckets = self.lock();
                        let bucket = buckets.entry(topic, BucketState::Ready);
                        bucket.state = BucketState::Ready;
                        bucket.push(context, callback, data)
                    };
                    drop(settled);
                    return Ok(id);
                }
            }
        }
    }

    /// Removes registrations of `topic`, returning how many were removed.
    ///
    /// Matching: with both `context` and `callback`, only exact matches; with
    /// only `context`, every handler of that context; with neither, all handlers.
    /// Emptying a non-signal topic emits `sig/teardown` with `[topic, bucket_info]`
    /// before the bucket is discarded.
    pub async fn off(
        &self,
        topic: &str,
        context: Option<&C>,
        callback: Option<CallbackId>,
    ) -> Result<usize, Error> {
        loop {
            let release = {
                let mut buckets = self.lock();
                let Some(bucket) = buckets.by_topic.get_mut(topic) else {
                    return Ok(0);
                };
                match &bucket.state {
                    BucketState::Settling(rx) if rx.has_changed().is_ok() => Release::Wait(rx.clone()),
                    BucketState::Settling(_) => {
                        buckets.abandon(topic);
                        Release::Retry
                    }
                    BucketState::Ready => {
                        let removed = bucket.remove_matching(context, callback);
                        if !bucket.handlers.is_empty() {
                            Release::Done(removed)
                        } else if is_signal(topic) {
                            buckets.by_topic.remove(topic);
                            Release::Done(removed)
                        } else {
                            let (tx, rx) = watch::channel(());
                            bucket.state = BucketState::Settling(rx);
                            Release::Teardown(tx, bucket.info(topic), removed)
                        }
                    }
                }
            };

            match release {
                Release::Done(removed) => return Ok(removed),
                Release::Retry => {}
                Release::Wait(mut rx) => {
                    let _ = rx.changed().await;
                }
                Release::Teardown(settled, info, removed) => {
                    debug!(topic, removed, "teardown");
                    let res = self
                        .emit(SIG_TEARDOWN, vec![Value::from(topic), info])
                        .await;
                    self.lock().by_topic.remove(topic);
                    drop(settled);
                    return res.map(|_| removed);
                }
            }
        }
    }

    /// Emits `topic` through the sequence runner.
    pub async fn emit(&self, topic: &str, args: Args) -> Result<Args, Error> {
        self.emit_with(Emission::new(topic), args).await
    }

    /// Runs the registrations selected by `emission` with `args`.
    ///
    /// A topic without handlers resolves to the runner's identity result
    /// (`[]` for sequence, `args` for pipeline).
    pub async fn emit_with(&self, emission: Emission, args: Args) -> Result<Args, Error> {
        let snapshot = self.snapshot(&emission);
        debug!(
            topic = %emission.topic,
            runner = ?emission.runner,
            handlers = snapshot.len(),
            "emit"
        );
        emission.runner.run(&emission.topic, snapshot, args).await
    }

    fn snapshot(&self, emission: &Emission) -> Vec<Arc<Registration<C>>> {
        let buckets = self.lock();
        match buckets.by_topic.get(&emission.topic) {
            Some(bucket) => bucket
                .handlers
                .iter()
                .filter(|reg| emission.callback.is_none_or(|id| reg.callback().id() == id))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of handlers currently registered for `topic`.
    pub fn handler_count(&self, topic: &str) -> usize {
        self.lock()
            .by_topic
            .get(topic)
            .map_or(0, |bucket| bucket.handlers.len())
    }

    /// How many handlers have been removed from `topic`'s current bucket.
    pub fn removed_count(&self, topic: &str) -> u64 {
        self.lock()
            .by_topic
            .get(topic)
            .map_or(0, |bucket| bucket.removed)
    }

    /// Topics that currently have a bucket, in bucket creation order.
    pub fn topics(&self) -> Vec<String> {
        let buckets = self.lock();
        let mut topics: Vec<(u64, &String)> = buckets
            .by_topic
            .iter()
            .map(|(topic, bucket)| (bucket.created, topic))
            .collect();
        topics.sort_unstable_by_key(|(created, _)| *created);
        topics.into_iter().map(|(_, topic)| topic.clone()).collect()
    }

    /// Registers a handler on a signal topic without awaiting (signals never run `setup`).
    pub(crate) fn attach_signal(
        &self,
        name: &str,
        context: C,
        callback: Callback<C>,
        data: Option<Value>,
    ) -> HandlerId {
        let topic = format!("{}{name}", super::SIG_PREFIX);
        let mut buckets = self.lock();
        buckets
            .entry(&topic, BucketState::Ready)
            .push(context, callback, data)
    }
}

impl<C: Context> Default for Emitter<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::events::ContextId;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, label: &str) -> Callback<ContextId> {
        let log = Arc::clone(log);
        let label = label.to_owned();
        Callback::new(move |_ctx: ContextId, _args: Args| {
            let log = Arc::clone(&log);
            let label = label.clone();
            async move {
                log.lock().unwrap().push(label);
                Ok(Value::Null)
            }
        })
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn on_emit_passes_args() {
        let emitter = Emitter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        emitter
            .on(
                "test",
                ContextId::next(),
                Callback::new(move |_ctx, args: Args| {
                    let sink = Arc::clone(&sink);
                    async move {
                        sink.lock().unwrap().extend(args);
                        Ok(Value::Null)
                    }
                }),
                None,
            )
            .await
            .unwrap();

        emitter.emit("test", vec![json!("TEST")]).await.unwrap();
        emitter.emit("test", vec![json!("TEST2")]).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![json!("TEST"), json!("TEST2")]);
    }

    #[tokio::test]
    async fn handlers_run_once_each_in_registration_order() {
        let emitter = Emitter::new();
        let log = Log::default();
        let ctx = ContextId::next();
        for label in ["a", "b", "c"] {
            emitter.on("t", ctx, recorder(&log, label), None).await.unwrap();
        }
        let results = emitter.emit("t", vec![]).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(entries(&log), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn one_callback_runs_against_each_context() {
        let emitter = Emitter::new();
        let (ctx1, ctx2) = (ContextId::next(), ContextId::next());
        let cb: Callback<ContextId> =
            Callback::new(|ctx: ContextId, _| async move { Ok(json!(ctx.get())) });
        emitter.on("one", ctx1, cb.clone(), None).await.unwrap();
        emitter.on("one", ctx2, cb, None).await.unwrap();

        let results = emitter.emit("one", vec![]).await.unwrap();
        assert_eq!(results, vec![json!(ctx1.get()), json!(ctx2.get())]);
    }

    #[tokio::test]
    async fn emit_without_handlers_is_empty() {
        let emitter: Emitter<ContextId> = Emitter::new();
        assert_eq!(emitter.emit("nobody", vec![json!(1)]).await, Ok(vec![]));
        let piped = emitter
            .emit_with(Emission::new("nobody").with_runner(Runner::Pipeline), vec![json!(1)])
            .await;
        assert_eq!(piped, Ok(vec![json!(1)]));
    }

    #[tokio::test]
    async fn off_with_context_and_callback_removes_exact_match() {
        let emitter = Emitter::new();
        let log = Log::default();
        let ctx = ContextId::next();
        let one = recorder(&log, "one");
        let two = recorder(&log, "two");
        emitter.on("test", ctx, one, None).await.unwrap();
        emitter.on("test", ctx, two.clone(), None).await.unwrap();

        assert_eq!(emitter.off("test", Some(&ctx), Some(two.id())).await, Ok(1));
        emitter.emit("test", vec![]).await.unwrap();
        assert_eq!(entries(&log), vec!["one"]);
    }

    #[tokio::test]
    async fn off_with_context_removes_all_of_that_context() {
        let emitter = Emitter::new();
        let log = Log::default();
        let (mine, other) = (ContextId::next(), ContextId::next());
        emitter.on("test", other, recorder(&log, "one"), None).await.unwrap();
        emitter.on("test", mine, recorder(&log, "two"), None).await.unwrap();
        emitter.on("test", mine, recorder(&log, "three"), None).await.unwrap();

        assert_eq!(emitter.off("test", Some(&mine), None).await, Ok(2));
        emitter.emit("test", vec![]).await.unwrap();
        assert_eq!(entries(&log), vec!["one"]);
        assert_eq!(emitter.removed_count("test"), 2);
    }

    #[tokio::test]
    async fn off_without_filters_clears_topic() {
        let emitter = Emitter::new();
        let log = Log::default();
        let ctx = ContextId::next();
        emitter.on("test", ctx, recorder(&log, "one"), None).await.unwrap();
        emitter.on("test", ctx, recorder(&log, "two"), None).await.unwrap();

        assert_eq!(emitter.off("test", None, None).await, Ok(2));
        assert_eq!(emitter.handler_count("test"), 0);
        assert!(emitter.topics().is_empty());
        assert_eq!(emitter.emit("test", vec![]).await, Ok(vec![]));
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn rejection_fails_emission_and_skips_rest() {
        let emitter = Emitter::new();
        let ctx = ContextId::next();
        let calls = Arc::new(AtomicUsize::new(0));
        emitter
            .on(
                "test",
                ctx,
                Callback::new(|_ctx, args: Args| async move {
                    match args.first() {
                        Some(Value::Bool(true)) => Ok(Value::Null),
                        _ => Err(Error::rejected("not passing")),
                    }
                }),
                None,
            )
            .await
            .unwrap();
        let counter = Arc::clone(&calls);
        emitter
            .on(
                "test",
                ctx,
                Callback::new(move |_ctx, _args| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(Value::Null)
                    }
                }),
                None,
            )
            .await
            .unwrap();

        let err = emitter.emit("test", vec![json!(false)]).await.unwrap_err();
        assert_eq!(err, Error::rejected("not passing"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        emitter.emit("test", vec![json!(true)]).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn setup_fires_once_before_first_handler_is_visible() {
        let emitter = Arc::new(Emitter::new());
        let ctx = ContextId::next();
        let log = Log::default();

        let watcher = Arc::clone(&emitter);
        let sink = Arc::clone(&log);
        emitter
            .on(
                SIG_SETUP,
                ctx,
                Callback::new(move |_ctx, args: Args| {
                    let watcher = Arc::clone(&watcher);
                    let sink = Arc::clone(&sink);
                    async move {
                        let topic = args[0].as_str().unwrap_or_default().to_owned();
                        // Not yet visible while setup runs.
                        let visible = watcher.handler_count(&topic);
                        sink.lock().unwrap().push(format!("setup {topic} visible={visible}"));
                        assert_eq!(args[1]["handlers"], json!(0));
                        Ok(Value::Null)
                    }
                }),
                None,
            )
            .await
            .unwrap();

        for _ in 0..3 {
            emitter.on("news", ctx, recorder(&log, "h"), None).await.unwrap();
        }
        assert_eq!(entries(&log), vec!["setup news visible=0"]);
        assert_eq!(emitter.handler_count("news"), 3);
    }

    #[tokio::test]
    async fn signal_topics_never_trigger_setup() {
        let emitter = Emitter::new();
        let ctx = ContextId::next();
        let log = Log::default();
        emitter.on(SIG_SETUP, ctx, recorder(&log, "setup"), None).await.unwrap();
        emitter.on(SIG_TEARDOWN, ctx, recorder(&log, "teardown"), None).await.unwrap();

        emitter.on("sig/start", ctx, recorder(&log, "start"), None).await.unwrap();
        emitter.off("sig/start", None, None).await.unwrap();
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn teardown_fires_once_when_last_handler_leaves() {
        let emitter = Arc::new(Emitter::new());
        let ctx = ContextId::next();
        let log = Log::default();
        let watcher = Arc::clone(&emitter);
        let sink = Arc::clone(&log);
        emitter
            .on(
                SIG_TEARDOWN,
                ctx,
                Callback::new(move |_ctx, args: Args| {
                    let watcher = Arc::clone(&watcher);
                    let sink = Arc::clone(&sink);
                    async move {
                        let topic = args[0].as_str().unwrap_or_default().to_owned();
                        // Bucket still present while teardown runs.
                        let present = watcher.topics().contains(&topic);
                        sink.lock().unwrap().push(format!("teardown {topic} present={present}"));
                        Ok(Value::Null)
                    }
                }),
                None,
            )
            .await
            .unwrap();

        let first = recorder(&log, "a");
        let second = recorder(&log, "b");
        emitter.on("news", ctx, first.clone(), None).await.unwrap();
        emitter.on("news", ctx, second.clone(), None).await.unwrap();

        emitter.off("news", Some(&ctx), Some(first.id())).await.unwrap();
        assert!(entries(&log).is_empty());
        emitter.off("news", Some(&ctx), Some(second.id())).await.unwrap();
        assert_eq!(entries(&log), vec!["teardown news present=true"]);
        assert!(!emitter.topics().contains(&"news".to_owned()));
    }

    #[tokio::test]
    async fn rejected_setup_discards_subscription() {
        let emitter = Emitter::new();
        let ctx = ContextId::next();
        emitter
            .on(
                SIG_SETUP,
                ctx,
                Callback::new(|_ctx, _| async { Err(Error::rejected("no setup")) }),
                None,
            )
            .await
            .unwrap();
        let log = Log::default();
        let err = emitter.on("news", ctx, recorder(&log, "h"), None).await.unwrap_err();
        assert_eq!(err, Error::rejected("no setup"));
        assert_eq!(emitter.handler_count("news"), 0);
        assert_eq!(emitter.emit("news", vec![]).await, Ok(vec![]));
    }

    #[tokio::test]
    async fn removal_during_emission_skips_removed_handler() {
        let emitter = Arc::new(Emitter::new());
        let ctx = ContextId::next();
        let log = Log::default();
        let victim = recorder(&log, "victim");

        let remover = {
            let emitter = Arc::clone(&emitter);
            let victim_id = victim.id();
            let log = Arc::clone(&log);
            Callback::new(move |ctx: ContextId, _| {
                let emitter = Arc::clone(&emitter);
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push("remover".into());
                    emitter.off("t", Some(&ctx), Some(victim_id)).await?;
                    Ok(Value::Null)
                }
            })
        };
        emitter.on("t", ctx, remover, None).await.unwrap();
        emitter.on("t", ctx, victim, None).await.unwrap();
        emitter.on("t", ctx, recorder(&log, "last"), None).await.unwrap();

        emitter.emit("t", vec![]).await.unwrap();
        assert_eq!(entries(&log), vec!["remover", "last"]);
    }

    #[tokio::test]
    async fn handlers_added_during_emission_wait_for_next_one() {
        let emitter = Arc::new(Emitter::new());
        let ctx = ContextId::next();
        let log = Log::default();

        let adder = {
            let emitter = Arc::clone(&emitter);
            let log = Arc::clone(&log);
            Callback::new(move |ctx: ContextId, _| {
                let emitter = Arc::clone(&emitter);
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push("adder".into());
                    emitter.on("t", ctx, recorder(&log, "late"), None).await?;
                    Ok(Value::Null)
                }
            })
        };
        emitter.on("t", ctx, adder, None).await.unwrap();

        emitter.emit("t", vec![]).await.unwrap();
        assert_eq!(entries(&log), vec!["adder"]);
        assert_eq!(emitter.handler_count("t"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_subscribe_waits_for_pending_setup() {
        let emitter = Arc::new(Emitter::new());
        let ctx = ContextId::next();
        let log = Log::default();
        let sink = Arc::clone(&log);
        emitter
            .on(
                SIG_SETUP,
                ctx,
                Callback::new(move |_ctx, _| {
                    let sink = Arc::clone(&sink);
                    async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        sink.lock().unwrap().push("setup".into());
                        Ok(Value::Null)
                    }
                }),
                None,
            )
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            emitter.on("news", ctx, recorder(&log, "a"), None),
            emitter.on("news", ctx, recorder(&log, "b"), None),
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(entries(&log), vec!["setup"]);
        assert_eq!(emitter.handler_count("news"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_subscribe_does_not_wedge_topic() {
        let emitter = Emitter::new();
        let ctx = ContextId::next();
        let setups = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&setups);
        emitter
            .on(
                SIG_SETUP,
                ctx,
                Callback::new(move |_ctx, _| {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            tokio::time::sleep(Duration::from_secs(60)).await;
                        }
                        Ok(Value::Null)
                    }
                }),
                None,
            )
            .await
            .unwrap();

        let log = Log::default();
        let slow = emitter.on("news", ctx, recorder(&log, "a"), None);
        assert!(tokio::time::timeout(Duration::from_millis(10), slow).await.is_err());

        emitter.on("news", ctx, recorder(&log, "b"), None).await.unwrap();
        assert_eq!(setups.load(Ordering::SeqCst), 2);
        assert_eq!(emitter.handler_count("news"), 1);
    }

    #[tokio::test]
    async fn rejected_setup_is_followed_by_teardown() {
        let emitter = Emitter::new();
        let ctx = ContextId::next();
        let log = Log::default();
        emitter.on(SIG_SETUP, ctx, recorder(&log, "setup"), None).await.unwrap();
        emitter
            .on(
                SIG_SETUP,
                ctx,
                Callback::new(|_ctx, _| async { Err(Error::rejected("no setup")) }),
                None,
            )
            .await
            .unwrap();
        emitter.on(SIG_TEARDOWN, ctx, recorder(&log, "teardown"), None).await.unwrap();

        let err = emitter.on("news", ctx, recorder(&log, "h"), None).await.unwrap_err();
        assert_eq!(err, Error::rejected("no setup"));
        assert_eq!(entries(&log), vec!["setup", "teardown"]);
        assert!(!emitter.topics().contains(&"news".to_owned()));
    }

    #[tokio::test]
    async fn rejected_teardown_still_discards_bucket() {
        let emitter = Emitter::new();
        let ctx = ContextId::next();
        emitter
            .on(
                SIG_TEARDOWN,
                ctx,
                Callback::new(|_ctx, _| async { Err(Error::rejected("busy")) }),
                None,
            )
            .await
            .unwrap();
        let log = Log::default();
        emitter.on("news", ctx, recorder(&log, "h"), None).await.unwrap();

        let err = emitter.off("news", Some(&ctx), None).await.unwrap_err();
        assert_eq!(err, Error::rejected("busy"));
        assert_eq!(emitter.handler_count("news"), 0);
        assert!(!emitter.topics().contains(&"news".to_owned()));
        assert_eq!(emitter.emit("news", vec![]).await, Ok(vec![]));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_unsubscribe_does_not_wedge_topic() {
        let emitter = Emitter::new();
        let ctx = ContextId::next();
        let teardowns = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&teardowns);
        emitter
            .on(
                SIG_TEARDOWN,
                ctx,
                Callback::new(move |_ctx, _| {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            tokio::time::sleep(Duration::from_secs(60)).await;
                        }
                        Ok(Value::Null)
                    }
                }),
                None,
            )
            .await
            .unwrap();

        let log = Log::default();
        emitter.on("news", ctx, recorder(&log, "a"), None).await.unwrap();
        let slow = emitter.off("news", Some(&ctx), None);
        assert!(tokio::time::timeout(Duration::from_millis(10), slow).await.is_err());

        emitter.on("news", ctx, recorder(&log, "b"), None).await.unwrap();
        assert_eq!(emitter.handler_count("news"), 1);
        assert_eq!(emitter.emit("news", vec![]).await, Ok(vec![Value::Null]));
        assert_eq!(entries(&log), vec!["b"]);

        assert_eq!(emitter.off("news", Some(&ctx), None).await, Ok(1));
        assert_eq!(teardowns.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn topics_follow_creation_order() {
        let emitter = Emitter::new();
        let log = Log::default();
        let ctx = ContextId::next();
        for topic in ["b", "a", "c"] {
            emitter.on(topic, ctx, recorder(&log, topic), None).await.unwrap();
        }
        assert_eq!(emitter.topics(), vec!["b", "a", "c"]);
    }
}
