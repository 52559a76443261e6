//! # sigvisor
//!
//! **Sigvisor** is a small event-driven lifecycle kernel for async Rust.
//!
//! It provides an ordered asynchronous event emitter, components whose
//! lifecycle is driven by signals emitted through it, and an in-process
//! publish/subscribe hub that remembers the last payload of every topic.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │    Mixin     │   │    Mixin     │   │   Special    │
//!     │  (specials)  │   │  (specials)  │   │   (ad-hoc)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ComponentBuilder: core specials ++ mixins ++ ad-hoc specials     │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Component                                                        │
//! │  - Phase (lifecycle state machine)                                │
//! │  - Emitter (ordered handlers per topic, sig/* signals)            │
//! │  - configuration (deep-merged JSON object)                        │
//! │  - hub proxies (one per hub/<topic> with local handlers)          │
//! └──────┬──────────────────────────────────────────────────┬─────────┘
//!        │ start()/stop()                                   │ publish / subscribe
//!        ▼                                                  ▼
//!  sig/initialize ─► sig/start              ┌──────────────────────────────┐
//!  sig/stop ─► sig/finalize                 │  Hub (process-wide)          │
//!  (Runner::Sequence)                       │  - memory per topic          │
//!                                           │  - Emitter (Runner::Pipeline)│
//!                                           └──────────────────────────────┘
//! ```
//!
//! ### Emission
//! ```text
//! emit(topic, args)
//!   ├─► snapshot registrations of topic (registration order)
//!   └─► Runner
//!         ├─ Sequence: await h1(args), h2(args), ... ─► [r1, r2, ...]
//!         └─ Pipeline: await h1(args) ─► h2(r1) ─► ... ─► final args
//!   first rejection (or panic) aborts the rest and fails the emission
//! ```
//!
//! ## Features
//! | Area              | Description                                                         | Key types / traits                     |
//! |-------------------|---------------------------------------------------------------------|----------------------------------------|
//! | **Emitter**       | Ordered async handlers per topic with setup/teardown meta-signals.  | [`Emitter`], [`Emission`], [`Callback`]|
//! | **Runners**       | Combine handler results in sequence or as a pipeline.               | [`Runner`]                             |
//! | **Components**    | Signal-driven lifecycle, configuration and tasks.                   | [`Component`], [`Phase`]               |
//! | **Mixins**        | Declarative `sig/`, `hub/` and `on/` handlers.                      | [`Mixin`], [`Special`]                 |
//! | **Hub**           | Process-wide pub/sub with per-topic memory.                         | [`Hub`]                                |
//! | **Tasks**         | Tracked async operations announced through `sig/task`.              | [`Task`], [`TaskResolver`]             |
//! | **Errors**        | One typed error for the kernel and handlers.                        | [`Error`]                              |
//! | **Configuration** | Component build settings.                                           | [`Config`]                             |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] mixin _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use serde_json::{Value, json};
//! use sigvisor::{Callback, Component, Hub, Special};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), sigvisor::Error> {
//!     let hub = Hub::new();
//!     hub.publish("price", vec![json!(41)]).await?;
//!
//!     // Replays the remembered price on start, then follows publications.
//!     let ticker = Component::builder()
//!         .with_hub(hub.clone())
//!         .with_special(
//!             Special::hub(
//!                 "price",
//!                 Callback::new(|c: Component, args: Vec<Value>| async move {
//!                     c.configure([json!({ "last": args })])?;
//!                     Ok(Value::Null)
//!                 }),
//!             )
//!             .with_memory(),
//!         )
//!         .build();
//!
//!     ticker.start(vec![]).await?;
//!     assert_eq!(ticker.configuration()["last"], json!([41]));
//!
//!     hub.publish("price", vec![json!(42)]).await?;
//!     assert_eq!(ticker.configuration()["last"], json!([41, 42]));
//!
//!     ticker.stop(vec![]).await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod hub;
mod mixins;
mod runners;
mod tasks;

// ---- Public re-exports ----

pub use crate::core::{Component, ComponentBuilder, Config, Phase};
pub use error::Error;
pub use events::{
    Args, Callback, CallbackId, Context, ContextId, Emission, Emitter, HandlerFuture, HandlerId,
    HandlerResult, Registration, SIG_PREFIX, SIG_SETUP, SIG_TEARDOWN, is_signal,
};
pub use hub::Hub;
pub use mixins::{Mixin, Special, SpecialKind};
pub use runners::Runner;
pub use tasks::{Task, TaskInfo, TaskResolver};

// Optional: expose a simple built-in logger mixin (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use mixins::LogWriter;
