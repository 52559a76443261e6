//! Process-wide publish/subscribe registry with per-topic memory.
//!
//! [`Hub`] bridges independent components: any of them may `publish` a topic,
//! every subscriber of that topic receives it through the pipeline runner, and
//! the last published arguments are remembered for late subscribers.
//!
//! ## Architecture
//! ```text
//! Component A ── publish("price", args) ──► Hub ── memory["price"] = args
//!                                            │
//!                                            └─ emit(Pipeline) ──► proxy(Component B) ──► B.emit("hub/price")
//!                                                               ──► proxy(Component C) ──► C.emit("hub/price")
//! ```
//!
//! ## Rules
//! - `publish` stores memory before any subscriber runs.
//! - `peek` never blocks and never mutates state.
//! - Memory persists for the hub's lifetime, independent of subscriptions.

mod registry;

pub use registry::Hub;
