//! # Declarative handlers and the mixins that bundle them.
//!
//! A [`Mixin`] contributes an ordered list of [`Special`]s: callbacks keyed by a
//! declarative name. When a component is built, the registration table is the
//! concatenation of the built-in core mixin, each user mixin in order, then the
//! builder's ad-hoc specials.
//!
//! ## Keys
//! ```text
//! "sig/<name>"   registered on the component at build time
//! "on/<topic>"   registered on the component during sig/initialize
//! "hub/<topic>"  subscribed on the hub during sig/initialize (data "memory" replays on start)
//! ```
//!
//! ## Implementing a mixin
//! ```rust
//! use serde_json::Value;
//! use sigvisor::{Callback, Component, Mixin, Special};
//!
//! struct Greeter;
//!
//! impl Mixin for Greeter {
//!     fn name(&self) -> &'static str { "greeter" }
//!
//!     fn specials(&self) -> Vec<Special> {
//!         vec![Special::signal(
//!             "start",
//!             Callback::new(|c: Component, _args| async move {
//!                 Ok(Value::from(format!("hello from {c}")))
//!             }),
//!         )]
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod mixin;
mod special;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use mixin::Mixin;
pub use special::{Special, SpecialKind};
