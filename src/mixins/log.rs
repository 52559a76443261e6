//! # LogWriter: lifecycle signal logger
//!
//! A mixin that logs every lifecycle signal of its component at `info`.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! INFO sigvisor::mixins::log: signal component=core/component@3 signal="initialize" args=0
//! INFO sigvisor::mixins::log: signal component=core/component@3 signal="setup" args=2
//! INFO sigvisor::mixins::log: signal component=core/component@3 signal="start" args=0
//! ```

use serde_json::Value;
use tracing::info;

use super::mixin::Mixin;
use super::special::Special;
use crate::core::Component;
use crate::events::{Args, Callback};

const SIGNALS: [&str; 7] = [
    "initialize",
    "start",
    "stop",
    "finalize",
    "setup",
    "teardown",
    "task",
];

/// Signal logger mixin.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Mixin for LogWriter {
    fn name(&self) -> &'static str {
        "log"
    }

    fn specials(&self) -> Vec<Special> {
        SIGNALS
            .iter()
            .map(|&signal| {
                Special::signal(
                    signal,
                    Callback::new(move |component: Component, args: Args| async move {
                        info!(component = %component, signal, args = args.len(), "signal");
                        Ok(Value::Null)
                    }),
                )
            })
            .collect()
    }
}
