//! # Tracked asynchronous operations.
//!
//! A component's `task` call wraps an operation in a [`Task`] record and hands the
//! settling side, a [`TaskResolver`], to the caller's resolver function.
//!
//! - [`Task`] shared handle: timing metadata, outcome, progress, cancellation
//! - [`TaskResolver`] settles the task exactly once (`resolve`/`reject`), reports progress
//! - [`TaskInfo`] serializable snapshot announced through the `task` signal
//!
//! ## Lifecycle
//! ```text
//! Task::new ──► started = now, finished = None
//!   │
//!   ├─ resolver.resolve(v) / reject(e) / drop ─┐
//!   └─ task.cancel() ──────────────────────────┴─► finished = now (once) ──► outcome visible to wait()
//! ```

mod resolver;
mod task;

pub use resolver::TaskResolver;
pub use task::{Task, TaskInfo};
