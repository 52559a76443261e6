use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::task::Task;
use crate::error::Error;
use crate::events::HandlerResult;

/// Settling side of a [`Task`].
///
/// Handed to the resolver function passed to `Component::task`. It may be moved
/// into spawned work and settled later. Dropping it unsettled rejects the task
/// with [`Error::Canceled`], so a task never stays pending forever.
///
/// # Example
/// ```
/// use serde_json::json;
/// use sigvisor::{Component, Error};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Error> {
/// let component = Component::builder().build();
/// let task = component
///     .task(
///         |resolver| {
///             tokio::spawn(async move {
///                 resolver.notify(json!("halfway"));
///                 resolver.resolve(json!("loaded"));
///             });
///         },
///         Some("load"),
///     )
///     .await?;
///
/// assert_eq!(task.wait().await?, json!("loaded"));
/// assert!(task.is_finished());
/// # Ok(())
/// # }
/// ```
pub struct TaskResolver {
    task: Task,
}

impl TaskResolver {
    pub(super) fn new(task: Task) -> Self {
        Self { task }
    }

    /// Fulfills the task with `value`.
    pub fn resolve(self, value: Value) {
        self.task.settle(Ok(value));
    }

    /// Rejects the task with [`Error::Rejected`].
    pub fn reject(self, reason: impl Into<String>) {
        self.task.settle(Err(Error::rejected(reason)));
    }

    /// Settles the task with an arbitrary outcome.
    pub fn settle(self, result: HandlerResult) {
        self.task.settle(result);
    }

    /// Sends a progress notification; returns how many receivers got it.
    pub fn notify(&self, progress: Value) -> usize {
        self.task.notify(progress)
    }

    /// Token cancelled when the task is cancelled.
    pub fn token(&self) -> CancellationToken {
        self.task.token().clone()
    }

    /// True once the task has settled (by this resolver or by `Task::cancel`).
    pub fn is_settled(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TaskResolver {
    fn drop(&mut self) {
        self.task.settle(Err(Error::Canceled));
    }
}
