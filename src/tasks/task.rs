use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use super::resolver::TaskResolver;
use crate::error::Error;
use crate::events::{ContextId, HandlerResult};

struct TaskInner {
    context: ContextId,
    name: Option<String>,
    started: SystemTime,
    finished: OnceLock<SystemTime>,
    outcome: watch::Sender<Option<HandlerResult>>,
    progress: broadcast::Sender<Value>,
    token: CancellationToken,
}

/// Handle to a tracked asynchronous operation.
///
/// Clones share the same record. The outcome is settled once and can be awaited
/// by any number of holders.
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

/// Serializable snapshot of a task's metadata (timestamps in epoch milliseconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskInfo {
    /// Instance id of the component that created the task.
    pub context: ContextId,
    /// Optional task name.
    pub name: Option<String>,
    /// Creation time.
    pub started: u64,
    /// Settlement time, `None` while pending.
    pub finished: Option<u64>,
}

impl TaskInfo {
    /// JSON form, as carried by the `task` signal.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl Task {
    /// Creates a pending task and its resolver.
    pub(crate) fn new(context: ContextId, name: Option<String>, capacity: usize) -> (Task, TaskResolver) {
        let (outcome, _) = watch::channel(None);
        let (progress, _) = broadcast::channel(capacity.max(1));
        let task = Task {
            inner: Arc::new(TaskInner {
                context,
                name,
                started: SystemTime::now(),
                finished: OnceLock::new(),
                outcome,
                progress,
                token: CancellationToken::new(),
            }),
        };
        let resolver = TaskResolver::new(task.clone());
        (task, resolver)
    }

    /// Instance id of the creating component.
    pub fn context(&self) -> ContextId {
        self.inner.context
    }

    /// Task name, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Creation time.
    pub fn started(&self) -> SystemTime {
        self.inner.started
    }

    /// Settlement time, `None` while pending.
    pub fn finished(&self) -> Option<SystemTime> {
        self.inner.finished.get().copied()
    }

    /// True once the outcome is settled.
    pub fn is_finished(&self) -> bool {
        self.inner.finished.get().is_some()
    }

    /// Current metadata snapshot.
    pub fn info(&self) -> TaskInfo {
        TaskInfo {
            context: self.inner.context,
            name: self.inner.name.clone(),
            started: epoch_millis(self.inner.started),
            finished: self.finished().map(epoch_millis),
        }
    }

    /// Waits for the outcome.
    pub async fn wait(&self) -> HandlerResult {
        let mut rx = self.inner.outcome.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(Err(Error::Canceled)),
            Err(_) => Err(Error::Canceled),
        }
    }

    /// Receiver of progress notifications sent after this call.
    pub fn progress(&self) -> broadcast::Receiver<Value> {
        self.inner.progress.subscribe()
    }

    /// Rejects the task with [`Error::Canceled`] and cancels the resolver's token.
    ///
    /// Returns `false` if the task had already settled.
    pub fn cancel(&self) -> bool {
        self.inner.token.cancel();
        self.settle(Err(Error::Canceled))
    }

    /// Stamps `finished` and publishes the outcome; only the first call wins.
    pub(super) fn settle(&self, result: HandlerResult) -> bool {
        if self.inner.finished.set(SystemTime::now()).is_err() {
            return false;
        }
        self.inner.outcome.send_replace(Some(result));
        true
    }

    pub(super) fn notify(&self, progress: Value) -> usize {
        self.inner.progress.send(progress).unwrap_or(0)
    }

    pub(super) fn token(&self) -> &CancellationToken {
        &self.inner.token
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("context", &self.inner.context)
            .field("name", &self.inner.name)
            .field("finished", &self.is_finished())
            .finish()
    }
}

fn epoch_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn info_tracks_settlement() {
        let (task, resolver) = Task::new(ContextId::next(), Some("load".into()), 4);
        let info = task.info();
        assert_eq!(info.name.as_deref(), Some("load"));
        assert!(info.started > 0);
        assert_eq!(info.finished, None);
        assert_eq!(info.to_value()["finished"], Value::Null);

        resolver.resolve(json!("done"));
        assert_eq!(task.wait().await, Ok(json!("done")));
        let finished = task.info().finished.expect("finished is stamped");
        assert!(finished >= info.started);
    }

    #[tokio::test]
    async fn finished_is_stamped_once() {
        let (task, resolver) = Task::new(ContextId::next(), None, 4);
        assert!(task.settle(Err(Error::rejected("first"))));
        let stamped = task.finished();

        assert!(!task.cancel());
        resolver.resolve(json!(1));
        assert_eq!(task.finished(), stamped);
        assert_eq!(task.wait().await, Err(Error::rejected("first")));
    }

    #[tokio::test]
    async fn many_waiters_share_outcome() {
        let (task, resolver) = Task::new(ContextId::next(), None, 4);
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let task = task.clone();
                tokio::spawn(async move { task.wait().await })
            })
            .collect();

        resolver.resolve(json!(7));
        for w in waiters {
            assert_eq!(w.await.unwrap(), Ok(json!(7)));
        }
    }

    #[tokio::test]
    async fn cancel_rejects_and_cancels_token() {
        let (task, resolver) = Task::new(ContextId::next(), None, 4);
        let token = resolver.token();
        assert!(task.cancel());
        assert!(token.is_cancelled());
        assert!(resolver.is_settled());
        assert_eq!(task.wait().await, Err(Error::Canceled));
    }

    #[tokio::test]
    async fn progress_reaches_subscribers() {
        let (task, resolver) = Task::new(ContextId::next(), None, 4);
        let mut rx = task.progress();
        assert_eq!(resolver.notify(json!(50)), 1);
        assert_eq!(rx.recv().await.unwrap(), json!(50));
    }
}
