use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::Serialize;

/// Global instance counter for context identities.
static CONTEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Target a callback is invoked against.
///
/// Registrations keep their context and hand a clone of it to the callback on
/// every invocation. Equality is what `off`/`unsubscribe` match on.
pub trait Context: Clone + PartialEq + Send + Sync + 'static {}

impl<T> Context for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// Process-wide unique identity of a subscriber (components use it as their instance count).
///
/// ```
/// use sigvisor::ContextId;
///
/// let a = ContextId::next();
/// let b = ContextId::next();
/// assert!(b > a);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates the next identity (starts at 1).
    pub fn next() -> Self {
        Self(CONTEXT_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw counter value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
