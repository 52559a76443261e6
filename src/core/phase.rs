use std::fmt;

use serde::Serialize;

/// Lifecycle phase of a [`Component`](crate::Component).
///
/// ```text
/// Uninitialized ─► Initialize ─► Start ─► Started ─► Stop ─► Finalize ─► Finalized
///                      ▲                                                   │
///                      └───────────────────── start() ─────────────────────┘
/// ```
///
/// `Initialize`, `Start`, `Stop` and `Finalize` are transient: the component sits
/// in them while the matching signal is being emitted, and stays there if that
/// signal rejects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Never started.
    #[default]
    Uninitialized,
    /// `sig/initialize` in flight.
    Initialize,
    /// `sig/start` in flight.
    Start,
    /// Running.
    Started,
    /// `sig/stop` in flight.
    Stop,
    /// `sig/finalize` in flight.
    Finalize,
    /// Stopped; may be started again.
    Finalized,
}

impl Phase {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Initialize => "initialize",
            Phase::Start => "start",
            Phase::Started => "started",
            Phase::Stop => "stop",
            Phase::Finalize => "finalize",
            Phase::Finalized => "finalized",
        }
    }

    /// True when `start()` may be called from this phase.
    #[inline]
    pub fn can_start(self) -> bool {
        matches!(self, Phase::Uninitialized | Phase::Finalized)
    }

    /// True when `stop()` may be called from this phase.
    #[inline]
    pub fn can_stop(self) -> bool {
        self == Phase::Started
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_idle_phases_can_start() {
        assert!(Phase::Uninitialized.can_start());
        assert!(Phase::Finalized.can_start());
        assert!(!Phase::Started.can_start());
        assert!(!Phase::Initialize.can_start());
        assert!(Phase::Started.can_stop());
        assert!(!Phase::Finalized.can_stop());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_value(Phase::Finalized).unwrap(), "finalized");
        assert_eq!(Phase::Uninitialized.to_string(), "uninitialized");
    }
}
