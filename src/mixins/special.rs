use std::fmt;

use serde_json::Value;

use crate::core::Component;
use crate::error::Error;
use crate::events::{Callback, SIG_PREFIX};

/// Data value enabling memory replay on `hub/` specials.
pub const MEMORY: &str = "memory";

/// What a declarative key wires a callback to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialKind {
    /// `sig/<name>`: a lifecycle or custom signal.
    Signal(String),
    /// `hub/<topic>`: a hub subscription.
    Hub(String),
    /// `on/<topic>`: a local event.
    On(String),
}

impl SpecialKind {
    fn parse(key: &str) -> Option<Self> {
        let (prefix, name) = key.split_once('/')?;
        if name.is_empty() {
            return None;
        }
        match prefix {
            "sig" => Some(SpecialKind::Signal(name.to_owned())),
            "hub" => Some(SpecialKind::Hub(name.to_owned())),
            "on" => Some(SpecialKind::On(name.to_owned())),
            _ => None,
        }
    }

    /// The name after the prefix.
    pub fn name(&self) -> &str {
        match self {
            SpecialKind::Signal(name) | SpecialKind::Hub(name) | SpecialKind::On(name) => name,
        }
    }
}

/// A callback declared under a `sig/`, `hub/` or `on/` key.
///
/// # Example
/// ```
/// use serde_json::Value;
/// use sigvisor::{Callback, Component, Special, SpecialKind};
///
/// let cb = Callback::new(|_c: Component, _args| async { Ok(Value::Null) });
/// let special = Special::parse("hub/price", cb.clone())?.with_memory();
/// assert_eq!(special.kind(), &SpecialKind::Hub("price".into()));
/// assert!(special.has_memory());
///
/// assert!(Special::parse("price", cb).is_err());
/// # Ok::<(), sigvisor::Error>(())
/// ```
#[derive(Clone)]
pub struct Special {
    key: String,
    kind: SpecialKind,
    callback: Callback<Component>,
    data: Option<Value>,
}

impl Special {
    /// Parses a declarative key.
    ///
    /// Fails with [`Error::InvalidSpecial`] unless `key` is `sig/`, `hub/` or `on/`
    /// followed by a non-empty name.
    pub fn parse(key: impl Into<String>, callback: Callback<Component>) -> Result<Self, Error> {
        let key = key.into();
        let Some(kind) = SpecialKind::parse(&key) else {
            return Err(Error::InvalidSpecial { key });
        };
        Ok(Self {
            key,
            kind,
            callback,
            data: None,
        })
    }

    /// `sig/<name>` special.
    pub fn signal(name: impl Into<String>, callback: Callback<Component>) -> Self {
        let name = name.into();
        Self {
            key: format!("{SIG_PREFIX}{name}"),
            kind: SpecialKind::Signal(name),
            callback,
            data: None,
        }
    }

    /// `hub/<topic>` special.
    pub fn hub(topic: impl Into<String>, callback: Callback<Component>) -> Self {
        let topic = topic.into();
        Self {
            key: format!("hub/{topic}"),
            kind: SpecialKind::Hub(topic),
            callback,
            data: None,
        }
    }

    /// `on/<topic>` special.
    pub fn on(topic: impl Into<String>, callback: Callback<Component>) -> Self {
        let topic = topic.into();
        Self {
            key: format!("on/{topic}"),
            kind: SpecialKind::On(topic),
            callback,
            data: None,
        }
    }

    /// Attaches registration data.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Marks a hub special for memory replay on start.
    pub fn with_memory(self) -> Self {
        self.with_data(Value::from(MEMORY))
    }

    /// True if the data is `"memory"`.
    pub fn has_memory(&self) -> bool {
        self.data.as_ref().and_then(Value::as_str) == Some(MEMORY)
    }

    /// Declarative key, e.g. `hub/price`.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Parsed key.
    pub fn kind(&self) -> &SpecialKind {
        &self.kind
    }

    /// Declared callback.
    pub fn callback(&self) -> &Callback<Component> {
        &self.callback
    }

    /// Registration data.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

impl fmt::Debug for Special {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Special")
            .field("key", &self.key)
            .field("callback", &self.callback)
            .field("data", &self.data)
            .finish()
    }
}
