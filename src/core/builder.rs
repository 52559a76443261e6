use std::sync::Arc;

use tracing::debug;

use super::builtin::Core;
use super::component::Component;
use super::config::Config;
use crate::hub::Hub;
use crate::mixins::{Mixin, Special};

type Initializer = Box<dyn FnOnce(&Component) + Send>;

/// Builder for constructing a [`Component`] from mixins and declarative handlers.
pub struct ComponentBuilder {
    cfg: Config,
    hub: Option<Hub>,
    mixins: Vec<Arc<dyn Mixin>>,
    specials: Vec<Special>,
    initializer: Option<Initializer>,
}

impl ComponentBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            hub: None,
            mixins: Vec::new(),
            specials: Vec::new(),
            initializer: None,
        }
    }

    /// Replaces the build settings.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Uses `hub` instead of the process-wide one.
    pub fn with_hub(mut self, hub: Hub) -> Self {
        self.hub = Some(hub);
        self
    }

    /// Appends a mixin; its specials follow those of earlier mixins.
    pub fn with_mixin<M: Mixin>(mut self, mixin: M) -> Self {
        self.mixins.push(Arc::new(mixin));
        self
    }

    /// Appends shared mixins in order.
    pub fn with_mixins(mut self, mixins: Vec<Arc<dyn Mixin>>) -> Self {
        self.mixins.extend(mixins);
        self
    }

    /// Appends one ad-hoc declarative handler (after every mixin's).
    pub fn with_special(mut self, special: Special) -> Self {
        self.specials.push(special);
        self
    }

    /// Appends ad-hoc declarative handlers in order.
    pub fn with_specials(mut self, specials: impl IntoIterator<Item = Special>) -> Self {
        self.specials.extend(specials);
        self
    }

    /// Sets a closure run once at the end of [`build`](Self::build).
    pub fn with_initializer<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Component) + Send + 'static,
    {
        self.initializer = Some(Box::new(f));
        self
    }

    /// Builds the component.
    ///
    /// The registration table is the core mixin's specials, then each mixin's in
    /// order, then the ad-hoc ones; `sig/` entries are registered immediately.
    pub fn build(self) -> Component {
        let mut table = Core.specials();
        for mixin in &self.mixins {
            let specials = mixin.specials();
            debug!(mixin = mixin.name(), specials = specials.len(), "apply mixin");
            table.extend(specials);
        }
        table.extend(self.specials);

        let hub = self.hub.unwrap_or_else(Hub::global);
        let component = Component::from_parts(self.cfg, hub, table);
        component.attach_specials();

        if let Some(init) = self.initializer {
            init(&component);
        }
        debug!(component = %component, "built");
        component
    }
}

impl Default for ComponentBuilder {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
