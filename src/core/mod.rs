//! Component core: lifecycle, configuration and construction.
//!
//! The public API from this module is [`Component`], built by [`ComponentBuilder`]
//! with a [`Config`] and moving through [`Phase`]s.
//!
//! Internal modules:
//! - [`component`]: the lifecycle state machine and the hub bridge;
//! - [`builder`]: assembles the registration table from mixins;
//! - [`builtin`]: the core mixin every component starts with;
//! - [`configuration`]: deep merge of instance configuration;
//! - [`phase`]: lifecycle phases.

mod builder;
mod builtin;
mod component;
mod config;
mod configuration;
mod phase;

pub use builder::ComponentBuilder;
pub use component::Component;
pub use config::Config;
pub use phase::Phase;
