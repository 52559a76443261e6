//! # Component runtime settings.
//!
//! [`Config`] holds the settings a [`ComponentBuilder`](crate::ComponentBuilder)
//! bakes into every component it builds. It is distinct from the per-instance
//! JSON configuration managed by `Component::configure`.

use std::borrow::Cow;

/// Settings applied to a component at build time.
///
/// ## Field semantics
/// - `display_name`: Name used in logs and in the component's `Display` (`<name>@<id>`)
/// - `progress_capacity`: Buffer of each task's progress channel (min 1; clamped)
///
/// ## Notes
/// All fields are public. Prefer the clamping accessors over reading raw values.
#[derive(Clone, Debug)]
pub struct Config {
    /// Name shown in logs and `Display`.
    pub display_name: Cow<'static, str>,

    /// Capacity of the progress broadcast channel of tasks created by the component.
    ///
    /// Receivers that lag behind by more than this many notifications skip the oldest.
    pub progress_capacity: usize,
}

impl Config {
    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Returns the progress capacity clamped to a minimum of 1.
    #[inline]
    pub fn progress_capacity_clamped(&self) -> usize {
        self.progress_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `display_name = "core/component"`
    /// - `progress_capacity = 16`
    fn default() -> Self {
        Self {
            display_name: Cow::Borrowed("core/component"),
            progress_capacity: 16,
        }
    }
}
