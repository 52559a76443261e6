use super::special::Special;

/// Bundle of declarative handlers applied to a component at build time.
///
/// Specials of one mixin keep their declared order; mixins are applied in the
/// order they were given to the builder.
pub trait Mixin: Send + Sync + 'static {
    /// Returns the mixin name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose; override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the handlers this mixin declares.
    ///
    /// Called once per component built.
    fn specials(&self) -> Vec<Special>;
}
