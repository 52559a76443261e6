//! Runner strategies combining the handlers of one emission.
//!
//! A runner receives the emission's argument list and the membership snapshot
//! taken when the emission started, and walks it in registration order,
//! awaiting each handler before invoking the next.
//!
//! ## Contents
//! - [`Runner::Sequence`] collect every handler's result into an ordered list
//! - [`Runner::Pipeline`] thread each handler's result into the next one's arguments
//!
//! ## Rules
//! - Registrations deactivated after the snapshot was taken are skipped.
//! - The first rejection aborts the walk; remaining handlers are not invoked.
//! - A panicking handler is reported as [`Error::Panicked`](crate::Error::Panicked).

mod invoke;
mod pipeline;
mod sequence;

use std::sync::Arc;

use crate::error::Error;
use crate::events::{Args, Context, Registration};

/// How the handlers of one emission are run and their results combined.
///
/// # Example
/// ```
/// use sigvisor::Runner;
///
/// assert_eq!(Runner::default(), Runner::Sequence);
/// assert_eq!(Runner::Pipeline.as_str(), "pipeline");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Runner {
    /// One after another; resolves to the ordered list of results (default).
    #[default]
    Sequence,
    /// One after another; each result becomes the next handler's arguments.
    ///
    /// - `Null` leaves the arguments unchanged
    /// - an array becomes the whole argument list
    /// - any other value becomes the single argument
    ///
    /// Resolves to the final argument list.
    Pipeline,
}

impl Runner {
    /// Runs `handlers` for `topic` with `args`.
    pub async fn run<C: Context>(
        self,
        topic: &str,
        handlers: Vec<Arc<Registration<C>>>,
        args: Args,
    ) -> Result<Args, Error> {
        match self {
            Runner::Sequence => sequence::run(topic, handlers, args).await,
            Runner::Pipeline => pipeline::run(topic, handlers, args).await,
        }
    }

    /// Lowercase name, used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Runner::Sequence => "sequence",
            Runner::Pipeline => "pipeline",
        }
    }
}
