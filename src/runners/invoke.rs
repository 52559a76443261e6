use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use tracing::{trace, warn};

use crate::error::Error;
use crate::events::{Args, Context, HandlerResult, Registration};

/// Invokes one registration against its own context.
///
/// Panics raised while building or polling the handler future are caught and
/// returned as [`Error::Panicked`].
pub(super) async fn invoke<C: Context>(topic: &str, reg: &Registration<C>, args: Args) -> HandlerResult {
    trace!(topic, handler = %reg.id(), "invoke");

    let call = panic::catch_unwind(AssertUnwindSafe(|| {
        reg.callback().call(reg.context().clone(), args)
    }));
    let fut = match call {
        Ok(fut) => fut,
        Err(payload) => return Err(panicked(topic, payload)),
    };

    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => Err(panicked(topic, payload)),
    }
}

fn panicked(topic: &str, payload: Box<dyn Any + Send>) -> Error {
    let info = panic_message(payload.as_ref());
    warn!(topic, info = %info, "handler panicked");
    Error::Panicked {
        topic: topic.to_owned(),
        info,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
