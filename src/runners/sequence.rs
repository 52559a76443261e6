use std::sync::Arc;

use crate::error::Error;
use crate::events::{Args, Context, Registration};

use super::invoke::invoke;

/// Awaits each live handler in order and collects their results.
pub(super) async fn run<C: Context>(
    topic: &str,
    handlers: Vec<Arc<Registration<C>>>,
    args: Args,
) -> Result<Args, Error> {
    let mut results = Vec::with_capacity(handlers.len());
    for reg in handlers {
        if !reg.is_active() {
            continue;
        }
        results.push(invoke(topic, &reg, args.clone()).await?);
    }
    Ok(results)
}
