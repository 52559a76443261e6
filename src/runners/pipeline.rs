use std::sync::Arc;

use serde_json::Value;

use crate::error::Error;
use crate::events::{Args, Context, Registration};

use super::invoke::invoke;

/// Awaits each live handler in order, threading results into the next call.
pub(super) async fn run<C: Context>(
    topic: &str,
    handlers: Vec<Arc<Registration<C>>>,
    mut args: Args,
) -> Result<Args, Error> {
    for reg in handlers {
        if !reg.is_active() {
            continue;
        }
        match invoke(topic, &reg, args.clone()).await? {
            Value::Null => {}
            Value::Array(next) => args = next,
            other => args = vec![other],
        }
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::events::{Callback, ContextId, Emission, Emitter};
    use crate::{Error, Runner};

    fn add_one() -> Callback<ContextId> {
        Callback::new(|_, args: Vec<Value>| async move {
            let n = args.first().and_then(Value::as_i64).unwrap_or_default();
            Ok(json!(n + 1))
        })
    }

    fn piped(topic: &str) -> Emission {
        Emission::new(topic).with_runner(Runner::Pipeline)
    }

    #[tokio::test]
    async fn chain_transforms_payload() {
        let emitter = Emitter::new();
        let ctx = ContextId::next();
        for _ in 0..3 {
            emitter.on("count", ctx, add_one(), None).await.unwrap();
        }
        let out = emitter.emit_with(piped("count"), vec![json!(0)]).await.unwrap();
        assert_eq!(out, vec![json!(3)]);
    }

    #[tokio::test]
    async fn null_results_pass_args_through() {
        let emitter = Emitter::new();
        let ctx = ContextId::next();
        emitter
            .on("t", ctx, Callback::new(|_, _| async { Ok(Value::Null) }), None)
            .await
            .unwrap();
        emitter
            .on(
                "t",
                ctx,
                Callback::new(|_, args: Vec<Value>| async move { Ok(json!([args.len(), "x"])) }),
                None,
            )
            .await
            .unwrap();

        let out = emitter
            .emit_with(piped("t"), vec![json!(1), json!(2)])
            .await
            .unwrap();
        assert_eq!(out, vec![json!(2), json!("x")]);
    }

    #[tokio::test]
    async fn rejection_aborts_remaining_stages() {
        let emitter = Emitter::new();
        let ctx = ContextId::next();
        emitter.on("t", ctx, add_one(), None).await.unwrap();
        emitter
            .on(
                "t",
                ctx,
                Callback::new(|_, _| async { Err(Error::rejected("stage 2")) }),
                None,
            )
            .await
            .unwrap();
        emitter.on("t", ctx, add_one(), None).await.unwrap();

        let err = emitter.emit_with(piped("t"), vec![json!(0)]).await.unwrap_err();
        assert_eq!(err, Error::rejected("stage 2"));
    }
}
