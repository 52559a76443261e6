//! # Example: Component lifecycle over a shared hub
//!
//! Two components share one hub:
//! - `quotes` publishes prices and runs a task that reports progress;
//! - `ticker` follows `price` (with memory replay) and doubles every quote
//!   through a local pipeline before it reaches later hub subscribers.
//!
//! Run with:
//! ```text
//! RUST_LOG=sigvisor=debug cargo run --example lifecycle --features logging
//! ```

use std::time::Duration;

use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use sigvisor::{Callback, Component, Config, Hub, LogWriter, Special};

fn ticker(hub: &Hub) -> Component {
    let remember = Callback::new(|c: Component, args: Vec<Value>| async move {
        c.configure([json!({ "seen": args })])?;
        Ok(Value::Null)
    });
    let double = Callback::new(|_c: Component, args: Vec<Value>| async move {
        let n = args.first().and_then(Value::as_f64).unwrap_or_default();
        Ok(json!(n * 2.0))
    });

    Component::builder()
        .with_config(Config::default().with_display_name("ticker"))
        .with_hub(hub.clone())
        .with_mixin(LogWriter::new())
        .with_special(Special::hub("price", remember).with_memory())
        .with_special(Special::hub("price", double))
        .build()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sigvisor=info")),
        )
        .init();

    let hub = Hub::new();
    let quotes = Component::builder()
        .with_config(Config::default().with_display_name("quotes"))
        .with_hub(hub.clone())
        .with_mixin(LogWriter::new())
        .build();
    quotes.start(vec![]).await?;

    // Published before `ticker` exists; replayed to it on start.
    quotes.publish("price", vec![json!(10.5)]).await?;

    let ticker = ticker(&hub);
    ticker.start(vec![]).await?;
    println!("replayed: {}", ticker.configuration()["seen"]);

    let out = quotes.publish("price", vec![json!(11.0)]).await?;
    println!("pipeline result: {out:?}");
    println!("ticker saw: {}", ticker.configuration()["seen"]);

    let task = quotes
        .task(
            |resolver| {
                tokio::spawn(async move {
                    for pct in [25, 50, 75] {
                        resolver.notify(json!(pct));
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                    resolver.resolve(json!("refreshed"));
                });
            },
            Some("refresh"),
        )
        .await?;

    let mut progress = task.progress();
    let watcher = tokio::spawn(async move {
        while let Ok(pct) = progress.recv().await {
            println!("progress: {pct}%");
        }
    });

    println!("task outcome: {:?}", task.wait().await);
    println!("task info: {}", task.info().to_value());
    watcher.abort();

    ticker.stop(vec![]).await?;
    quotes.stop(vec![]).await?;
    println!("{ticker} is {}, {quotes} is {}", ticker.phase(), quotes.phase());
    Ok(())
}
