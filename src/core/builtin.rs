//! Built-in lifecycle handlers, always first in a component's registration table.
//!
//! ```text
//! sig/initialize  register on/ specials locally, then hub/ specials on the hub
//! sig/start       replay hub memory to hub/ specials marked "memory"
//! sig/setup       first hub/<topic> handler: subscribe a proxy on the hub (replacing a stale one)
//! sig/teardown    last hub/<topic> handler gone: unsubscribe the proxy
//! sig/task        publish the task info as hub topic "task"
//! sig/finalize    off every non-signal topic, newest first, then drop stale proxies
//! ```

use serde_json::Value;
use tracing::{debug, warn};

use super::component::{Component, HUB_PREFIX};
use crate::error::Error;
use crate::events::{Args, Callback, ContextId, Emission, HandlerResult, is_signal};
use crate::mixins::{Mixin, Special, SpecialKind};
use crate::runners::Runner;

pub(crate) struct Core;

impl Mixin for Core {
    fn name(&self) -> &'static str {
        "core"
    }

    fn specials(&self) -> Vec<Special> {
        vec![
            Special::signal("initialize", Callback::new(initialize)),
            Special::signal("start", Callback::new(start)),
            Special::signal("setup", Callback::new(setup)),
            Special::signal("teardown", Callback::new(teardown)),
            Special::signal("task", Callback::new(task)),
            Special::signal("finalize", Callback::new(finalize)),
        ]
    }
}

async fn initialize(component: Component, _args: Args) -> HandlerResult {
    let specials = component.specials().to_vec();
    for special in specials.iter().filter(|s| matches!(s.kind(), SpecialKind::On(_))) {
        component
            .on(special.kind().name(), special.callback().clone(), special.data().cloned())
            .await?;
    }
    for special in specials.iter().filter(|s| matches!(s.kind(), SpecialKind::Hub(_))) {
        component
            .subscribe(special.kind().name(), special.callback().clone(), special.data().cloned())
            .await?;
    }
    Ok(Value::Null)
}

async fn start(component: Component, _args: Args) -> HandlerResult {
    let replays: Vec<_> = component
        .specials()
        .iter()
        .filter(|s| matches!(s.kind(), SpecialKind::Hub(_)) && s.has_memory())
        .filter_map(|s| {
            let memory = component.hub().memory(s.kind().name())?;
            Some((s.kind().name().to_owned(), s.callback().id(), memory))
        })
        .collect();

    for (topic, callback, memory) in replays {
        debug!(component = %component, topic = %topic, "replay memory");
        let emission = Emission::new(format!("{HUB_PREFIX}{topic}"))
            .with_runner(Runner::Pipeline)
            .with_callback(callback);
        component.emit_with(emission, memory).await?;
    }
    Ok(Value::Null)
}

fn hub_topic(args: &Args) -> Option<String> {
    let topic = args.first()?.as_str()?;
    topic.strip_prefix(HUB_PREFIX).map(str::to_owned)
}

async fn setup(component: Component, args: Args) -> HandlerResult {
    let Some(topic) = hub_topic(&args) else {
        return Ok(Value::Null);
    };
    let local = format!("{HUB_PREFIX}{topic}");
    let weak = component.context();
    let proxy = Callback::new(move |_ctx: ContextId, args: Args| {
        let weak = weak.clone();
        let local = local.clone();
        async move {
            let Some(component) = weak.upgrade() else {
                return Ok(Value::Null);
            };
            let emission = Emission::new(local).with_runner(Runner::Pipeline);
            let out = component.emit_with(emission, args).await?;
            Ok(Value::Array(out))
        }
    });

    // A proxy left by an abandoned setup or teardown is replaced, never doubled.
    if let Some(stale) = component.take_proxy(&format!("{HUB_PREFIX}{topic}")) {
        unsubscribe_proxy(&component, &topic, &stale).await?;
    }
    debug!(component = %component, topic = %topic, "hub proxy subscribe");
    component
        .hub()
        .subscribe(&topic, component.id(), proxy.clone(), None)
        .await?;
    component.insert_proxy(&format!("{HUB_PREFIX}{topic}"), proxy);
    Ok(Value::Null)
}

async fn unsubscribe_proxy(
    component: &Component,
    topic: &str,
    proxy: &Callback<ContextId>,
) -> Result<(), Error> {
    debug!(component = %component, topic = %topic, "hub proxy unsubscribe");
    component
        .hub()
        .unsubscribe(topic, component.id(), Some(proxy.id()))
        .await?;
    Ok(())
}

async fn teardown(component: Component, args: Args) -> HandlerResult {
    let Some(topic) = hub_topic(&args) else {
        return Ok(Value::Null);
    };
    let Some(proxy) = component.take_proxy(&format!("{HUB_PREFIX}{topic}")) else {
        return Ok(Value::Null);
    };
    unsubscribe_proxy(&component, &topic, &proxy).await?;
    Ok(Value::Null)
}

async fn task(component: Component, args: Args) -> HandlerResult {
    let out = component.publish("task", args).await?;
    Ok(Value::Array(out))
}

async fn finalize(component: Component, _args: Args) -> HandlerResult {
    let mut topics = component.topics();
    topics.retain(|t| !is_signal(t));
    let mut failed: Option<Error> = None;
    for topic in topics.iter().rev() {
        if let Err(e) = component.off(topic, None).await {
            keep_first(&component, &mut failed, topic, e);
        }
    }
    // Proxies whose local topic was dropped mid-setup never see a teardown.
    for (local, proxy) in component.drain_proxies() {
        let Some(topic) = local.strip_prefix(HUB_PREFIX) else {
            continue;
        };
        if let Err(e) = unsubscribe_proxy(&component, topic, &proxy).await {
            keep_first(&component, &mut failed, &local, e);
        }
    }
    match failed {
        Some(e) => Err(e),
        None => Ok(Value::Null),
    }
}

fn keep_first(component: &Component, failed: &mut Option<Error>, topic: &str, e: Error) {
    if failed.is_some() {
        warn!(
            component = %component,
            topic = %topic,
            error = %e,
            "finalize: further teardown failure"
        );
    } else {
        *failed = Some(e);
    }
}
