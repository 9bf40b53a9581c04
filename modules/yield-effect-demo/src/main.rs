use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use yield_effect::{Dispatch, HostAdapter, SchedulerConfig, WorkItem};
use yield_effect_demo::{order_product, DemoConfig, MockServices};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("yield_effect=info".parse()?)
                .add_directive("yield_effect_demo=info".parse()?),
        )
        .init();

    info!("Order demo starting...");

    let config = DemoConfig::from_env()?;
    config.log_settings();
    let scheduler_config = SchedulerConfig::from_env()?;
    scheduler_config.log_settings();

    // Stand-in for the host's next stage: log every event that reaches it
    let next: Arc<dyn Dispatch> = Arc::new(|event: Value| {
        info!(%event, "Received event");
        Value::Null
    });
    let host = HostAdapter::with_config(next, Vec::new(), scheduler_config);

    let services = MockServices::new(config.latency, config.happy_path);
    let dispatched = host.handle(WorkItem::coroutine(order_product(
        services,
        config.product_id.clone(),
        config.user_id.clone(),
    )));
    let task = dispatched
        .into_task()
        .ok_or_else(|| anyhow::anyhow!("order coroutine was not started"))?;

    match task.result().await {
        Ok(order) => info!(%order, "Order completed"),
        Err(err) => error!(error = %err, "Order failed"),
    }

    Ok(())
}
