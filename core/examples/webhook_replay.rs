// wcpay_core/examples/webhook_replay.rs

//! Replays a sequence of webhook bodies against in-memory stores and prints the resulting
//! orders. Pass a JSON file holding an array of bodies, or run without arguments for a
//! built-in dispute scenario.
//!
//!   RUST_LOG=wcpay=debug cargo run --example webhook_replay -- events.json

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wcpay::cache::DatabaseCache;
use wcpay::order::InMemoryOrderStore;
use wcpay::scheduler::InMemoryJobScheduler;
use wcpay::store::InMemoryKeyValueStore;
use wcpay::{
  IntentStatus, Order, OrderService, PaymentIntent, PaymentsApiClient, SystemClock, WcpayConfig, WcpayResult,
  WebhookProcessingService,
};

/// Answers every intent lookup with a canceled intent; replays have no remote backend.
struct OfflineApi;

#[async_trait::async_trait]
impl PaymentsApiClient for OfflineApi {
  async fn get_timeline(&self, _intent_id: &str) -> WcpayResult<Value> {
    Ok(json!({"data": []}))
  }

  async fn get_intent(&self, intent_id: &str) -> WcpayResult<PaymentIntent> {
    Ok(PaymentIntent::new(intent_id, IntentStatus::Canceled, 0, "usd"))
  }
}

fn sample_events() -> Vec<Value> {
  vec![
    json!({"type": "payment_intent.succeeded", "data": {"object": {
      "id": "pi_demo", "status": "succeeded", "latest_charge": "ch_demo", "metadata": {"order_id": 1001}
    }}}),
    json!({"type": "charge.dispute.created", "data": {"object": {
      "id": "dp_demo", "charge": "ch_demo", "amount": 4200, "currency": "usd", "reason": "fraudulent"
    }}}),
    // Redelivery: recognised and skipped.
    json!({"type": "charge.dispute.created", "data": {"object": {
      "id": "dp_demo", "charge": "ch_demo", "amount": 4200, "currency": "usd", "reason": "fraudulent"
    }}}),
    json!({"type": "charge.dispute.closed", "data": {"object": {
      "id": "dp_demo", "charge": "ch_demo", "status": "lost"
    }}}),
    json!({"type": "customer.created", "data": {"object": {}}}),
  ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let config = WcpayConfig::from_env()?;
  let clock = Arc::new(SystemClock);
  let kv = Arc::new(InMemoryKeyValueStore::new(clock.clone()));
  let orders = Arc::new(InMemoryOrderStore::new());
  let api: Arc<dyn PaymentsApiClient> = Arc::new(OfflineApi);
  let scheduler = Arc::new(InMemoryJobScheduler::new());

  let order_service = OrderService::new(&config, orders.clone(), kv.clone(), api.clone(), scheduler.clone(), clock.clone());
  let cache = Arc::new(DatabaseCache::new(kv, clock));
  let webhooks = WebhookProcessingService::new(order_service.clone(), api, cache);

  let events = match std::env::args().nth(1) {
    Some(path) => serde_json::from_str::<Vec<Value>>(&std::fs::read_to_string(path)?)?,
    None => {
      orders.insert(Order::new(1001, 4200, "USD"));
      sample_events()
    }
  };

  for body in &events {
    let event_type = body.get("type").and_then(Value::as_str).unwrap_or("?");
    match webhooks.process(body).await {
      Ok(()) => info!(%event_type, "Processed."),
      // Acknowledge and move on, as a webhook endpoint would.
      Err(e) => warn!(%event_type, error = %e, code = e.code().unwrap_or("-"), "Event rejected."),
    }
  }

  for job in scheduler.take_jobs() {
    if let Err(e) = order_service.handle_scheduled_job(&job).await {
      warn!(hook = %job.hook, error = %e, "Scheduled job failed.");
    }
  }

  if let Some(order) = orders.get(1001) {
    println!("Order #{} is {}", order.id, order.status);
    for note in &order.notes {
      println!("  - {}", note);
    }
  }
  Ok(())
}
