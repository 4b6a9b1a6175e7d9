// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use tracing::Level;
use wcpay::cache::DatabaseCache;
use wcpay::order::InMemoryOrderStore;
use wcpay::scheduler::InMemoryJobScheduler;
use wcpay::store::{InMemoryKeyValueStore, KeyValueStore};
use wcpay::{
  ContextData, ManualClock, Order, OrderService, PaymentIntent, PaymentsApiClient, StepControl, WcpayConfig,
  WcpayError, WcpayResult, WebhookProcessingService,
};

/// Fixed start time for every simulated clock.
pub const START: i64 = 1_700_000_000;

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Generic pipeline fixtures ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub steps_executed: Vec<String>,
  pub finalized_with: Vec<Option<wcpay::TransitionOutcome>>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("wcpay error: {0}")]
  Wcpay(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<WcpayError> for TestError {
  fn from(err: WcpayError) -> Self {
    TestError::Wcpay(err.to_string())
  }
}

pub fn create_simple_handler(step_name: &'static str) -> wcpay::core::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.with_mut(|data| {
        data.counter += 1;
        data.steps_executed.push(step_name.to_string());
      });
      Ok(StepControl::Continue)
    })
  })
}

// --- Remote API double ---
#[derive(Default)]
pub struct MockApi {
  timelines: Mutex<HashMap<String, Value>>,
  intents: Mutex<HashMap<String, PaymentIntent>>,
  pub timeline_calls: AtomicUsize,
}

impl MockApi {
  pub fn set_timeline(&self, intent_id: &str, timeline: Value) {
    self.timelines.lock().insert(intent_id.to_string(), timeline);
  }

  pub fn set_intent(&self, intent: PaymentIntent) {
    self.intents.lock().insert(intent.id.clone(), intent);
  }
}

#[async_trait]
impl PaymentsApiClient for MockApi {
  async fn get_timeline(&self, intent_id: &str) -> WcpayResult<Value> {
    self.timeline_calls.fetch_add(1, Ordering::SeqCst);
    self
      .timelines
      .lock()
      .get(intent_id)
      .cloned()
      .ok_or_else(|| anyhow::anyhow!("no timeline for {}", intent_id).into())
  }

  async fn get_intent(&self, intent_id: &str) -> WcpayResult<PaymentIntent> {
    self
      .intents
      .lock()
      .get(intent_id)
      .cloned()
      .ok_or_else(|| anyhow::anyhow!("no intent {}", intent_id).into())
  }
}

/// In-memory option store whose deletes always fail.
pub struct DeleteFailingStore(pub Arc<InMemoryKeyValueStore>);

#[async_trait]
impl KeyValueStore for DeleteFailingStore {
  async fn get(&self, key: &str) -> WcpayResult<Option<Value>> {
    self.0.get(key).await
  }

  async fn set(&self, key: &str, value: Value, ttl: Option<std::time::Duration>) -> WcpayResult<()> {
    self.0.set(key, value, ttl).await
  }

  async fn add(&self, key: &str, value: Value, ttl: Option<std::time::Duration>) -> WcpayResult<bool> {
    self.0.add(key, value, ttl).await
  }

  async fn delete(&self, key: &str) -> WcpayResult<bool> {
    Err(anyhow::anyhow!("delete refused for {}", key).into())
  }
}

// --- Wired services over in-memory collaborators ---
pub struct Harness {
  pub clock: Arc<ManualClock>,
  pub kv: Arc<InMemoryKeyValueStore>,
  pub orders: Arc<InMemoryOrderStore>,
  pub scheduler: Arc<InMemoryJobScheduler>,
  pub api: Arc<MockApi>,
  pub cache: Arc<DatabaseCache>,
  pub order_service: OrderService,
  pub webhooks: WebhookProcessingService,
}

impl Harness {
  pub fn new() -> Self {
    Self::with_config(WcpayConfig::default())
  }

  pub fn with_config(config: WcpayConfig) -> Self {
    setup_tracing();
    let clock = Arc::new(ManualClock::new(START));
    let kv = Arc::new(InMemoryKeyValueStore::new(clock.clone()));
    let orders = Arc::new(InMemoryOrderStore::new());
    let scheduler = Arc::new(InMemoryJobScheduler::new());
    let api = Arc::new(MockApi::default());
    let cache = Arc::new(DatabaseCache::new(kv.clone(), clock.clone()));
    let order_service = OrderService::new(
      &config,
      orders.clone(),
      kv.clone(),
      api.clone(),
      scheduler.clone(),
      clock.clone(),
    );
    let webhooks = WebhookProcessingService::new(order_service.clone(), api.clone(), cache.clone());
    Self {
      clock,
      kv,
      orders,
      scheduler,
      api,
      cache,
      order_service,
      webhooks,
    }
  }

  /// Persists `order` and returns the caller's copy.
  pub fn insert_order(&self, order: Order) -> Order {
    self.orders.insert(order.clone());
    order
  }

  /// The persisted copy of an order that must exist.
  pub fn stored(&self, order_id: u64) -> Order {
    self.orders.get(order_id).expect("order should be stored")
  }
}

/// A pending USD order with an attached intent and charge.
pub fn pending_order(id: u64, intent_id: &str, charge_id: &str) -> Order {
  let mut order = Order::new(id, 1500, "USD");
  order.set_intent_id(intent_id);
  order.set_charge_id(charge_id);
  order
}
