use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::runtime::Runtime; // To run async code within Criterion
use wcpay::cache::{CacheContext, DatabaseCache, ACCOUNT_KEY};
use wcpay::order::InMemoryOrderStore;
use wcpay::scheduler::InMemoryJobScheduler;
use wcpay::store::InMemoryKeyValueStore;
use wcpay::{
  CapturedEvent, IntentStatus, Order, OrderService, PaymentIntent, PaymentsApiClient, SystemClock, WcpayConfig,
  WcpayResult,
};

struct NoApi;

#[async_trait::async_trait]
impl PaymentsApiClient for NoApi {
  async fn get_timeline(&self, _intent_id: &str) -> WcpayResult<Value> {
    Ok(json!({"data": []}))
  }

  async fn get_intent(&self, intent_id: &str) -> WcpayResult<PaymentIntent> {
    Ok(PaymentIntent::new(intent_id, IntentStatus::Succeeded, 0, "usd"))
  }
}

fn order_service() -> (OrderService, Arc<InMemoryOrderStore>) {
  let clock = Arc::new(SystemClock);
  let orders = Arc::new(InMemoryOrderStore::new());
  let service = OrderService::new(
    &WcpayConfig::default(),
    orders.clone(),
    Arc::new(InMemoryKeyValueStore::new(clock.clone())),
    Arc::new(NoApi),
    Arc::new(InMemoryJobScheduler::new()),
    clock,
  );
  (service, orders)
}

// --- Benchmark Functions ---

fn bench_payment_completed(c: &mut Criterion) {
  let rt = Runtime::new().unwrap();
  let mut group = c.benchmark_group("OrderTransitions");
  group.throughput(Throughput::Elements(1));

  group.bench_function("mark_payment_completed", |b| {
    let (service, orders) = order_service();
    let mut next_id = 0u64;
    b.to_async(&rt).iter(|| {
      next_id += 1;
      let mut order = Order::new(next_id, 1500, "USD");
      orders.insert(order.clone());
      let service = service.clone();
      async move {
        service
          .mark_payment_completed(&mut order, "pi_bench", IntentStatus::Succeeded, "ch_bench")
          .await
          .unwrap()
      }
    })
  });

  group.bench_function("duplicate_dispute_rejected", |b| {
    let (service, orders) = order_service();
    let mut order = Order::new(1, 1500, "USD");
    orders.insert(order.clone());
    rt.block_on(service.mark_payment_dispute_created(&mut order, "dp_bench", 1500, "usd", "fraudulent", None))
      .unwrap();
    b.to_async(&rt).iter(|| {
      let mut order = order.clone();
      let service = service.clone();
      async move {
        service
          .mark_payment_dispute_created(&mut order, "dp_bench", 1500, "usd", "fraudulent", None)
          .await
          .unwrap()
      }
    })
  });
  group.finish();
}

fn bench_cache_reads(c: &mut Criterion) {
  let rt = Runtime::new().unwrap();
  let clock = Arc::new(SystemClock);
  let cache = Arc::new(DatabaseCache::new(Arc::new(InMemoryKeyValueStore::new(clock.clone())), clock));
  rt.block_on(cache.add(ACCOUNT_KEY, &json!({"id": "acct_bench", "status": "complete"})));

  c.bench_function("DatabaseCache/fresh_hit", |b| {
    let ctx = CacheContext::admin();
    b.to_async(&rt).iter(|| {
      let cache = cache.clone();
      let ctx = &ctx;
      async move {
        cache
          .get_or_add(ctx, ACCOUNT_KEY, || async { Ok(Some(json!({}))) }, |_: &Value| true, false)
          .await
      }
    })
  });
}

fn bench_fee_note(c: &mut Criterion) {
  let mut group = c.benchmark_group("CapturedEventNote");
  for components in [1usize, 4] {
    let history: Vec<Value> = (0..components)
      .map(|idx| match idx {
        0 => json!({"type": "base", "percentage_rate": 0.029, "fixed_rate": 30, "currency": "usd"}),
        _ => json!({"type": "additional", "additional_type": "fx", "percentage_rate": 0.01, "fixed_rate": 0, "currency": "usd"}),
      })
      .collect();
    let event: CapturedEvent = serde_json::from_value(json!({
      "transaction_details": {
        "customer_currency": "EUR", "customer_amount": 1000,
        "store_currency": "USD", "store_amount": 1080, "store_fee": 61
      },
      "fee_rates": {"percentage": 0.039, "fixed": 30, "fixed_currency": "USD", "history": history}
    }))
    .unwrap();

    group.bench_with_input(BenchmarkId::new("compose_note", components), &event, |b, event| {
      b.iter(|| event.compose_note())
    });
  }
  group.finish();
}

criterion_group!(benches, bench_payment_completed, bench_cache_reads, bench_fee_note);
criterion_main!(benches);
