// wcpay_core/src/order/store.rs

use crate::error::{WcpayError, WcpayResult};
use crate::order::model::{Order, OrderRefund, OrderStatus, StatusChange, META_CHARGE_ID, META_INTENT_ID};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Durable order storage owned by the shop. The core never creates or deletes orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn get_by_id(&self, order_id: u64) -> WcpayResult<Option<Order>>;

  async fn save(&self, order: &Order) -> WcpayResult<()>;

  async fn find_by_intent_id(&self, intent_id: &str) -> WcpayResult<Option<Order>>;

  async fn find_by_charge_id(&self, charge_id: &str) -> WcpayResult<Option<Order>>;

  /// Re-reads `order` from durable storage, discarding in-memory changes. Falls back to a
  /// copy of `order` when storage no longer has it.
  async fn refresh(&self, order: &Order) -> WcpayResult<Order> {
    Ok(self.get_by_id(order.id).await?.unwrap_or_else(|| order.clone()))
  }

  /// Records a refund of `amount` and persists the order. A refund that covers the remaining
  /// balance moves the order to `refunded`.
  async fn create_refund(&self, order: &mut Order, amount: i64, reason: &str) -> WcpayResult<()> {
    if amount <= 0 || amount > order.remaining_refund_amount() {
      return Err(WcpayError::Internal(format!(
        "Invalid refund amount {} for order #{} (remaining {})",
        amount,
        order.id,
        order.remaining_refund_amount()
      )));
    }
    order.refunds.push(OrderRefund {
      amount,
      reason: reason.to_string(),
    });
    if order.remaining_refund_amount() == 0 {
      order.apply_status_change(&StatusChange::To(OrderStatus::Refunded))?;
    }
    self.save(order).await
  }
}

/// `OrderStore` over a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
  orders: RwLock<HashMap<u64, Order>>,
}

impl InMemoryOrderStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&self, order: Order) {
    self.orders.write().insert(order.id, order);
  }

  /// The persisted copy, for assertions.
  pub fn get(&self, order_id: u64) -> Option<Order> {
    self.orders.read().get(&order_id).cloned()
  }

  fn find_by_meta(&self, key: &str, value: &str) -> Option<Order> {
    if value.is_empty() {
      return None;
    }
    let orders = self.orders.read();
    let mut matches: Vec<&Order> = orders.values().filter(|o| o.get_meta(key) == Some(value)).collect();
    // Lowest id wins when several orders carry the same reference.
    matches.sort_by_key(|o| o.id);
    matches.first().map(|o| (*o).clone())
  }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
  async fn get_by_id(&self, order_id: u64) -> WcpayResult<Option<Order>> {
    Ok(self.get(order_id))
  }

  async fn save(&self, order: &Order) -> WcpayResult<()> {
    self.orders.write().insert(order.id, order.clone());
    Ok(())
  }

  async fn find_by_intent_id(&self, intent_id: &str) -> WcpayResult<Option<Order>> {
    Ok(self.find_by_meta(META_INTENT_ID, intent_id))
  }

  async fn find_by_charge_id(&self, charge_id: &str) -> WcpayResult<Option<Order>> {
    Ok(self.find_by_meta(META_CHARGE_ID, charge_id))
  }
}
