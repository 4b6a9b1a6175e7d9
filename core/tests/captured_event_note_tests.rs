// tests/captured_event_note_tests.rs

use serde_json::{json, Value};
use wcpay::CapturedEvent;

fn event(details: Value, fee_rates: Value) -> CapturedEvent {
  serde_json::from_value(json!({
    "type": "captured",
    "transaction_details": details,
    "fee_rates": fee_rates,
  }))
  .unwrap()
}

fn details(customer_currency: &str, customer_amount: i64, store_currency: &str, store_amount: i64, fee: i64) -> Value {
  json!({
    "customer_currency": customer_currency,
    "customer_amount": customer_amount,
    "store_currency": store_currency,
    "store_amount": store_amount,
    "store_fee": fee,
  })
}

fn base_only_rates() -> Value {
  json!({
    "percentage": 0.029, "fixed": 30, "fixed_currency": "USD",
    "history": [{"type": "base", "percentage_rate": 0.029, "fixed_rate": 30, "currency": "usd"}]
  })
}

#[test]
fn test_fx_string_eur_to_usd() {
  let captured = event(details("EUR", 1000, "USD", 1080, 61), base_only_rates());

  assert!(captured.is_fx_event());
  assert_eq!(
    captured.compose_fx_string().as_deref(),
    Some("€1.00 EUR → $1.08 USD: $10.80 USD")
  );
}

#[test]
fn test_same_currency_has_no_fx_line() {
  let captured = event(details("USD", 1080, "usd", 1080, 61), base_only_rates());

  assert!(!captured.is_fx_event());
  assert_eq!(captured.compose_fx_string(), None);
}

#[test]
fn test_fx_string_scales_zero_decimal_target() {
  // 10.00 USD settled as 1,500 JPY.
  let captured = event(details("USD", 1000, "JPY", 1500, 0), base_only_rates());

  assert_eq!(
    captured.compose_fx_string().as_deref(),
    Some("$1.00 USD → ¥150 JPY: ¥1,500 JPY")
  );
}

#[test]
fn test_fx_string_scales_zero_decimal_source() {
  // 1,000 JPY settled as 7.00 USD.
  let captured = event(details("JPY", 1000, "USD", 700, 0), base_only_rates());

  assert_eq!(
    captured.compose_fx_string().as_deref(),
    Some("¥1 JPY → $0.007 USD: $7.00 USD")
  );
}

#[test]
fn test_base_fee_only_has_no_breakdown() {
  let captured = event(details("USD", 2100, "USD", 2100, 91), base_only_rates());

  assert_eq!(captured.get_fee_breakdown(), None);
  assert_eq!(captured.compose_fee_break_down(), None);
  assert_eq!(
    captured.compose_fee_string().as_deref(),
    Some("Base fee (2.9% + $0.30): -$0.91 USD")
  );
}

#[test]
fn test_capped_base_fee_wording() {
  let rates = json!({
    "percentage": 0.0, "fixed": 600, "fixed_currency": "USD",
    "history": [{"type": "base", "percentage_rate": 0.0, "fixed_rate": 600, "currency": "usd", "capped": true}]
  });
  let captured = event(details("USD", 100000, "USD", 100000, 600), rates);

  assert_eq!(
    captured.compose_fee_string().as_deref(),
    Some("Base fee (capped at $6.00): -$6.00 USD")
  );
}

#[test]
fn test_full_breakdown_note() {
  let rates = json!({
    "percentage": 0.049, "fixed": 30, "fixed_currency": "USD",
    "history": [
      {"type": "base", "percentage_rate": 0.029, "fixed_rate": 30, "currency": "usd"},
      {"type": "additional", "additional_type": "international", "percentage_rate": 0.01, "fixed_rate": 0, "currency": "usd"},
      {"type": "additional", "additional_type": "fx", "percentage_rate": 0.01, "fixed_rate": 0, "currency": "usd"},
      {"type": "discount", "percentage_rate": -0.005, "fixed_rate": 0, "currency": "usd"}
    ]
  });
  let captured = event(details("EUR", 1000, "USD", 1080, 83), rates);

  assert_eq!(
    captured.get_fee_breakdown(),
    Some(vec![
      "Base fee: 2.9% + $0.30".to_string(),
      "International card fee: 1%".to_string(),
      "Foreign exchange fee: 1%".to_string(),
      "Discount: -0.5%".to_string(),
    ])
  );
  assert_eq!(
    captured.compose_note(),
    [
      "€1.00 EUR → $1.08 USD: $10.80 USD",
      "Fee (4.9% + $0.30): -$0.83 USD",
      " - Base fee: 2.9% + $0.30",
      " - International card fee: 1%",
      " - Foreign exchange fee: 1%",
      " - Discount: -0.5%",
      "Net payout: $9.97 USD",
    ]
    .join("\n")
  );
}

#[test]
fn test_capped_component_in_breakdown() {
  let rates = json!({
    "percentage": 0.039, "fixed": 30, "fixed_currency": "USD",
    "history": [
      {"type": "base", "percentage_rate": 0.0, "fixed_rate": 600, "currency": "usd", "capped": true},
      {"type": "additional", "additional_type": "wcpay-subscription", "percentage_rate": 0.01, "fixed_rate": 0, "currency": "usd"}
    ]
  });
  let captured = event(details("USD", 100000, "USD", 100000, 1600), rates);

  assert_eq!(
    captured.compose_fee_break_down().as_deref(),
    Some(" - Base fee: capped at $6.00\n - Subscription transaction fee: 1%")
  );
  assert_eq!(captured.compose_net_string(), "Net payout: $984.00 USD");
}
