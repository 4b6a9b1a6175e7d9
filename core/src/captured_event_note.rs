// wcpay_core/src/captured_event_note.rs

//! Formats the `captured` timeline event of a charge into the fee-breakdown order note.
//!
//! Pure formatting: every function reads the event and returns strings. Amounts in the event
//! are minor units of their currency; percentages are fractions (`0.029` is 2.9%).

use crate::money::{format_currency, format_explicit_currency, interpret_stripe_amount, is_zero_decimal_currency};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedEvent {
  pub transaction_details: TransactionDetails,
  #[serde(default)]
  pub fee_rates: Option<FeeRates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDetails {
  pub customer_currency: String,
  pub customer_amount: i64,
  pub store_currency: String,
  pub store_amount: i64,
  #[serde(default)]
  pub store_fee: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRates {
  #[serde(default)]
  pub percentage: f64,
  #[serde(default)]
  pub fixed: i64,
  #[serde(default)]
  pub fixed_currency: String,
  #[serde(default)]
  pub history: Vec<FeeHistoryItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeHistoryItem {
  #[serde(rename = "type")]
  pub fee_type: String,
  #[serde(default)]
  pub additional_type: Option<String>,
  #[serde(default)]
  pub percentage_rate: f64,
  #[serde(default)]
  pub fixed_rate: i64,
  #[serde(default)]
  pub currency: String,
  #[serde(default)]
  pub capped: bool,
}

impl CapturedEvent {
  /// The customer paid in a different currency than the store settles in.
  pub fn is_fx_event(&self) -> bool {
    let details = &self.transaction_details;
    !details.customer_currency.eq_ignore_ascii_case(&details.store_currency)
  }

  /// E.g. `€1.00 EUR → $1.08 USD: $10.80 USD`. `None` for same-currency charges.
  pub fn compose_fx_string(&self) -> Option<String> {
    if !self.is_fx_event() {
      return None;
    }
    let details = &self.transaction_details;
    Some(fx_string(
      &details.customer_currency,
      details.customer_amount,
      &details.store_currency,
      details.store_amount,
    ))
  }

  /// E.g. `Base fee (2.9% + $0.30): -$0.61 USD`.
  pub fn compose_fee_string(&self) -> Option<String> {
    let fee_rates = self.fee_rates.as_ref()?;
    let details = &self.transaction_details;
    let fee_amount = format_explicit_currency(
      -interpret_stripe_amount(details.store_fee, &details.store_currency),
      &details.store_currency,
      None,
    );

    let base_only = self.is_base_fee_only();
    if base_only {
      if let Some(base) = fee_rates.history.first().filter(|item| item.capped) {
        return Some(format!("Base fee (capped at {}): {}", fixed_amount(base.fixed_rate, &base.currency), fee_amount));
      }
    }

    let label = if base_only { "Base fee" } else { "Fee" };
    let rate = if fee_rates.fixed != 0 {
      format!(
        "{}% + {}",
        format_fee(fee_rates.percentage),
        fixed_amount(fee_rates.fixed, &fee_rates.fixed_currency)
      )
    } else {
      format!("{}%", format_fee(fee_rates.percentage))
    };
    Some(format!("{} ({}): {}", label, rate, fee_amount))
  }

  /// One label per fee component, in history order. `None` when the history is a single
  /// base fee, which `compose_fee_string` already describes.
  pub fn get_fee_breakdown(&self) -> Option<Vec<String>> {
    let fee_rates = self.fee_rates.as_ref()?;
    if fee_rates.history.is_empty() || self.is_base_fee_only() {
      return None;
    }
    let lines: Vec<String> = fee_rates.history.iter().filter_map(fee_history_label).collect();
    if lines.is_empty() {
      None
    } else {
      Some(lines)
    }
  }

  /// The breakdown as indented bullet lines.
  pub fn compose_fee_break_down(&self) -> Option<String> {
    let breakdown = self.get_fee_breakdown()?;
    Some(
      breakdown
        .iter()
        .map(|line| format!(" - {}", line))
        .collect::<Vec<_>>()
        .join("\n"),
    )
  }

  /// E.g. `Net payout: $10.19 USD`.
  pub fn compose_net_string(&self) -> String {
    let details = &self.transaction_details;
    let net = details.store_amount - details.store_fee;
    format!(
      "Net payout: {}",
      format_explicit_currency(interpret_stripe_amount(net, &details.store_currency), &details.store_currency, None)
    )
  }

  /// The full note: FX line, fee line, breakdown, net payout.
  pub fn compose_note(&self) -> String {
    let mut lines = Vec::with_capacity(4);
    lines.extend(self.compose_fx_string());
    lines.extend(self.compose_fee_string());
    lines.extend(self.compose_fee_break_down());
    lines.push(self.compose_net_string());
    lines.join("\n")
  }

  fn is_base_fee_only(&self) -> bool {
    match self.fee_rates.as_ref().map(|rates| rates.history.as_slice()) {
      Some([only]) => only.fee_type == "base",
      _ => false,
    }
  }
}

fn fx_string(from_currency: &str, from_amount: i64, to_currency: &str, to_amount: i64) -> String {
  let mut exchange_rate = if from_amount != 0 {
    to_amount as f64 / from_amount as f64
  } else {
    0.0
  };
  // Zero-decimal amounts are whole units while the other side is in cents.
  if is_zero_decimal_currency(to_currency) {
    exchange_rate *= 100.0;
  }
  if is_zero_decimal_currency(from_currency) {
    exchange_rate /= 100.0;
  }

  let to_display = interpret_stripe_amount(to_amount, to_currency);
  format!(
    "{} → {}: {}",
    format_explicit_currency(1.0, from_currency, None),
    format_exchange_rate(exchange_rate, to_currency),
    format_explicit_currency(to_display, to_currency, None)
  )
}

fn format_exchange_rate(rate: f64, currency: &str) -> String {
  let decimals = if rate > 1.0 { 5 } else { 6 };
  let formatted = format_explicit_currency(rate, currency, Some(decimals));
  formatted
    .split(' ')
    .map(strip_trailing_zeros)
    .collect::<Vec<_>>()
    .join(" ")
}

/// Strips trailing zeros after a decimal point, then a dangling point. Tokens without a
/// point are left alone so `100` stays `100`.
fn strip_trailing_zeros(token: &str) -> &str {
  if !token.contains('.') {
    return token;
  }
  token.trim_end_matches('0').trim_end_matches('.')
}

/// `0.029` -> `2.9`, at most three decimals.
pub fn format_fee(fraction: f64) -> String {
  let formatted = format!("{:.3}", fraction * 100.0);
  strip_trailing_zeros(&formatted).to_string()
}

fn fixed_amount(minor: i64, currency: &str) -> String {
  format_currency(interpret_stripe_amount(minor, currency), currency, None)
}

fn fee_history_label(item: &FeeHistoryItem) -> Option<String> {
  let name = match (item.fee_type.as_str(), item.additional_type.as_deref()) {
    ("base", _) => "Base fee",
    ("additional", Some("international")) => "International card fee",
    ("additional", Some("fx")) => "Foreign exchange fee",
    ("additional", Some("wcpay-subscription")) => "Subscription transaction fee",
    ("discount", _) => "Discount",
    _ => return None,
  };

  if item.capped {
    return Some(format!("{}: capped at {}", name, fixed_amount(item.fixed_rate, &item.currency)));
  }

  let fixed = fixed_amount(item.fixed_rate, &item.currency);
  let label = if item.fixed_rate == 0 {
    format!("{}: {}%", name, format_fee(item.percentage_rate))
  } else if item.percentage_rate == 0.0 {
    format!("{}: {}", name, fixed)
  } else {
    format!("{}: {}% + {}", name, format_fee(item.percentage_rate), fixed)
  };
  Some(label)
}
