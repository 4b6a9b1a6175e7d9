// wcpay_core/src/money.rs

//! Currency helpers for note rendering. Amounts arrive from the payments backend in the
//! currency's minor unit (cents), except for zero-decimal currencies.

/// Currencies the payments backend treats as zero-decimal (amounts are whole units).
pub const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
  "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv", "xaf", "xof", "xpf",
];

pub fn is_zero_decimal_currency(currency: &str) -> bool {
  let lower = currency.to_ascii_lowercase();
  ZERO_DECIMAL_CURRENCIES.contains(&lower.as_str())
}

/// Number of decimals used when displaying `currency`.
pub fn currency_decimals(currency: &str) -> usize {
  if is_zero_decimal_currency(currency) {
    0
  } else {
    2
  }
}

/// Converts a backend amount (minor units) into a display amount.
pub fn interpret_stripe_amount(amount: i64, currency: &str) -> f64 {
  if is_zero_decimal_currency(currency) {
    amount as f64
  } else {
    amount as f64 / 100.0
  }
}

/// Symbol for `currency`, or `None` when only the code is shown.
pub fn currency_symbol(currency: &str) -> Option<&'static str> {
  let symbol = match currency.to_ascii_uppercase().as_str() {
    "USD" | "CAD" | "AUD" | "NZD" | "SGD" | "HKD" | "MXN" => "$",
    "EUR" => "€",
    "GBP" => "£",
    "JPY" | "CNY" => "¥",
    "INR" => "₹",
    "BRL" => "R$",
    "KRW" => "₩",
    "SEK" | "NOK" | "DKK" => "kr",
    "PLN" => "zł",
    "ZAR" => "R",
    _ => return None,
  };
  Some(symbol)
}

/// Formats a display amount with the currency symbol, thousands separators and the
/// currency's decimals (or `decimals` when given), e.g. `-$1,234.50`.
pub fn format_currency(amount: f64, currency: &str, decimals: Option<usize>) -> String {
  let decimals = decimals.unwrap_or_else(|| currency_decimals(currency));
  let number = group_thousands(&format!("{:.*}", decimals, amount.abs()));
  let sign = if amount < 0.0 && !is_formatted_zero(&number) { "-" } else { "" };
  match currency_symbol(currency) {
    Some(symbol) => format!("{}{}{}", sign, symbol, number),
    None => format!("{}{} {}", sign, currency.to_ascii_uppercase(), number),
  }
}

/// Like `format_currency`, but always ends with the ISO code, e.g. `$10.80 USD`.
pub fn format_explicit_currency(amount: f64, currency: &str, decimals: Option<usize>) -> String {
  let formatted = format_currency(amount, currency, decimals);
  let code = currency.to_ascii_uppercase();
  if formatted.contains(code.as_str()) {
    formatted
  } else {
    format!("{} {}", formatted, code)
  }
}

/// Formats a backend (minor unit) amount for order notes, e.g. `€10.00`.
pub fn format_price(amount: i64, currency: &str) -> String {
  format_currency(interpret_stripe_amount(amount, currency), currency, None)
}

fn group_thousands(number: &str) -> String {
  let (int_part, frac_part) = match number.split_once('.') {
    Some((i, f)) => (i, Some(f)),
    None => (number, None),
  };
  let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
  for (idx, ch) in int_part.chars().enumerate() {
    if idx > 0 && (int_part.len() - idx) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(ch);
  }
  match frac_part {
    Some(frac) => format!("{}.{}", grouped, frac),
    None => grouped,
  }
}

fn is_formatted_zero(number: &str) -> bool {
  number.chars().all(|c| c == '0' || c == '.' || c == ',')
}
