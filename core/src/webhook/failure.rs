// wcpay_core/src/webhook/failure.rs

use crate::webhook::event::PaymentError;

/// Payment method types whose asynchronous failures are turned into failed orders.
pub const BANK_DEBIT_METHOD_TYPES: &[&str] = &["us_bank_account", "becs"];

pub fn is_bank_debit_method(payment_method_type: &str) -> bool {
  BANK_DEBIT_METHOD_TYPES.contains(&payment_method_type)
}

/// Customer-facing failure message for a bank-debit error code.
pub fn failure_message_for_code(code: Option<&str>) -> &'static str {
  match code.unwrap_or_default() {
    "account_closed" => "The customer's bank account has been closed.",
    "debit_not_authorized" => "The customer has notified their bank that this payment was unauthorized.",
    "insufficient_funds" => "The customer's account has insufficient funds to cover this payment.",
    "no_account" => "The customer's bank account could not be located.",
    "payment_method_microdeposit_failed" => {
      "Microdeposit transfers failed. Please check the account, institution and transit numbers."
    }
    "payment_method_microdeposit_verification_attempts_exceeded" => {
      "You have exceeded the number of allowed verification attempts."
    }
    _ => GENERIC_FAILURE_MESSAGE,
  }
}

const GENERIC_FAILURE_MESSAGE: &str = "The payment was not successful.";

/// Uses the error code, then the decline code when the error code is not a known one.
pub fn failure_message_from_error(error: &PaymentError) -> &'static str {
  match failure_message_for_code(error.code.as_deref()) {
    GENERIC_FAILURE_MESSAGE => failure_message_for_code(error.decline_code.as_deref()),
    message => message,
  }
}
