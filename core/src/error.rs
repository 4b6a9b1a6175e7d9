// wcpay_core/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Machine-readable code carried by `InvalidPaymentMethod` when no order matches a payment.
pub const ORDER_NOT_FOUND_CODE: &str = "order_not_found";

#[derive(Debug, Error)]
pub enum WcpayError {
  /// A webhook payload is missing a property, or a property has the wrong shape.
  /// Aborts processing of that single event only.
  #[error("Invalid webhook data: {message}")]
  InvalidWebhookData { message: String },

  /// An order/charge reference could not be resolved. `code` is machine-readable
  /// (`order_not_found`).
  #[error("Invalid payment method ({code}): {message}")]
  InvalidPaymentMethod { message: String, code: String },

  #[error("Order #{order_id} cannot move from '{from}' to '{to}'")]
  InvalidTransition { order_id: u64, from: String, to: String },

  #[error("Order #{order_id} not found")]
  OrderNotFound { order_id: u64 },

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  /// Failure reported by an external collaborator (order store, option store, remote API, scheduler).
  #[error("Collaborator failure. Source: {source}")]
  Collaborator {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal wcpay error: {0}")]
  Internal(String),
}

impl WcpayError {
  pub fn invalid_webhook_data(message: impl Into<String>) -> Self {
    WcpayError::InvalidWebhookData {
      message: message.into(),
    }
  }

  pub fn order_not_found_for_payment(message: impl Into<String>) -> Self {
    WcpayError::InvalidPaymentMethod {
      message: message.into(),
      code: ORDER_NOT_FOUND_CODE.to_string(),
    }
  }

  /// The machine-readable code, for the variants that carry one.
  pub fn code(&self) -> Option<&str> {
    match self {
      WcpayError::InvalidPaymentMethod { code, .. } => Some(code.as_str()),
      _ => None,
    }
  }
}

// Collaborators report opaque anyhow errors; keep a single wrapping level.
impl From<AnyhowError> for WcpayError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<WcpayError>() {
      Ok(wcpay_err) => wcpay_err,
      Err(err) => WcpayError::Collaborator { source: err },
    }
  }
}

pub type WcpayResult<T, E = WcpayError> = std::result::Result<T, E>;
