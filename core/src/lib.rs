// src/lib.rs

//! wcpay: the payment reconciliation core of a shop payments gateway.
//!
//! It keeps shop orders in step with the remote payments backend:
//!  - `order`: idempotent, lock-guarded order transitions driven by payment intent status.
//!  - `webhook`: typed parsing and dispatch of backend webhook events.
//!  - `cache`: a stale-while-revalidate cache over the option store with per-key TTL tiers.
//!  - `captured_event_note`: the fee and exchange-rate breakdown note of a captured charge.
//!
//! Storage, the remote API and job scheduling are collaborator traits (`store::KeyValueStore`,
//! `order::OrderStore`, `api::PaymentsApiClient`, `scheduler::JobScheduler`) with in-memory
//! implementations for tests and local tooling.

pub mod api;
pub mod cache;
pub mod captured_event_note;
pub mod clock;
pub mod config;
pub mod core;
pub mod error;
pub mod intent;
pub mod money;
pub mod order;
pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod webhook;

// --- Re-exports for the Public API ---

// Transition pipeline primitives
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{SkipReason, StepControl, TransitionOutcome};
pub use crate::pipeline::definition::Pipeline;

// Services
pub use crate::cache::{CacheContext, DatabaseCache};
pub use crate::order::{Order, OrderService, OrderStatus};
pub use crate::webhook::WebhookProcessingService;

// Collaborators
pub use crate::api::PaymentsApiClient;
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::order::OrderStore;
pub use crate::scheduler::JobScheduler;
pub use crate::store::KeyValueStore;

pub use crate::captured_event_note::CapturedEvent;
pub use crate::config::WcpayConfig;
pub use crate::error::{WcpayError, WcpayResult};
pub use crate::intent::{IntentStatus, PaymentIntent};
