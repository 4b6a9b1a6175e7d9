// wcpay_core/src/webhook/mod.rs

//! Webhook events from the payments backend. Signature verification happens before a body
//! reaches this module.

pub mod event;
pub mod failure;
pub mod processing;

pub use event::{read_webhook_property, InvoiceEventKind, WebhookEvent};
pub use processing::{OrderResolutionError, RemoteNoteService, SubscriptionEventHandler, WebhookProcessingService};
