// wcpay_core/src/order/mod.rs

//! Orders and the service that moves them through the payment lifecycle.

pub mod lock;
pub mod model;
pub mod notes;
pub mod service;
pub mod store;
pub mod transition;

pub use lock::OrderLock;
pub use model::{Order, OrderRefund, OrderStatus, StatusChange};
pub use notes::NoteComposer;
pub use service::OrderService;
pub use store::{InMemoryOrderStore, OrderStore};
pub use transition::{TransitionKind, TransitionRequest};
