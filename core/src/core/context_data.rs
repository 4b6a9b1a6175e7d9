// wcpay_core/src/core/context_data.rs
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared, interiorly mutable state threaded through the steps of one transition run.
///
/// Every step handler receives a clone (the `Arc` is shared), so writes made by the
/// `refresh` step are visible to `deduplicate`, `apply` and the finalizer.
///
/// Access goes through closures only: the blocking `parking_lot` guards must never be held
/// across an `.await`.
#[derive(Debug)]
pub struct ContextData<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> ContextData<T> {
  pub fn new(data: T) -> Self {
    ContextData(Arc::new(RwLock::new(data)))
  }

  /// Runs `f` under a read guard and returns its result, so the guard can never leak past an await.
  pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
    f(&self.0.read())
  }

  /// Runs `f` under a write guard and returns its result.
  pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
    f(&mut self.0.write())
  }
}

impl<T: Send + Sync + Clone + 'static> ContextData<T> {
  /// Clones the current state out of the shared cell.
  pub fn snapshot(&self) -> T {
    self.0.read().clone()
  }
}

impl<T: Send + Sync + 'static> Clone for ContextData<T> {
  fn clone(&self) -> Self {
    ContextData(Arc::clone(&self.0))
  }
}
