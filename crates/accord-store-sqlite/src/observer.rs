//! Injectable query observation.
//!
//! Every SQL statement the store executes passes through one choke point
//! ([`note`]) that reports it to the attached observer. Test harnesses
//! attach a [`QueryCounter`] to verify the per-request query budget;
//! nothing is observed when no observer is attached.

use std::sync::{
  Arc,
  atomic::{AtomicUsize, Ordering},
};

/// Receives every SQL statement before it is executed.
pub trait QueryObserver: Send + Sync {
  fn on_query(&self, sql: &str);
}

pub(crate) type ObserverHandle = Option<Arc<dyn QueryObserver>>;

pub(crate) fn note(observer: &ObserverHandle, sql: &str) {
  if let Some(obs) = observer.as_deref() {
    obs.on_query(sql);
  }
}

/// Counts observed statements.
#[derive(Debug, Default)]
pub struct QueryCounter {
  count: AtomicUsize,
}

impl QueryCounter {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn count(&self) -> usize {
    self.count.load(Ordering::SeqCst)
  }

  pub fn reset(&self) {
    self.count.store(0, Ordering::SeqCst);
  }
}

impl QueryObserver for QueryCounter {
  fn on_query(&self, _sql: &str) {
    self.count.fetch_add(1, Ordering::SeqCst);
  }
}
