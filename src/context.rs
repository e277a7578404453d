use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use uuid::Uuid;

/// An atomic counter handing out distinct, strictly monotone usize ids.
///
/// Clones share the same counter, so every arena cloned from one context
/// keeps drawing from a single id space.
#[derive(Debug, Clone)]
pub struct IdDistributer {
  cnt: Arc<AtomicUsize>,
}

impl IdDistributer {
  pub fn new() -> IdDistributer {
    IdDistributer { cnt: Arc::new(AtomicUsize::new(0)) }
  }

  pub fn alloc(&self) -> usize {
    let c = self.cnt.fetch_add(1, Ordering::Relaxed);
    c + 1
  }
}

impl Default for IdDistributer {
  fn default() -> Self {
    IdDistributer { cnt: Arc::new(AtomicUsize::new(0)) }
  }
}

/// Shared identity for one planning session.
///
/// The plan graph and the network must be created from the same context:
/// node, mirror and link ids are only meaningful relative to it. Mixing
/// handles across contexts is detected in debug builds.
///
/// Ids are allocated per kind, each strictly monotone and never reused, so
/// two runs over identical inputs produce identical id sets.
#[derive(Debug, Clone, Default)]
pub struct Context {
  pub(crate) id: Uuid,
  pub(crate) node_dist: IdDistributer,
  pub(crate) mirror_dist: IdDistributer,
  pub(crate) link_dist: IdDistributer,
}

impl Context {
  /// Create a new context with fresh id spaces.
  pub fn new() -> Context {
    Context {
      id: Uuid::new_v4(),
      node_dist: IdDistributer::new(),
      mirror_dist: IdDistributer::new(),
      link_dist: IdDistributer::new(),
    }
  }
}
