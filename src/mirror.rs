use ordermap::OrderMap;
use serde::{Deserialize, Serialize};

use crate::arena::ArenaIndex;

/// Stable identity of a mirror. Allocated once, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MirrorId(pub usize);

impl ArenaIndex for MirrorId {
  fn new(id: usize) -> Self {
    MirrorId(id)
  }
  fn id(&self) -> usize {
    self.0
  }
}

/// Stable identity of a link. Strictly monotone over the lifetime of a
/// context, so two runs over identical inputs yield identical link id sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub usize);

impl ArenaIndex for LinkId {
  fn new(id: usize) -> Self {
    LinkId(id)
  }
  fn id(&self) -> usize {
    self.0
  }
}

/// A replicating endpoint of the overlay.
///
/// The mirror itself is opaque to the planner: it tracks which links touch
/// it and whether it is still usable. Both endpoints of a link record it,
/// and connectedness queries only consult the mirror's own record, so an
/// asymmetry introduced from outside is observable.
#[derive(Debug, Clone)]
pub struct Mirror {
  /// Attached links, keyed by link id, valued by the peer mirror.
  links: OrderMap<LinkId, MirrorId>,
  usable: bool,
  created_at: u64,
  shutdown_at: Option<u64>,
}

impl Mirror {
  pub(crate) fn new(created_at: u64) -> Self {
    Mirror { links: OrderMap::new(), usable: true, created_at, shutdown_at: None }
  }

  pub fn add_link(&mut self, link: LinkId, peer: MirrorId) {
    self.links.insert(link, peer);
  }

  pub fn remove_link(&mut self, link: LinkId) {
    self.links.remove(&link);
  }

  /// Whether any attached link leads to `other`.
  pub fn is_already_connected(&self, other: MirrorId) -> bool {
    self.links.values().any(|peer| *peer == other)
  }

  /// All links leading to `other`, in attachment order.
  pub fn links_to(&self, other: MirrorId) -> Vec<LinkId> {
    self.links.iter().filter(|(_, peer)| **peer == other).map(|(l, _)| *l).collect()
  }

  pub fn links(&self) -> impl Iterator<Item = LinkId> + '_ {
    self.links.keys().copied()
  }

  pub fn num_links(&self) -> usize {
    self.links.len()
  }

  pub fn is_usable_for_network(&self) -> bool {
    self.usable
  }

  pub fn created_at(&self) -> u64 {
    self.created_at
  }

  pub fn shutdown_at(&self) -> Option<u64> {
    self.shutdown_at
  }

  pub(crate) fn mark_shutdown(&mut self, time: u64) {
    self.usable = false;
    self.shutdown_at = Some(time);
  }
}

/// A bidirectional channel between two mirrors.
///
/// Source and target are an observational artifact of creation order; for
/// connectedness the pair is unordered. A link never connects a mirror to
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
  source: MirrorId,
  target: MirrorId,
  created_at: u64,
}

impl Link {
  pub(crate) fn new(source: MirrorId, target: MirrorId, created_at: u64) -> Self {
    debug_assert!(source != target, "link endpoints must differ");
    Link { source, target, created_at }
  }

  pub fn source(&self) -> MirrorId {
    self.source
  }

  pub fn target(&self) -> MirrorId {
    self.target
  }

  pub fn created_at(&self) -> u64 {
    self.created_at
  }

  /// The endpoint that is not `m`.
  pub fn peer_of(&self, m: MirrorId) -> Option<MirrorId> {
    if self.source == m {
      Some(self.target)
    } else if self.target == m {
      Some(self.source)
    } else {
      None
    }
  }

  /// Unordered endpoint equality.
  pub fn connects(&self, a: MirrorId, b: MirrorId) -> bool {
    (self.source == a && self.target == b) || (self.source == b && self.target == a)
  }
}
