use log::{debug, trace};
use uuid::Uuid;

use crate::arena::Arena;
use crate::context::Context;
use crate::error::{Result, TopologyError};
use crate::mirror::{Link, LinkId, Mirror, MirrorId};

/// Deterministic iterator state over the network's mirror list.
///
/// The cursor is the only authorized source of mirrors for planners: it
/// walks the mirror arena in insertion order, skips mirrors that are no
/// longer usable, and never revisits a position until it is reset. Mirrors
/// a planner frees mid-operation can be recycled; they are handed out
/// again, oldest first, before the walk advances. This is what makes
/// mirror allocation reproducible across runs.
#[derive(Debug, Clone, Default)]
pub struct MirrorCursor {
  pos: usize,
  recycled: std::collections::VecDeque<MirrorId>,
}

/// The mutable bag of mirrors and links, plus the cursor.
///
/// Mirrors are never removed from the arena; shutdown marks them unusable
/// so ids and iteration order stay stable. Links are removed on shutdown,
/// from the bag and from both endpoints in the same step (their membership
/// is symmetric by construction).
#[derive(Debug, Clone)]
pub struct Network {
  ctx_id: Uuid,
  mirrors: Arena<MirrorId, Mirror>,
  links: Arena<LinkId, Link>,
  cursor: MirrorCursor,
  num_target_links_per_mirror: usize,
}

impl Network {
  pub fn new(ctx: &Context, num_target_links_per_mirror: usize) -> Self {
    Network {
      ctx_id: ctx.id,
      mirrors: Arena::new(ctx.mirror_dist.clone()),
      links: Arena::new(ctx.link_dist.clone()),
      cursor: MirrorCursor::default(),
      num_target_links_per_mirror,
    }
  }

  pub(crate) fn ctx_id(&self) -> Uuid {
    self.ctx_id
  }

  /// Create `k` fresh usable mirrors at time `t`, in id order.
  pub fn create_mirrors(&mut self, k: usize, t: u64) -> Vec<MirrorId> {
    let ids: Vec<MirrorId> = (0..k).map(|_| self.mirrors.insert(Mirror::new(t))).collect();
    debug!("created {} mirrors at t={}", k, t);
    ids
  }

  pub fn get_mirror(&self, m: MirrorId) -> Option<&Mirror> {
    self.mirrors.get(m)
  }

  /// Mutable endpoint access for external collaborators (effectors acting
  /// on a mirror directly). The planner itself goes through the link
  /// operations below.
  pub fn get_mirror_mut(&mut self, m: MirrorId) -> Option<&mut Mirror> {
    self.mirrors.get_mut(m)
  }

  pub fn get_link(&self, l: LinkId) -> Option<&Link> {
    self.links.get(l)
  }

  /// All mirrors ever created, shut-down ones included.
  pub fn num_mirrors(&self) -> usize {
    self.mirrors.len()
  }

  pub fn num_usable_mirrors(&self) -> usize {
    self.mirrors.iter().filter(|(_, m)| m.is_usable_for_network()).count()
  }

  /// Live links.
  pub fn num_links(&self) -> usize {
    self.links.len()
  }

  pub fn mirror_ids(&self) -> impl Iterator<Item = MirrorId> + '_ {
    self.mirrors.keys()
  }

  pub fn link_ids(&self) -> impl Iterator<Item = LinkId> + '_ {
    self.links.keys()
  }

  pub fn num_target_links_per_mirror(&self) -> usize {
    self.num_target_links_per_mirror
  }

  pub fn set_num_target_links_per_mirror(&mut self, n: usize) {
    self.num_target_links_per_mirror = n;
  }

  /// Whether `a` records a live link to `b`. Only consults `a`'s own
  /// bookkeeping; see [`check_connected`](Network::check_connected) for the
  /// symmetric query.
  pub fn is_already_connected(&self, a: MirrorId, b: MirrorId) -> bool {
    self.mirrors.get(a).map(|m| m.is_already_connected(b)).unwrap_or(false)
  }

  /// The symmetric connectedness query of the reconciliation pass. Both
  /// directions must agree; a one-sided record is an externally violated
  /// invariant and is never repaired here. Fatal for the process under the
  /// `debug` feature, fatal for the operation otherwise.
  pub fn check_connected(&self, a: MirrorId, b: MirrorId) -> Result<bool> {
    let a_linked = self.is_already_connected(a, b);
    let b_linked = self.is_already_connected(b, a);
    if a_linked != b_linked {
      #[cfg(feature = "debug")]
      panic!("asymmetric link state between {} and {}", a, b);
      #[cfg(not(feature = "debug"))]
      return Err(TopologyError::AsymmetricLink { a, b });
    }
    Ok(a_linked)
  }

  /// Create one link between two distinct mirrors and register it at both
  /// endpoints.
  pub fn create_link(&mut self, a: MirrorId, b: MirrorId, t: u64) -> Result<LinkId> {
    if a == b {
      debug_assert!(false, "refusing self-loop on {:?}", a);
      return Err(TopologyError::AsymmetricLink { a, b });
    }
    let id = self.links.insert(Link::new(a, b, t));
    self.mirrors[a].add_link(id, b);
    self.mirrors[b].add_link(id, a);
    trace!("link {:?} created: {:?} <-> {:?}", id, a, b);
    Ok(id)
  }

  /// Terminate a link: drop it from both endpoints and from the bag.
  pub fn shutdown_link(&mut self, l: LinkId) {
    if let Some(link) = self.links.remove(l) {
      if let Some(m) = self.mirrors.get_mut(link.source()) {
        m.remove_link(l);
      }
      if let Some(m) = self.mirrors.get_mut(link.target()) {
        m.remove_link(l);
      }
      trace!("link {:?} shut down", l);
    }
  }

  /// Terminate every link between the unordered pair, returning the ids.
  pub fn shutdown_links_between(&mut self, a: MirrorId, b: MirrorId) -> Vec<LinkId> {
    let doomed = match self.mirrors.get(a) {
      Some(m) => m.links_to(b),
      None => Vec::new(),
    };
    for l in &doomed {
      self.shutdown_link(*l);
    }
    doomed
  }

  /// Shut a mirror down at time `t`: every attached link is terminated and
  /// the mirror becomes unusable (it stays in the bag for id stability).
  pub fn shutdown_mirror(&mut self, m: MirrorId, t: u64) {
    let attached: Vec<LinkId> = match self.mirrors.get(m) {
      Some(mirror) => mirror.links().collect(),
      None => return,
    };
    for l in attached {
      self.shutdown_link(l);
    }
    self.mirrors[m].mark_shutdown(t);
    debug!("mirror {:?} shut down at t={}", m, t);
  }

  // Cursor protocol.

  /// Whether another usable mirror is available without resetting.
  pub fn has_next_mirror(&self) -> bool {
    self
      .cursor
      .recycled
      .iter()
      .any(|m| self.mirrors.get(*m).map(|mir| mir.is_usable_for_network()).unwrap_or(false))
      || self
        .mirrors
        .iter()
        .skip(self.cursor.pos)
        .any(|(_, m)| m.is_usable_for_network())
  }

  /// Hand out the next usable mirror: recycled ones first (oldest first),
  /// then the insertion-order walk.
  pub fn next_mirror(&mut self) -> Option<MirrorId> {
    while let Some(m) = self.cursor.recycled.pop_front() {
      if self.mirrors.get(m).map(|mir| mir.is_usable_for_network()).unwrap_or(false) {
        return Some(m);
      }
    }
    while self.cursor.pos < self.mirrors.len() {
      let (id, mirror) = self.mirrors.iter().nth(self.cursor.pos)?;
      self.cursor.pos += 1;
      if mirror.is_usable_for_network() {
        return Some(id);
      }
    }
    None
  }

  /// Return a freed mirror to the cursor. It stays usable and will be the
  /// next allocation before the walk advances further.
  pub fn recycle_mirror(&mut self, m: MirrorId) {
    self.cursor.recycled.push_back(m);
  }

  /// Rewind the cursor; the next allocation starts from the oldest usable
  /// mirror again. Used by full rebuilds. Pending recycled mirrors are
  /// dropped, the walk will reach them anyway.
  pub fn reset_cursor(&mut self) {
    self.cursor.pos = 0;
    self.cursor.recycled.clear();
  }
}
