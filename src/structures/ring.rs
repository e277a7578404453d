use crate::config::StructureProperties;
use crate::error::{Result, TopologyError};
use crate::mirror::MirrorId;
use crate::network::Network;
use crate::node::{NodeIndex, PlanGraph, StructureType};

use super::{pull_mirrors, RemovedNodes, StructureBase, Substructure};

/// A cycle of mirrors.
///
/// The head is the first node placed; every node has exactly one successor
/// record, the last node's successor being the head again. The closing
/// record never gives the head a parent; roots stay roots.
#[derive(Debug)]
pub struct RingStructure {
  base: StructureBase,
}

impl RingStructure {
  pub fn new(props: &StructureProperties) -> Self {
    RingStructure { base: StructureBase::new(StructureType::Ring, props) }
  }

  fn min_size(&self) -> usize {
    self.base.props().min_ring_size.max(3)
  }

  /// Successor of `n` along the cycle.
  pub fn next_in_ring(&self, plan: &PlanGraph, n: NodeIndex) -> Option<NodeIndex> {
    plan.typed_children(StructureType::Ring, n).first().copied()
  }

  /// Predecessor of `n` along the cycle.
  pub fn prev_in_ring(&self, plan: &PlanGraph, n: NodeIndex) -> Option<NodeIndex> {
    plan.typed_parents(StructureType::Ring, n).first().copied()
  }

  /// Walk the cycle from the head and check that it closes after visiting
  /// every managed node exactly once.
  pub fn is_ring_intact(&self, plan: &PlanGraph) -> bool {
    let head = match self.base.root() {
      Some(h) => h,
      None => return self.base.nodes().is_empty(),
    };
    let n = self.base.nodes().len();
    if n < self.min_size() {
      return false;
    }
    let mut at = head;
    let mut seen = 0;
    loop {
      at = match self.next_in_ring(plan, at) {
        Some(next) => next,
        None => return false,
      };
      seen += 1;
      if at == head {
        break;
      }
      if seen > n {
        return false;
      }
    }
    seen == n
  }

  /// Every `step`-th node walking the cycle from the head: the positions a
  /// composite bridges external structures onto.
  pub fn find_bridge_nodes(&self, plan: &PlanGraph, step: usize) -> Vec<NodeIndex> {
    let head = match self.base.root() {
      Some(h) => h,
      None => return Vec::new(),
    };
    if step == 0 {
      return Vec::new();
    }
    let n = self.base.nodes().len();
    let mut out = Vec::new();
    let mut at = head;
    for i in 0..n {
      if i % step == 0 {
        out.push(at);
      }
      at = match self.next_in_ring(plan, at) {
        Some(next) => next,
        None => break,
      };
    }
    out
  }

  /// The cycle in walk order, head first.
  pub fn ring_order(&self, plan: &PlanGraph) -> Vec<NodeIndex> {
    let head = match self.base.root() {
      Some(h) => h,
      None => return Vec::new(),
    };
    let n = self.base.nodes().len();
    let mut out = Vec::with_capacity(n);
    let mut at = head;
    for _ in 0..n {
      out.push(at);
      at = match self.next_in_ring(plan, at) {
        Some(next) => next,
        None => break,
      };
    }
    out
  }
}

impl Substructure for RingStructure {
  fn base(&self) -> &StructureBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut StructureBase {
    &mut self.base
  }

  fn build_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, count: usize) -> Result<NodeIndex> {
    if count < self.min_size() {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::Ring,
        requested: count,
        min: self.min_size(),
        max: None,
      });
    }
    let mirrors = pull_mirrors(net, count)?;
    let nodes: Vec<NodeIndex> = mirrors.iter().map(|m| self.create_mirror_node(plan, *m)).collect();
    let head = nodes[0];
    plan.get_mut(head).unwrap().set_head(StructureType::Ring, true);
    for w in nodes.windows(2) {
      plan.add_child(w[0], w[1], &[StructureType::Ring], &[(StructureType::Ring, head)]);
    }
    plan.add_child(nodes[count - 1], head, &[StructureType::Ring], &[(StructureType::Ring, head)]);
    for n in nodes {
      self.base.register(n);
    }
    self.base.set_root(Some(head));
    Ok(head)
  }

  fn add_nodes_to_structure(&mut self, plan: &mut PlanGraph, _net: &mut Network, mirrors: &[MirrorId]) -> Result<usize> {
    let head = self.base.root().ok_or(TopologyError::StructureInvariantViolation {
      structure: StructureType::Ring,
    })?;
    let mut added = 0;
    for m in mirrors {
      // New nodes slip in between the current tail and the head.
      let tail = self.prev_in_ring(plan, head).ok_or(TopologyError::StructureInvariantViolation {
        structure: StructureType::Ring,
      })?;
      let fresh = self.create_mirror_node(plan, *m);
      plan.remove_child_types(tail, head, &[StructureType::Ring]);
      plan.add_child(tail, fresh, &[StructureType::Ring], &[(StructureType::Ring, head)]);
      plan.add_child(fresh, head, &[StructureType::Ring], &[(StructureType::Ring, head)]);
      self.base.register(fresh);
      added += 1;
    }
    Ok(added)
  }

  fn remove_nodes_from_structure(&mut self, plan: &mut PlanGraph, _net: &mut Network, count: usize) -> Result<RemovedNodes> {
    let n = self.base.nodes().len();
    if n < count || n - count < self.min_size() {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::Ring,
        requested: n.saturating_sub(count),
        min: self.min_size(),
        max: None,
      });
    }
    let head = self.base.root().ok_or(TopologyError::StructureInvariantViolation {
      structure: StructureType::Ring,
    })?;
    let mut removed = RemovedNodes::default();
    for _ in 0..count {
      // Highest-id node that is not the head.
      let victim = *self
        .base
        .nodes_in_id_order()
        .iter()
        .rev()
        .find(|idx| **idx != head)
        .expect("ring below minimum size");
      let prev = self.prev_in_ring(plan, victim).unwrap();
      let next = self.next_in_ring(plan, victim).unwrap();
      if let Some(mirror) = plan.remove_node_from_plan(victim, &[StructureType::Ring]) {
        removed.mirrors.push(mirror);
      }
      plan.add_child(prev, next, &[StructureType::Ring], &[(StructureType::Ring, head)]);
      self.base.unregister(victim);
      removed.nodes.push(victim);
    }
    Ok(removed)
  }

  fn validate_topology(&self, plan: &PlanGraph) -> bool {
    if self.base.root().is_none() {
      return self.base.nodes().is_empty();
    }
    let members = self.base.nodes_in_id_order();
    plan.count_heads(&members, StructureType::Ring) == 1 && self.is_ring_intact(plan)
  }

  fn expected_links(&self, n: usize, _links_per_mirror: usize) -> usize {
    if n >= 3 {
      n
    } else {
      0
    }
  }
}
