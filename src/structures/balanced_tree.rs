use crate::config::StructureProperties;
use crate::error::{Result, TopologyError};
use crate::mirror::MirrorId;
use crate::network::Network;
use crate::node::{NodeIndex, PlanGraph, StructureType};

use super::{pull_mirrors, RemovedNodes, StructureBase, Substructure};

/// A rooted tree that keeps its levels even while it grows and shrinks.
///
/// Attachment parents are chosen by local balance: among nodes with spare
/// capacity whose depth stays within `max_allowed_balance_deviation` of
/// the shallowest open depth, the shallowest wins, then the one with the
/// fewest children, then the lowest id, so a level fills evenly before
/// the next one opens.
#[derive(Debug)]
pub struct BalancedTreeStructure {
  base: StructureBase,
}

impl BalancedTreeStructure {
  pub fn new(props: &StructureProperties) -> Self {
    BalancedTreeStructure { base: StructureBase::new(StructureType::BalancedTree, props) }
  }

  fn capacity(net: &Network) -> usize {
    net.num_target_links_per_mirror().saturating_sub(1)
  }

  pub fn depth_of(&self, plan: &PlanGraph, n: NodeIndex) -> usize {
    plan.depth_in(StructureType::BalancedTree, n)
  }

  pub fn is_leaf(&self, plan: &PlanGraph, n: NodeIndex) -> bool {
    plan.is_terminal(StructureType::BalancedTree, n)
  }

  pub fn leaves(&self, plan: &PlanGraph) -> Vec<NodeIndex> {
    self
      .base
      .nodes_in_id_order()
      .into_iter()
      .filter(|n| self.is_leaf(plan, *n))
      .collect()
  }

  pub fn max_depth_in_tree(&self, plan: &PlanGraph) -> usize {
    self
      .base
      .nodes()
      .iter()
      .map(|n| self.depth_of(plan, *n))
      .max()
      .unwrap_or(0)
  }

  /// The balance-minimizing attachment parent.
  fn attach_point(&self, plan: &PlanGraph, capacity: usize) -> Option<NodeIndex> {
    let ty = StructureType::BalancedTree;
    let open: Vec<NodeIndex> = self
      .base
      .nodes_in_id_order()
      .into_iter()
      .filter(|n| plan.can_accept_children(ty, *n, capacity))
      .collect();
    let shallowest = open.iter().map(|n| self.depth_of(plan, *n)).min()?;
    let deviation = self.base.props().max_allowed_balance_deviation;
    open
      .into_iter()
      .filter(|n| self.depth_of(plan, *n) <= shallowest + deviation)
      .min_by_key(|n| (self.depth_of(plan, *n), plan.typed_children(ty, *n).len(), *n))
  }

  fn fill(
    &mut self, plan: &mut PlanGraph, mirrors: &[MirrorId], head: NodeIndex, capacity: usize,
  ) -> Result<()> {
    let ty = StructureType::BalancedTree;
    for m in mirrors {
      let parent = self.attach_point(plan, capacity).ok_or(TopologyError::InfeasibleSize {
        structure: ty,
        requested: self.base.nodes().len() + 1,
        min: 1,
        max: Some(self.base.nodes().len()),
      })?;
      let fresh = self.create_mirror_node(plan, *m);
      plan.add_child(parent, fresh, &[ty], &[(ty, head)]);
      self.base.register(fresh);
    }
    Ok(())
  }
}

impl Substructure for BalancedTreeStructure {
  fn base(&self) -> &StructureBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut StructureBase {
    &mut self.base
  }

  fn build_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, count: usize) -> Result<NodeIndex> {
    if count < 1 {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::BalancedTree,
        requested: count,
        min: 1,
        max: None,
      });
    }
    let capacity = Self::capacity(net);
    let mirrors = pull_mirrors(net, count)?;
    let head = self.create_mirror_node(plan, mirrors[0]);
    plan.get_mut(head).unwrap().set_head(StructureType::BalancedTree, true);
    self.base.register(head);
    self.base.set_root(Some(head));
    self.fill(plan, &mirrors[1..], head, capacity)?;
    Ok(head)
  }

  fn add_nodes_to_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, mirrors: &[MirrorId]) -> Result<usize> {
    let head = self.base.root().ok_or(TopologyError::StructureInvariantViolation {
      structure: StructureType::BalancedTree,
    })?;
    let capacity = Self::capacity(net);
    self.fill(plan, mirrors, head, capacity)?;
    Ok(mirrors.len())
  }

  fn remove_nodes_from_structure(&mut self, plan: &mut PlanGraph, _net: &mut Network, count: usize) -> Result<RemovedNodes> {
    let n = self.base.nodes().len();
    if n < count || n - count < 1 {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::BalancedTree,
        requested: n.saturating_sub(count),
        min: 1,
        max: None,
      });
    }
    let head = self.base.root().unwrap();
    let mut removed = RemovedNodes::default();
    for _ in 0..count {
      // Least balance impact: a leaf, deepest first, highest id on ties.
      let victim = self
        .leaves(plan)
        .into_iter()
        .filter(|l| *l != head)
        .max_by_key(|l| (self.depth_of(plan, *l), *l))
        .ok_or(TopologyError::StructureInvariantViolation {
          structure: StructureType::BalancedTree,
        })?;
      if let Some(mirror) = plan.remove_node_from_plan(victim, &[StructureType::BalancedTree]) {
        removed.mirrors.push(mirror);
      }
      self.base.unregister(victim);
      removed.nodes.push(victim);
    }
    Ok(removed)
  }

  fn validate_topology(&self, plan: &PlanGraph) -> bool {
    let members = self.base.nodes_in_id_order();
    match self.base.root() {
      None => members.is_empty(),
      Some(root) => {
        plan.count_heads(&members, StructureType::BalancedTree) == 1
          && plan.collect_structure(StructureType::BalancedTree, root).len() == members.len()
      }
    }
  }

  fn expected_links(&self, n: usize, links_per_mirror: usize) -> usize {
    n.saturating_sub(1).min(n * links_per_mirror / 2)
  }
}
