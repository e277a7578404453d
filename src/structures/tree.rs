use crate::config::StructureProperties;
use crate::error::{Result, TopologyError};
use crate::mirror::MirrorId;
use crate::network::Network;
use crate::node::{NodeIndex, PlanGraph, StructureType};

use super::{pull_mirrors, RemovedNodes, StructureBase, Substructure};

/// A rooted tree filled breadth-first.
///
/// Child capacity per node is the per-mirror link budget minus one, so an
/// inner node's degree (children plus parent) never exceeds the budget.
/// Growth happens at the shallowest parent with capacity, shrink at the
/// deepest leaf.
#[derive(Debug)]
pub struct TreeStructure {
  base: StructureBase,
}

impl TreeStructure {
  pub fn new(props: &StructureProperties) -> Self {
    TreeStructure { base: StructureBase::new(StructureType::Tree, props) }
  }

  fn capacity(net: &Network) -> usize {
    net.num_target_links_per_mirror().saturating_sub(1)
  }

  pub fn depth_of(&self, plan: &PlanGraph, n: NodeIndex) -> usize {
    plan.depth_in(StructureType::Tree, n)
  }

  pub fn is_leaf(&self, plan: &PlanGraph, n: NodeIndex) -> bool {
    plan.is_terminal(StructureType::Tree, n)
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

  /// Shallowest node with spare child capacity, lowest id first.
  fn attach_point(&self, plan: &PlanGraph, capacity: usize) -> Option<NodeIndex> {
    self
      .base
      .nodes_in_id_order()
      .into_iter()
      .filter(|n| plan.can_accept_children(StructureType::Tree, *n, capacity))
      .min_by_key(|n| (self.depth_of(plan, *n), *n))
  }

  fn fill(
    &mut self, plan: &mut PlanGraph, mirrors: &[MirrorId], head: NodeIndex, capacity: usize,
  ) -> Result<()> {
    for m in mirrors {
      let parent = self.attach_point(plan, capacity).ok_or(TopologyError::InfeasibleSize {
        structure: StructureType::Tree,
        requested: self.base.nodes().len() + 1,
        min: 1,
        max: Some(self.base.nodes().len()),
      })?;
      let fresh = self.create_mirror_node(plan, *m);
      plan.add_child(parent, fresh, &[StructureType::Tree], &[(StructureType::Tree, head)]);
      self.base.register(fresh);
    }
    Ok(())
  }
}

impl Substructure for TreeStructure {
  fn base(&self) -> &StructureBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut StructureBase {
    &mut self.base
  }

  fn build_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, count: usize) -> Result<NodeIndex> {
    if count < 1 {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::Tree,
        requested: count,
        min: 1,
        max: None,
      });
    }
    let capacity = Self::capacity(net);
    let mirrors = pull_mirrors(net, count)?;
    let head = self.create_mirror_node(plan, mirrors[0]);
    plan.get_mut(head).unwrap().set_head(StructureType::Tree, true);
    self.base.register(head);
    self.base.set_root(Some(head));
    self.fill(plan, &mirrors[1..], head, capacity)?;
    Ok(head)
  }

  fn add_nodes_to_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, mirrors: &[MirrorId]) -> Result<usize> {
    let head = self.base.root().ok_or(TopologyError::StructureInvariantViolation {
      structure: StructureType::Tree,
    })?;
    let capacity = Self::capacity(net);
    self.fill(plan, mirrors, head, capacity)?;
    Ok(mirrors.len())
  }

  fn remove_nodes_from_structure(&mut self, plan: &mut PlanGraph, _net: &mut Network, count: usize) -> Result<RemovedNodes> {
    let n = self.base.nodes().len();
    if n < count || n - count < 1 {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::Tree,
        requested: n.saturating_sub(count),
        min: 1,
        max: None,
      });
    }
    let head = self.base.root().unwrap();
    let mut removed = RemovedNodes::default();
    for _ in 0..count {
      // Deepest leaf, highest id breaking ties; the root is a leaf only
      // when it is alone, and then the size guard has already fired.
      let victim = self
        .leaves(plan)
        .into_iter()
        .filter(|l| *l != head)
        .max_by_key(|l| (self.depth_of(plan, *l), *l))
        .ok_or(TopologyError::StructureInvariantViolation { structure: StructureType::Tree })?;
      if let Some(mirror) = plan.remove_node_from_plan(victim, &[StructureType::Tree]) {
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
        plan.count_heads(&members, StructureType::Tree) == 1
          && plan.collect_structure(StructureType::Tree, root).len() == members.len()
      }
    }
  }

  fn expected_links(&self, n: usize, _links_per_mirror: usize) -> usize {
    n.saturating_sub(1)
  }
}
