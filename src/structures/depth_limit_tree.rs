use crate::config::StructureProperties;
use crate::error::{Result, TopologyError};
use crate::mirror::MirrorId;
use crate::network::Network;
use crate::node::{NodeIndex, PlanGraph, StructureType};

use super::{pull_mirrors, RemovedNodes, StructureBase, Substructure};

/// A rooted tree with a hard depth cap.
///
/// Per-node child capacity is the full per-mirror link budget, so total
/// capacity is `sum(budget^d)` for depths 0 through `max_depth`. Growth
/// prefers the deepest parent still under the cap, walking the tree in
/// depth-first order; spilling past total capacity is infeasible.
#[derive(Debug)]
pub struct DepthLimitTreeStructure {
  base: StructureBase,
}

impl DepthLimitTreeStructure {
  pub fn new(props: &StructureProperties) -> Self {
    DepthLimitTreeStructure { base: StructureBase::new(StructureType::DepthLimitTree, props) }
  }

  fn capacity(net: &Network) -> usize {
    net.num_target_links_per_mirror()
  }

  pub fn max_depth(&self) -> usize {
    self.base.props().max_depth.max(1)
  }

  /// Node capacity of the whole tree under the configured depth cap.
  pub fn total_capacity(&self, per_node: usize) -> usize {
    let mut total = 0usize;
    let mut level = 1usize;
    for _ in 0..=self.max_depth() {
      total = total.saturating_add(level);
      level = level.saturating_mul(per_node);
    }
    total
  }

  pub fn depth_of(&self, plan: &PlanGraph, n: NodeIndex) -> usize {
    plan.depth_in(StructureType::DepthLimitTree, n)
  }

  pub fn is_leaf(&self, plan: &PlanGraph, n: NodeIndex) -> bool {
    plan.is_terminal(StructureType::DepthLimitTree, n)
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

  /// Preorder walk over the depth-limited tree, children in record order.
  fn dfs_order(&self, plan: &PlanGraph) -> Vec<NodeIndex> {
    let mut out = Vec::new();
    let root = match self.base.root() {
      Some(r) => r,
      None => return out,
    };
    let mut stack = vec![root];
    while let Some(n) = stack.pop() {
      out.push(n);
      let children = plan.typed_children(StructureType::DepthLimitTree, n);
      for c in children.into_iter().rev() {
        stack.push(c);
      }
    }
    out
  }

  /// Deepest eligible parent in DFS-preference order.
  fn attach_point(&self, plan: &PlanGraph, capacity: usize) -> Option<NodeIndex> {
    let ty = StructureType::DepthLimitTree;
    let max_depth = self.max_depth();
    let mut best: Option<(usize, usize, NodeIndex)> = None;
    for (pos, n) in self.dfs_order(plan).into_iter().enumerate() {
      let depth = self.depth_of(plan, n);
      if depth >= max_depth || !plan.can_accept_children(ty, n, capacity) {
        continue;
      }
      let better = match best {
        // Deeper wins; on equal depth the earlier DFS position stays.
        Some((d, _, _)) => depth > d,
        None => true,
      };
      if better {
        best = Some((depth, pos, n));
      }
    }
    best.map(|(_, _, n)| n)
  }

  fn fill(
    &mut self, plan: &mut PlanGraph, mirrors: &[MirrorId], head: NodeIndex, capacity: usize,
  ) -> Result<()> {
    let ty = StructureType::DepthLimitTree;
    for m in mirrors {
      let parent = self.attach_point(plan, capacity).ok_or(TopologyError::InfeasibleSize {
        structure: ty,
        requested: self.base.nodes().len() + 1,
        min: 1,
        max: Some(self.total_capacity(capacity)),
      })?;
      let fresh = self.create_mirror_node(plan, *m);
      plan.add_child(parent, fresh, &[ty], &[(ty, head)]);
      self.base.register(fresh);
    }
    Ok(())
  }
}

impl Substructure for DepthLimitTreeStructure {
  fn base(&self) -> &StructureBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut StructureBase {
    &mut self.base
  }

  fn build_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, count: usize) -> Result<NodeIndex> {
    let capacity = Self::capacity(net);
    if count < 1 || count > self.total_capacity(capacity) {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::DepthLimitTree,
        requested: count,
        min: 1,
        max: Some(self.total_capacity(capacity)),
      });
    }
    let mirrors = pull_mirrors(net, count)?;
    let head = self.create_mirror_node(plan, mirrors[0]);
    plan.get_mut(head).unwrap().set_head(StructureType::DepthLimitTree, true);
    self.base.register(head);
    self.base.set_root(Some(head));
    self.fill(plan, &mirrors[1..], head, capacity)?;
    Ok(head)
  }

  fn add_nodes_to_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, mirrors: &[MirrorId]) -> Result<usize> {
    let head = self.base.root().ok_or(TopologyError::StructureInvariantViolation {
      structure: StructureType::DepthLimitTree,
    })?;
    let capacity = Self::capacity(net);
    if self.base.nodes().len() + mirrors.len() > self.total_capacity(capacity) {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::DepthLimitTree,
        requested: self.base.nodes().len() + mirrors.len(),
        min: 1,
        max: Some(self.total_capacity(capacity)),
      });
    }
    self.fill(plan, mirrors, head, capacity)?;
    Ok(mirrors.len())
  }

  fn remove_nodes_from_structure(&mut self, plan: &mut PlanGraph, _net: &mut Network, count: usize) -> Result<RemovedNodes> {
    let n = self.base.nodes().len();
    if n < count || n - count < 1 {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::DepthLimitTree,
        requested: n.saturating_sub(count),
        min: 1,
        max: None,
      });
    }
    let head = self.base.root().unwrap();
    let mut removed = RemovedNodes::default();
    for _ in 0..count {
      let victim = self
        .base
        .nodes_in_id_order()
        .into_iter()
        .filter(|l| *l != head && self.is_leaf(plan, *l))
        .max_by_key(|l| (self.depth_of(plan, *l), *l))
        .ok_or(TopologyError::StructureInvariantViolation {
          structure: StructureType::DepthLimitTree,
        })?;
      if let Some(mirror) = plan.remove_node_from_plan(victim, &[StructureType::DepthLimitTree]) {
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
        plan.count_heads(&members, StructureType::DepthLimitTree) == 1
          && plan.collect_structure(StructureType::DepthLimitTree, root).len() == members.len()
          && self.max_depth_in_tree(plan) <= self.max_depth()
      }
    }
  }

  fn expected_links(&self, n: usize, _links_per_mirror: usize) -> usize {
    n.saturating_sub(1)
  }
}
