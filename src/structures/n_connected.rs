use crate::config::StructureProperties;
use crate::error::{Result, TopologyError};
use crate::mirror::MirrorId;
use crate::network::Network;
use crate::node::{NodeIndex, PlanGraph, StructureType};

use super::{pull_mirrors, RemovedNodes, StructureBase, Substructure};

/// A d-regular overlay.
///
/// With `n >= 2d` mirrors the plan is the deterministic circulant graph
/// (each node linked to its `d/2` nearest successors, plus diameter edges
/// when the degree is odd); smaller networks fall back to the complete
/// graph. Resizing replans the adjacency over the surviving node set and
/// lets reconciliation diff the links, since adding nodes one at a time to a
/// saturated regular graph could never restore regularity.
#[derive(Debug)]
pub struct NConnectedStructure {
  base: StructureBase,
}

impl NConnectedStructure {
  pub fn new(props: &StructureProperties) -> Self {
    NConnectedStructure { base: StructureBase::new(StructureType::NConnected, props) }
  }

  fn degree(&self, links_per_mirror: usize) -> usize {
    self.base.props().target_links_per_node.unwrap_or(links_per_mirror).max(1)
  }

  pub fn degree_of(&self, plan: &PlanGraph, n: NodeIndex) -> usize {
    plan.typed_degree(StructureType::NConnected, n)
  }

  /// A 1-regular overlay beyond a single pair cannot be connected.
  fn check_degree_feasible(&self, d: usize, n: usize) -> Result<()> {
    if d == 1 && n > 2 {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::NConnected,
        requested: n,
        min: 1,
        max: Some(2),
      });
    }
    Ok(())
  }

  /// Replace the planned adjacency with the canonical shape for the
  /// current member set. Existing planned edges that survive are re-added
  /// verbatim, so reconciliation leaves their links alone.
  fn replan(&mut self, plan: &mut PlanGraph, d: usize) {
    let ty = StructureType::NConnected;
    let members = self.base.nodes_in_id_order();
    plan.remove_structure_head(&members, ty);
    let k = members.len();
    if k == 0 {
      return;
    }
    let head = members[0];
    for n in &members {
      if let Some(node) = plan.get_mut(*n) {
        node.add_node_type(ty);
      }
    }
    plan.get_mut(head).unwrap().set_head(ty, true);
    self.base.set_root(Some(head));
    if k == 1 {
      return;
    }
    if k >= 2 * d {
      // Circulant ring-of-chords: i -> i+1 .. i+d/2, wrap-around.
      for j in 1..=(d / 2) {
        for i in 0..k {
          plan.add_child(members[i], members[(i + j) % k], &[ty], &[(ty, head)]);
        }
      }
      if d % 2 == 1 {
        for i in 0..k / 2 {
          plan.add_child(members[i], members[i + k / 2], &[ty], &[(ty, head)]);
        }
      }
    } else {
      for i in 0..k {
        for j in (i + 1)..k {
          plan.add_child(members[i], members[j], &[ty], &[(ty, head)]);
        }
      }
    }
  }
}

impl Substructure for NConnectedStructure {
  fn base(&self) -> &StructureBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut StructureBase {
    &mut self.base
  }

  fn build_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, count: usize) -> Result<NodeIndex> {
    if count < 1 {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::NConnected,
        requested: count,
        min: 1,
        max: None,
      });
    }
    let d = self.degree(net.num_target_links_per_mirror());
    self.check_degree_feasible(d, count)?;
    let mirrors = pull_mirrors(net, count)?;
    for m in mirrors {
      let fresh = self.create_mirror_node(plan, m);
      self.base.register(fresh);
    }
    self.replan(plan, d);
    Ok(self.base.root().unwrap())
  }

  fn add_nodes_to_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, mirrors: &[MirrorId]) -> Result<usize> {
    let d = self.degree(net.num_target_links_per_mirror());
    self.check_degree_feasible(d, self.base.nodes().len() + mirrors.len())?;
    for m in mirrors {
      let fresh = self.create_mirror_node(plan, *m);
      self.base.register(fresh);
    }
    self.replan(plan, d);
    Ok(mirrors.len())
  }

  fn remove_nodes_from_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, count: usize) -> Result<RemovedNodes> {
    let n = self.base.nodes().len();
    if n < count || n - count < 1 {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::NConnected,
        requested: n.saturating_sub(count),
        min: 1,
        max: None,
      });
    }
    let ty = StructureType::NConnected;
    let head = self.base.root().ok_or(TopologyError::StructureInvariantViolation { structure: ty })?;
    let mut removed = RemovedNodes::default();
    for _ in 0..count {
      // Lowest plan degree first, highest id breaking ties.
      let victim = self
        .base
        .nodes_in_id_order()
        .into_iter()
        .filter(|x| *x != head)
        .min_by_key(|x| (self.degree_of(plan, *x), std::cmp::Reverse(*x)))
        .ok_or(TopologyError::StructureInvariantViolation { structure: ty })?;
      if let Some(mirror) = plan.remove_node_from_plan(victim, &[ty]) {
        removed.mirrors.push(mirror);
      }
      self.base.unregister(victim);
      removed.nodes.push(victim);
    }
    let d = self.degree(net.num_target_links_per_mirror());
    self.replan(plan, d);
    Ok(removed)
  }

  fn validate_topology(&self, plan: &PlanGraph) -> bool {
    let members = self.base.nodes_in_id_order();
    match self.base.root() {
      None => members.is_empty(),
      Some(root) => {
        plan.count_heads(&members, StructureType::NConnected) == 1
          && plan.collect_structure(StructureType::NConnected, root).len() == members.len()
      }
    }
  }

  fn expected_links(&self, n: usize, links_per_mirror: usize) -> usize {
    let d = self.degree(links_per_mirror);
    if n >= 2 * d {
      n * d / 2
    } else {
      n * n.saturating_sub(1) / 2
    }
  }
}
