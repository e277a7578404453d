use crate::config::StructureProperties;
use crate::error::{Result, TopologyError};
use crate::mirror::MirrorId;
use crate::network::Network;
use crate::node::{NodeIndex, PlanGraph, StructureType};

use super::{pull_mirrors, RemovedNodes, StructureBase, Substructure};

/// One center mirror with every other member attached as a leaf. The
/// center is the head; it is the one node a shrink never selects.
#[derive(Debug)]
pub struct StarStructure {
  base: StructureBase,
}

impl StarStructure {
  pub fn new(props: &StructureProperties) -> Self {
    StarStructure { base: StructureBase::new(StructureType::Star, props) }
  }

  pub fn center(&self) -> Option<NodeIndex> {
    self.base.root()
  }

  pub fn leaves(&self, plan: &PlanGraph) -> Vec<NodeIndex> {
    match self.base.root() {
      Some(center) => plan.typed_children(StructureType::Star, center),
      None => Vec::new(),
    }
  }
}

impl Substructure for StarStructure {
  fn base(&self) -> &StructureBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut StructureBase {
    &mut self.base
  }

  fn build_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, count: usize) -> Result<NodeIndex> {
    if count < 1 {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::Star,
        requested: count,
        min: 1,
        max: None,
      });
    }
    let ty = StructureType::Star;
    let mirrors = pull_mirrors(net, count)?;
    let center = self.create_mirror_node(plan, mirrors[0]);
    plan.get_mut(center).unwrap().set_head(ty, true);
    self.base.register(center);
    self.base.set_root(Some(center));
    for m in &mirrors[1..] {
      let leaf = self.create_mirror_node(plan, *m);
      plan.add_child(center, leaf, &[ty], &[(ty, center)]);
      self.base.register(leaf);
    }
    Ok(center)
  }

  fn add_nodes_to_structure(&mut self, plan: &mut PlanGraph, _net: &mut Network, mirrors: &[MirrorId]) -> Result<usize> {
    let ty = StructureType::Star;
    let center = self.base.root().ok_or(TopologyError::StructureInvariantViolation { structure: ty })?;
    for m in mirrors {
      let leaf = self.create_mirror_node(plan, *m);
      plan.add_child(center, leaf, &[ty], &[(ty, center)]);
      self.base.register(leaf);
    }
    Ok(mirrors.len())
  }

  fn remove_nodes_from_structure(&mut self, plan: &mut PlanGraph, _net: &mut Network, count: usize) -> Result<RemovedNodes> {
    let n = self.base.nodes().len();
    if n < count || n - count < 1 {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::Star,
        requested: n.saturating_sub(count),
        min: 1,
        max: None,
      });
    }
    let ty = StructureType::Star;
    let mut removed = RemovedNodes::default();
    for _ in 0..count {
      let victim = self
        .leaves(plan)
        .into_iter()
        .max()
        .ok_or(TopologyError::StructureInvariantViolation { structure: ty })?;
      if let Some(mirror) = plan.remove_node_from_plan(victim, &[ty]) {
        removed.mirrors.push(mirror);
      }
      self.base.unregister(victim);
      removed.nodes.push(victim);
    }
    Ok(removed)
  }

  fn validate_topology(&self, plan: &PlanGraph) -> bool {
    let ty = StructureType::Star;
    let members = self.base.nodes_in_id_order();
    match self.base.root() {
      None => members.is_empty(),
      Some(center) => {
        plan.count_heads(&members, ty) == 1
          && plan.typed_children(ty, center).len() == members.len() - 1
      }
    }
  }

  fn expected_links(&self, n: usize, _links_per_mirror: usize) -> usize {
    n.saturating_sub(1)
  }
}
