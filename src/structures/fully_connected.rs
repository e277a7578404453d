use crate::config::StructureProperties;
use crate::error::{Result, TopologyError};
use crate::mirror::MirrorId;
use crate::network::Network;
use crate::node::{NodeIndex, PlanGraph, StructureType};

use super::{pull_mirrors, RemovedNodes, StructureBase, Substructure};

/// The complete graph over all member mirrors.
#[derive(Debug)]
pub struct FullyConnectedStructure {
  base: StructureBase,
}

impl FullyConnectedStructure {
  pub fn new(props: &StructureProperties) -> Self {
    FullyConnectedStructure { base: StructureBase::new(StructureType::FullyConnected, props) }
  }
}

impl Substructure for FullyConnectedStructure {
  fn base(&self) -> &StructureBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut StructureBase {
    &mut self.base
  }

  fn build_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, count: usize) -> Result<NodeIndex> {
    if count < 1 {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::FullyConnected,
        requested: count,
        min: 1,
        max: None,
      });
    }
    let ty = StructureType::FullyConnected;
    let mirrors = pull_mirrors(net, count)?;
    let nodes: Vec<NodeIndex> = mirrors.iter().map(|m| self.create_mirror_node(plan, *m)).collect();
    let head = nodes[0];
    plan.get_mut(head).unwrap().set_head(ty, true);
    for i in 0..count {
      for j in (i + 1)..count {
        plan.add_child(nodes[i], nodes[j], &[ty], &[(ty, head)]);
      }
    }
    for n in nodes {
      self.base.register(n);
    }
    self.base.set_root(Some(head));
    Ok(head)
  }

  fn add_nodes_to_structure(&mut self, plan: &mut PlanGraph, _net: &mut Network, mirrors: &[MirrorId]) -> Result<usize> {
    let ty = StructureType::FullyConnected;
    let head = self.base.root().ok_or(TopologyError::StructureInvariantViolation { structure: ty })?;
    for m in mirrors {
      let existing = self.base.nodes_in_id_order();
      let fresh = self.create_mirror_node(plan, *m);
      for e in existing {
        plan.add_child(e, fresh, &[ty], &[(ty, head)]);
      }
      self.base.register(fresh);
    }
    Ok(mirrors.len())
  }

  fn remove_nodes_from_structure(&mut self, plan: &mut PlanGraph, _net: &mut Network, count: usize) -> Result<RemovedNodes> {
    let n = self.base.nodes().len();
    if n < count || n - count < 1 {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::FullyConnected,
        requested: n.saturating_sub(count),
        min: 1,
        max: None,
      });
    }
    let ty = StructureType::FullyConnected;
    let head = self.base.root().ok_or(TopologyError::StructureInvariantViolation { structure: ty })?;
    let mut removed = RemovedNodes::default();
    for _ in 0..count {
      let victim = *self
        .base
        .nodes_in_id_order()
        .iter()
        .rev()
        .find(|x| **x != head)
        .expect("fully connected below minimum size");
      if let Some(mirror) = plan.remove_node_from_plan(victim, &[ty]) {
        removed.mirrors.push(mirror);
      }
      self.base.unregister(victim);
      removed.nodes.push(victim);
    }
    Ok(removed)
  }

  fn validate_topology(&self, plan: &PlanGraph) -> bool {
    let ty = StructureType::FullyConnected;
    let members = self.base.nodes_in_id_order();
    match self.base.root() {
      None => members.is_empty(),
      Some(_) => {
        plan.count_heads(&members, ty) == 1
          && members
            .iter()
            .all(|a| members.iter().all(|b| a == b || plan.planned_edge(*a, *b, ty)))
      }
    }
  }

  fn expected_links(&self, n: usize, _links_per_mirror: usize) -> usize {
    n * n.saturating_sub(1) / 2
  }
}
