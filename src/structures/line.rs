use crate::config::StructureProperties;
use crate::error::{Result, TopologyError};
use crate::mirror::MirrorId;
use crate::network::Network;
use crate::node::{NodeIndex, PlanGraph, StructureType};

use super::{pull_mirrors, RemovedNodes, StructureBase, Substructure};

/// A path of mirrors. The head is one endpoint; growth and shrink both
/// happen at the other.
#[derive(Debug)]
pub struct LineStructure {
  base: StructureBase,
}

impl LineStructure {
  pub fn new(props: &StructureProperties) -> Self {
    LineStructure { base: StructureBase::new(StructureType::Line, props) }
  }

  fn min_size(&self) -> usize {
    self.base.props().min_line_size.max(2)
  }

  /// The endpoint opposite the head.
  pub fn tail(&self, plan: &PlanGraph) -> Option<NodeIndex> {
    let mut at = self.base.root()?;
    let n = self.base.nodes().len();
    for _ in 0..n {
      match plan.typed_children(StructureType::Line, at).first() {
        Some(next) => at = *next,
        None => return Some(at),
      }
    }
    Some(at)
  }

  /// Both endpoints, head first.
  pub fn endpoints(&self, plan: &PlanGraph) -> Option<(NodeIndex, NodeIndex)> {
    Some((self.base.root()?, self.tail(plan)?))
  }

  /// The path in walk order, head first.
  pub fn line_order(&self, plan: &PlanGraph) -> Vec<NodeIndex> {
    let mut out = Vec::new();
    let mut at = match self.base.root() {
      Some(h) => h,
      None => return out,
    };
    let n = self.base.nodes().len();
    for _ in 0..n {
      out.push(at);
      match plan.typed_children(StructureType::Line, at).first() {
        Some(next) => at = *next,
        None => break,
      }
    }
    out
  }
}

impl Substructure for LineStructure {
  fn base(&self) -> &StructureBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut StructureBase {
    &mut self.base
  }

  fn build_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, count: usize) -> Result<NodeIndex> {
    if count < self.min_size() {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::Line,
        requested: count,
        min: self.min_size(),
        max: None,
      });
    }
    let mirrors = pull_mirrors(net, count)?;
    let nodes: Vec<NodeIndex> = mirrors.iter().map(|m| self.create_mirror_node(plan, *m)).collect();
    let head = nodes[0];
    plan.get_mut(head).unwrap().set_head(StructureType::Line, true);
    for w in nodes.windows(2) {
      plan.add_child(w[0], w[1], &[StructureType::Line], &[(StructureType::Line, head)]);
    }
    for n in nodes {
      self.base.register(n);
    }
    self.base.set_root(Some(head));
    Ok(head)
  }

  fn add_nodes_to_structure(&mut self, plan: &mut PlanGraph, _net: &mut Network, mirrors: &[MirrorId]) -> Result<usize> {
    let head = self.base.root().ok_or(TopologyError::StructureInvariantViolation {
      structure: StructureType::Line,
    })?;
    let mut added = 0;
    for m in mirrors {
      let tail = self.tail(plan).ok_or(TopologyError::StructureInvariantViolation {
        structure: StructureType::Line,
      })?;
      let fresh = self.create_mirror_node(plan, *m);
      plan.add_child(tail, fresh, &[StructureType::Line], &[(StructureType::Line, head)]);
      self.base.register(fresh);
      added += 1;
    }
    Ok(added)
  }

  fn remove_nodes_from_structure(&mut self, plan: &mut PlanGraph, _net: &mut Network, count: usize) -> Result<RemovedNodes> {
    let n = self.base.nodes().len();
    if n < count || n - count < self.min_size() {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::Line,
        requested: n.saturating_sub(count),
        min: self.min_size(),
        max: None,
      });
    }
    let mut removed = RemovedNodes::default();
    for _ in 0..count {
      // The endpoint opposite the head is never the head itself as long
      // as the minimum size holds.
      let victim = self.tail(plan).ok_or(TopologyError::StructureInvariantViolation {
        structure: StructureType::Line,
      })?;
      if let Some(mirror) = plan.remove_node_from_plan(victim, &[StructureType::Line]) {
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
      Some(_) => {
        plan.count_heads(&members, StructureType::Line) == 1
          && self.line_order(plan).len() == members.len()
      }
    }
  }

  fn expected_links(&self, n: usize, _links_per_mirror: usize) -> usize {
    if n >= 2 {
      n - 1
    } else {
      0
    }
  }
}
