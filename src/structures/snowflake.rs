use log::{debug, trace};

use crate::config::StructureProperties;
use crate::error::{Result, TopologyError};
use crate::mirror::MirrorId;
use crate::network::Network;
use crate::node::{NodeIndex, PlanGraph, StructureType};

use super::ring::RingStructure;
use super::{graft, pull_mirrors, sever, strategy_for, RemovedNodes, StructureBase, Substructure};

/// How a snowflake splits a mirror total between its central ring and the
/// external substructures bridged onto it.
///
/// Pure arithmetic: the external share is `floor(total * ratio)`, the ring
/// takes the rest so no mirror is lost to rounding. Every `gap`-th ring
/// position is an attachment candidate; the external share is spread over
/// the candidates evenly, rounded down, the remainder topped up one mirror
/// at a time from the front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnowflakeLayout {
  pub ring_mirrors: usize,
  pub external_mirrors: usize,
  /// One entry per ring position; non-zero only at attachment positions.
  pub attachment_counts: Vec<usize>,
}

impl SnowflakeLayout {
  pub fn compute(total: usize, ratio: f64, gap: usize) -> SnowflakeLayout {
    let external = (total as f64 * ratio).floor() as usize;
    let ring = total - external;
    let mut counts = vec![0usize; ring];
    if ring > 0 && gap > 0 && external > 0 {
      let positions: Vec<usize> = (0..ring).step_by(gap).collect();
      let mut per = (external * gap) / ring;
      while per > 0 && per * positions.len() > external {
        per -= 1;
      }
      for p in &positions {
        counts[*p] = per;
      }
      let mut rem = external - per * positions.len();
      let mut i = 0;
      while rem > 0 {
        counts[positions[i % positions.len()]] += 1;
        rem -= 1;
        i += 1;
      }
    }
    SnowflakeLayout { ring_mirrors: ring, external_mirrors: external, attachment_counts: counts }
  }

  /// `(ring position, mirror count)` for every position that actually
  /// receives an attachment, in position order.
  pub fn occupied(&self) -> Vec<(usize, usize)> {
    self
      .attachment_counts
      .iter()
      .enumerate()
      .filter(|(_, c)| **c > 0)
      .map(|(i, c)| (i, *c))
      .collect()
  }

  pub fn num_attachments(&self) -> usize {
    self.attachment_counts.iter().filter(|c| **c > 0).count()
  }
}

struct ExternalAttachment {
  host: NodeIndex,
  planner: Box<dyn Substructure>,
}

/// The composite: a central ring with external substructures grafted onto
/// every `gap`-th ring position, cycling through the configured rotation
/// of structure types.
///
/// Every resize runs the detach–replan–reattach protocol: all externals
/// and the ring are severed, the new layout is computed, each piece is
/// resized (freed mirrors are recycled through the cursor before fresh
/// ones are drawn), and everything is grafted back in position order.
/// Surplus externals are retired outright.
pub struct SnowflakeStructure {
  base: StructureBase,
  ring: RingStructure,
  externals: Vec<ExternalAttachment>,
}

impl SnowflakeStructure {
  pub fn new(props: &StructureProperties) -> Self {
    SnowflakeStructure {
      base: StructureBase::new(StructureType::Snowflake, props),
      ring: RingStructure::new(props),
      externals: Vec::new(),
    }
  }

  fn min_ring(&self) -> usize {
    self.base.props().min_ring_size.max(3)
  }

  fn gap(&self) -> usize {
    self.base.props().ring_bridge_gap.max(1)
  }

  fn layout_for(&self, total: usize) -> SnowflakeLayout {
    SnowflakeLayout::compute(total, self.base.props().external_structure_ratio, self.gap())
  }

  /// The rotation type of the `ordinal`-th occupied attachment.
  fn rotation_type(&self, ordinal: usize) -> StructureType {
    let rotation = &self.base.props().substructure_rotation;
    rotation[ordinal % rotation.len()]
  }

  pub fn layout(&self) -> SnowflakeLayout {
    self.layout_for(self.base.nodes().len())
  }

  pub fn ring(&self) -> &RingStructure {
    &self.ring
  }

  pub fn num_externals(&self) -> usize {
    self.externals.len()
  }

  /// `(host ring node, external root)` pairs in attachment order.
  pub fn attachments(&self) -> Vec<(NodeIndex, NodeIndex)> {
    self
      .externals
      .iter()
      .filter_map(|a| a.planner.root().map(|r| (a.host, r)))
      .collect()
  }

  /// Graft the resized pieces back: ring first (adoption), then each
  /// external onto its gap position in ring id order.
  fn reattach(
    &mut self, plan: &mut PlanGraph, layout: &SnowflakeLayout, planners: Vec<Box<dyn Substructure>>,
  ) -> Result<()> {
    graft(plan, &mut self.base, None, &self.ring)?;
    let ring_nodes = self.ring.base().nodes_in_id_order();
    let gap = self.gap();
    self.externals.clear();
    let mut queue = std::collections::VecDeque::from(planners);
    for (i, host) in ring_nodes.iter().enumerate() {
      if i % gap != 0 || layout.attachment_counts[i] == 0 {
        continue;
      }
      let planner = queue.pop_front().ok_or(TopologyError::StructureInvariantViolation {
        structure: StructureType::Snowflake,
      })?;
      graft(plan, &mut self.base, Some(*host), planner.as_ref())?;
      self.externals.push(ExternalAttachment { host: *host, planner });
    }
    debug_assert!(queue.is_empty(), "attachment slots and planners diverged");
    Ok(())
  }

  /// The detach–replan–reattach engine shared by grow and shrink.
  fn resize(&mut self, plan: &mut PlanGraph, net: &mut Network, new_total: usize) -> Result<RemovedNodes> {
    let layout = self.layout_for(new_total);
    if layout.ring_mirrors < self.min_ring() {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::Snowflake,
        requested: new_total,
        min: self.min_ring(),
        max: None,
      });
    }
    debug!(
      "snowflake resize to {} mirrors: ring {}, external {}",
      new_total, layout.ring_mirrors, layout.external_mirrors
    );

    // Detach everything, externals before the ring they hang off.
    let mut planners: Vec<Box<dyn Substructure>> =
      self.externals.drain(..).map(|a| a.planner).collect();
    for child in &planners {
      sever(plan, &mut self.base, child.as_ref())?;
    }
    sever(plan, &mut self.base, &self.ring)?;
    self.base.set_root(None);

    let occupied = layout.occupied();
    let mut removed = RemovedNodes::default();

    // Shrink pass: free mirrors back into the cursor before anything grows.
    let ring_now = self.ring.structure_nodes().len();
    if layout.ring_mirrors < ring_now {
      let r = self.ring.remove_nodes_from_structure(plan, net, ring_now - layout.ring_mirrors)?;
      for m in &r.mirrors {
        net.recycle_mirror(*m);
      }
      removed.merge(r);
    }
    for (i, child) in planners.iter_mut().enumerate() {
      if i < occupied.len() {
        let target = occupied[i].1;
        let current = child.structure_nodes().len();
        if target < current {
          let r = child.remove_nodes_from_structure(plan, net, current - target)?;
          for m in &r.mirrors {
            net.recycle_mirror(*m);
          }
          removed.merge(r);
        }
      } else {
        // Surplus attachment: retired wholesale.
        trace!("retiring surplus external {:?}", child.root());
        let members: Vec<NodeIndex> = child.structure_nodes().iter().copied().collect();
        for n in &members {
          if let Some(m) = plan.mirror_of(*n) {
            net.recycle_mirror(m);
            removed.mirrors.push(m);
          }
          removed.nodes.push(*n);
        }
        child.teardown_plan(plan);
      }
    }
    planners.truncate(occupied.len());

    // Grow pass, recycled mirrors first by cursor construction.
    if layout.ring_mirrors > ring_now {
      let mirrors = pull_mirrors(net, layout.ring_mirrors - ring_now)?;
      self.ring.add_nodes_to_structure(plan, net, &mirrors)?;
    }
    for (i, child) in planners.iter_mut().enumerate() {
      let target = occupied[i].1;
      let current = child.structure_nodes().len();
      if target > current {
        let mirrors = pull_mirrors(net, target - current)?;
        child.add_nodes_to_structure(plan, net, &mirrors)?;
      }
    }
    // Positions beyond the old attachment list get fresh substructures,
    // the rotation continuing where it left off.
    for ordinal in planners.len()..occupied.len() {
      let ty = self.rotation_type(ordinal);
      let mut child = strategy_for(ty, self.base.props()).ok_or_else(|| {
        TopologyError::InvalidProperties {
          reason: format!("rotation names {} which has no planner", ty),
        }
      })?;
      child.build_structure(plan, net, occupied[ordinal].1)?;
      planners.push(child);
    }

    self.reattach(plan, &layout, planners)?;
    Ok(removed)
  }
}

impl Substructure for SnowflakeStructure {
  fn base(&self) -> &StructureBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut StructureBase {
    &mut self.base
  }

  fn build_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, count: usize) -> Result<NodeIndex> {
    let props = self.base.props().clone();
    let layout = self.layout_for(count);
    if layout.ring_mirrors < self.min_ring() {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::Snowflake,
        requested: count,
        min: self.min_ring(),
        max: None,
      });
    }
    self.ring = RingStructure::new(&props);
    self.ring.build_structure(plan, net, layout.ring_mirrors)?;
    graft(plan, &mut self.base, None, &self.ring)?;

    let ring_nodes = self.ring.base().nodes_in_id_order();
    let gap = self.gap();
    self.externals.clear();
    let mut ordinal = 0;
    for (i, host) in ring_nodes.iter().enumerate() {
      if i % gap != 0 || layout.attachment_counts[i] == 0 {
        continue;
      }
      let ty = self.rotation_type(ordinal);
      let mut child = strategy_for(ty, &props).ok_or_else(|| TopologyError::InvalidProperties {
        reason: format!("rotation names {} which has no planner", ty),
      })?;
      child.build_structure(plan, net, layout.attachment_counts[i])?;
      graft(plan, &mut self.base, Some(*host), child.as_ref())?;
      self.externals.push(ExternalAttachment { host: *host, planner: child });
      ordinal += 1;
    }
    debug!(
      "snowflake built: ring {}, {} externals, {} mirrors total",
      layout.ring_mirrors,
      self.externals.len(),
      count
    );
    Ok(self.base.root().unwrap())
  }

  fn add_nodes_to_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, mirrors: &[MirrorId]) -> Result<usize> {
    let new_total = self.base.nodes().len() + mirrors.len();
    self.resize(plan, net, new_total)?;
    Ok(mirrors.len())
  }

  fn remove_nodes_from_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, count: usize) -> Result<RemovedNodes> {
    let total = self.base.nodes().len();
    if total < count {
      return Err(TopologyError::InfeasibleSize {
        structure: StructureType::Snowflake,
        requested: total.saturating_sub(count),
        min: self.min_ring(),
        max: None,
      });
    }
    self.resize(plan, net, total - count)
  }

  fn validate_topology(&self, plan: &PlanGraph) -> bool {
    if self.base.root().is_none() {
      return self.base.nodes().is_empty();
    }
    if !self.ring.validate_topology(plan) {
      return false;
    }
    for a in &self.externals {
      if !a.planner.validate_topology(plan) {
        return false;
      }
    }
    let members = self.base.nodes_in_id_order();
    plan.count_heads(&members, StructureType::Snowflake) == 1
  }

  fn expected_links(&self, n: usize, links_per_mirror: usize) -> usize {
    let props = self.base.props();
    let layout = self.layout_for(n);
    let mut total = match strategy_for(StructureType::Ring, props) {
      Some(ring) => ring.expected_links(layout.ring_mirrors, links_per_mirror),
      None => 0,
    };
    for (ordinal, (_, count)) in layout.occupied().iter().enumerate() {
      if let Some(child) = strategy_for(self.rotation_type(ordinal), props) {
        total += child.expected_links(*count, links_per_mirror);
      }
      // One bridge link per occupied attachment position.
      total += 1;
    }
    total
  }

  fn teardown_plan(&mut self, plan: &mut PlanGraph) {
    let planners: Vec<Box<dyn Substructure>> = self.externals.drain(..).map(|a| a.planner).collect();
    for child in &planners {
      let _ = sever(plan, &mut self.base, child.as_ref());
    }
    let _ = sever(plan, &mut self.base, &self.ring);
    for mut child in planners {
      child.teardown_plan(plan);
    }
    self.ring.teardown_plan(plan);
    let base = self.base_mut();
    base.nodes.clear();
    base.root = None;
  }
}
