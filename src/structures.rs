//! The substructure framework.
//!
//! A substructure is a planner for one wiring pattern. It mutates only the
//! node graph (the planning plane); concrete links materialize exclusively
//! through [`build_and_update_links`], which diffs the plan against the
//! live link set (the execution plane). Composites attach whole
//! substructures to host nodes via [`graft`] and detach them via
//! [`sever`], both preserving the typed-membership invariant: a node may
//! belong to several nested structures at once, one type tag each.

use log::{debug, trace};
use ordermap::OrderSet;

use itertools::Itertools;

use crate::action::TopologyAction;
use crate::config::StructureProperties;
use crate::error::{Result, TopologyError};
use crate::mirror::{LinkId, MirrorId};
use crate::network::Network;
use crate::node::{NodeIndex, PlanGraph, StructureType};

pub mod balanced_tree;
pub mod depth_limit_tree;
pub mod fully_connected;
pub mod line;
pub mod n_connected;
pub mod ring;
pub mod snowflake;
pub mod star;
pub mod tree;

pub use balanced_tree::BalancedTreeStructure;
pub use depth_limit_tree::DepthLimitTreeStructure;
pub use fully_connected::FullyConnectedStructure;
pub use line::LineStructure;
pub use n_connected::NConnectedStructure;
pub use ring::RingStructure;
pub use snowflake::{SnowflakeLayout, SnowflakeStructure};
pub use star::StarStructure;
pub use tree::TreeStructure;

/// Common state of every planner: its type tag, the current root, the set
/// of locally managed nodes, and the properties it was configured with.
#[derive(Debug, Clone)]
pub struct StructureBase {
  structure_type: StructureType,
  root: Option<NodeIndex>,
  nodes: OrderSet<NodeIndex>,
  props: StructureProperties,
}

impl StructureBase {
  pub fn new(structure_type: StructureType, props: &StructureProperties) -> Self {
    StructureBase {
      structure_type,
      root: None,
      nodes: OrderSet::new(),
      props: props.clone(),
    }
  }

  pub fn structure_type(&self) -> StructureType {
    self.structure_type
  }

  pub fn root(&self) -> Option<NodeIndex> {
    self.root
  }

  pub fn nodes(&self) -> &OrderSet<NodeIndex> {
    &self.nodes
  }

  pub fn props(&self) -> &StructureProperties {
    &self.props
  }

  pub(crate) fn set_root(&mut self, root: Option<NodeIndex>) {
    self.root = root;
  }

  pub(crate) fn register(&mut self, node: NodeIndex) {
    self.nodes.insert(node);
  }

  pub(crate) fn unregister(&mut self, node: NodeIndex) {
    self.nodes.remove(&node);
  }

  pub(crate) fn set_props(&mut self, props: &StructureProperties) {
    self.props = props.clone();
  }

  /// Nodes in ascending id order, the walk order composites use.
  pub fn nodes_in_id_order(&self) -> Vec<NodeIndex> {
    let mut v: Vec<NodeIndex> = self.nodes.iter().copied().collect();
    v.sort();
    v
  }
}

/// Victims of a shrink step: the destroyed plan nodes and the mirrors they
/// freed. Freed mirrors stay usable until a shutdown pass or a recycling
/// composite claims them.
#[derive(Debug, Default)]
pub struct RemovedNodes {
  pub nodes: Vec<NodeIndex>,
  pub mirrors: Vec<MirrorId>,
}

impl RemovedNodes {
  pub fn merge(&mut self, other: RemovedNodes) {
    self.nodes.extend(other.nodes);
    self.mirrors.extend(other.mirrors);
  }
}

/// One topology planner.
///
/// The required hooks cover planning only; the provided lifecycle drivers
/// (`init_network`, `restart_network`, `handle_add_new_mirrors`,
/// `handle_remove_mirrors`) wrap them with mirror allocation, link
/// reconciliation and the shutdown of mirrors nothing references anymore.
pub trait Substructure {
  fn base(&self) -> &StructureBase;
  fn base_mut(&mut self) -> &mut StructureBase;

  /// Plan the structure for `count` nodes, drawing mirrors from the
  /// network cursor in order. Touches the node graph only.
  fn build_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, count: usize) -> Result<NodeIndex>;

  /// Wire already-created mirrors into the structure at the strategy's
  /// admissible attachment points. Returns the number of nodes added.
  fn add_nodes_to_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, mirrors: &[MirrorId]) -> Result<usize>;

  /// Select and detach `count` victims by the strategy's rule. Fails
  /// without mutating when the result would drop below the minimum size.
  /// Composites recycle the freed mirrors through the network cursor.
  fn remove_nodes_from_structure(&mut self, plan: &mut PlanGraph, net: &mut Network, count: usize) -> Result<RemovedNodes>;

  /// Structural self-check; used as a gate after every mutation.
  fn validate_topology(&self, plan: &PlanGraph) -> bool;

  /// The pure link-count formula for `n` nodes under the given per-mirror
  /// budget. Predictions and target queries are arithmetic, never
  /// simulation.
  fn expected_links(&self, n: usize, links_per_mirror: usize) -> usize;

  /// Node factory; strategies with specialized node flavors override this.
  fn create_mirror_node(&self, plan: &mut PlanGraph, mirror: MirrorId) -> NodeIndex {
    plan.insert_node(self.structure_type(), Some(mirror))
  }

  fn structure_type(&self) -> StructureType {
    self.base().structure_type()
  }

  fn root(&self) -> Option<NodeIndex> {
    self.base().root()
  }

  fn structure_nodes(&self) -> &OrderSet<NodeIndex> {
    self.base().nodes()
  }

  /// Forget this planner's portion of the plan. The leaf default strips
  /// the strategy's own type from each managed node; composites override
  /// to recurse into their children first.
  fn teardown_plan(&mut self, plan: &mut PlanGraph) {
    let ty = self.structure_type();
    let members: Vec<NodeIndex> = self.base().nodes().iter().copied().collect();
    for n in members {
      plan.remove_node_from_plan(n, &[ty]);
    }
    let base = self.base_mut();
    base.nodes.clear();
    base.root = None;
  }

  /// Expected link count for the current configuration.
  fn num_target_links(&self, net: &Network) -> usize {
    let n = if self.base().nodes().is_empty() {
      net.num_usable_mirrors()
    } else {
      self.base().nodes().len()
    };
    self.expected_links(n, net.num_target_links_per_mirror())
  }

  /// Expected link count after `action`, computed by formula without any
  /// mutation. An action this strategy cannot interpret (a topology change
  /// to a type the factory does not build) falls back to the current
  /// target count; it never fails.
  fn predicted_num_target_links(&self, net: &Network, action: &TopologyAction) -> usize {
    let n = if self.base().nodes().is_empty() {
      net.num_usable_mirrors()
    } else {
      self.base().nodes().len()
    };
    match action {
      TopologyAction::MirrorChange { new_mirror_count, .. } => {
        self.expected_links(*new_mirror_count, net.num_target_links_per_mirror())
      }
      TopologyAction::TargetLinkChange { new_links_per_mirror } => {
        self.expected_links(n, *new_links_per_mirror)
      }
      TopologyAction::TopologyChange { target } => match strategy_for(*target, self.base().props()) {
        Some(next) => next.expected_links(n, net.num_target_links_per_mirror()),
        None => self.num_target_links(net),
      },
    }
  }

  /// Build the structure over every usable mirror of the network and
  /// reconcile the links. Returns the links touched.
  fn init_network(
    &mut self, plan: &mut PlanGraph, net: &mut Network, props: &StructureProperties,
  ) -> Result<OrderSet<LinkId>> {
    props.validate()?;
    self.base_mut().set_props(props);
    let count = net.num_usable_mirrors();
    debug!("{} init over {} mirrors", self.structure_type(), count);
    let root = self.build_structure(plan, net, count)?;
    self.ensure_valid(plan)?;
    build_and_update_links(plan, net, root, self.structure_type(), 0)
  }

  /// Drop the current plan, rewind the cursor and rebuild from scratch at
  /// time `t`. Mirrors the rebuild leaves unbound are shut down.
  fn restart_network(
    &mut self, plan: &mut PlanGraph, net: &mut Network, props: &StructureProperties, t: u64,
  ) -> Result<OrderSet<LinkId>> {
    props.validate()?;
    self.base_mut().set_props(props);
    debug!("{} restart at t={}", self.structure_type(), t);
    self.teardown_plan(plan);
    net.reset_cursor();
    let root = self.build_structure(plan, net, net.num_usable_mirrors())?;
    self.ensure_valid(plan)?;
    let links = build_and_update_links(plan, net, root, self.structure_type(), t)?;
    shutdown_unbound_mirrors(plan, net, t);
    Ok(links)
  }

  /// Create `k` fresh mirrors, integrate them and reconcile.
  fn handle_add_new_mirrors(
    &mut self, plan: &mut PlanGraph, net: &mut Network, k: usize, props: &StructureProperties, t: u64,
  ) -> Result<OrderSet<LinkId>> {
    props.validate()?;
    self.base_mut().set_props(props);
    if k == 0 {
      return Ok(OrderSet::new());
    }
    debug!("{} add {} mirrors at t={}", self.structure_type(), k, t);
    let root = if self.base().root().is_none() {
      net.create_mirrors(k, t);
      self.build_structure(plan, net, net.num_usable_mirrors())?
    } else {
      let mirrors = net.create_mirrors(k, t);
      match self.add_nodes_to_structure(plan, net, &mirrors) {
        Ok(added) => trace!("integrated {} of {} new mirrors", added, k),
        Err(e) => {
          // Undo the allocation, the plan was left untouched.
          for m in mirrors {
            net.shutdown_mirror(m, t);
          }
          return Err(e);
        }
      }
      self.base().root().unwrap()
    };
    self.ensure_valid(plan)?;
    build_and_update_links(plan, net, root, self.structure_type(), t)
  }

  /// Select `k` victims, detach them, reconcile and shut their mirrors
  /// down. Feasibility is checked before anything mutates.
  fn handle_remove_mirrors(
    &mut self, plan: &mut PlanGraph, net: &mut Network, k: usize, props: &StructureProperties, t: u64,
  ) -> Result<OrderSet<LinkId>> {
    props.validate()?;
    self.base_mut().set_props(props);
    if k == 0 {
      return Ok(OrderSet::new());
    }
    debug!("{} remove {} mirrors at t={}", self.structure_type(), k, t);
    let removed = self.remove_nodes_from_structure(plan, net, k)?;
    trace!("detached {} nodes", removed.nodes.len());
    self.ensure_valid(plan)?;
    let root = self
      .base()
      .root()
      .ok_or(TopologyError::StructureInvariantViolation { structure: self.structure_type() })?;
    let links = build_and_update_links(plan, net, root, self.structure_type(), t)?;
    shutdown_unbound_mirrors(plan, net, t);
    Ok(links)
  }

  /// Gate used by the drivers after each mutation. Under the `debug`
  /// feature a failed gate is fatal for the process, otherwise for the
  /// operation.
  fn ensure_valid(&self, plan: &PlanGraph) -> Result<()> {
    if !self.validate_topology(plan) {
      #[cfg(feature = "debug")]
      panic!("{} failed topology validation", self.structure_type());
      #[cfg(not(feature = "debug"))]
      return Err(TopologyError::StructureInvariantViolation { structure: self.structure_type() });
    }
    Ok(())
  }
}

/// Draw exactly `count` usable mirrors from the cursor, in order.
pub fn pull_mirrors(net: &mut Network, count: usize) -> Result<Vec<MirrorId>> {
  let mut out = Vec::with_capacity(count);
  for i in 0..count {
    match net.next_mirror() {
      Some(m) => out.push(m),
      None => return Err(TopologyError::MirrorExhausted { needed: count - i }),
    }
  }
  Ok(out)
}

/// The execution plane: reconcile the planned adjacency of one structure
/// against the live link set.
///
/// For every unordered pair of nodes reachable from `root` over records
/// tagged `ty`: a pair planned but unlinked gets one fresh link; a pair
/// linked but no longer planned has every link between it shut down; all
/// other pairs are untouched. The pass is idempotent and refuses to repair
/// asymmetric mirror state.
pub fn build_and_update_links(
  plan: &PlanGraph, net: &mut Network, root: NodeIndex, ty: StructureType, t: u64,
) -> Result<OrderSet<LinkId>> {
  debug_assert!(plan.ctx_id() == net.ctx_id(), "plan graph and network are from different contexts");
  let carries = plan.get(root).map(|n| n.has_type(ty)).unwrap_or(false);
  if !carries {
    return Err(TopologyError::TypeIncompatibility { root, expected: ty });
  }
  let members = plan.collect_structure(ty, root);
  let mut touched = OrderSet::new();
  for (a, b) in members.iter().tuple_combinations() {
    let (ma, mb) = match (plan.mirror_of(*a), plan.mirror_of(*b)) {
      (Some(ma), Some(mb)) => (ma, mb),
      // Unbound planning nodes have nothing to reconcile yet.
      _ => continue,
    };
    let planned = plan.planned_edge(*a, *b, ty);
    let linked = net.check_connected(ma, mb)?;
    if planned && !linked {
      touched.insert(net.create_link(ma, mb, t)?);
    } else if !planned && linked {
      for l in net.shutdown_links_between(ma, mb) {
        touched.insert(l);
      }
    }
  }
  trace!("reconciled {:?} from {:?}: {} links touched", ty, root, touched.len());
  Ok(touched)
}

/// Shut down every usable mirror no live plan node binds. Detached nodes
/// free their mirrors; this is where those mirrors actually die.
pub fn shutdown_unbound_mirrors(plan: &PlanGraph, net: &mut Network, t: u64) -> Vec<MirrorId> {
  let doomed: Vec<MirrorId> = net
    .mirror_ids()
    .filter(|m| {
      net.get_mirror(*m).map(|mir| mir.is_usable_for_network()).unwrap_or(false) && !plan.binds_mirror(*m)
    })
    .collect();
  for m in &doomed {
    net.shutdown_mirror(*m, t);
  }
  doomed
}

/// Graft `child` into a composite at `host`.
///
/// The first graft into an empty composite is an initialization: the
/// composite adopts the child's root as its own (pass `host = None`).
/// Later grafts add a bridge record `host -> child.root` carrying both the
/// child's native type (headed by the child's root) and the composite's
/// type (headed by the composite root); the host picks up the native tag
/// because a record's types are a subset of both endpoints' type sets.
/// Every grafted node and every record between grafted nodes gains the
/// composite's type, headed by the composite root.
pub fn graft(
  plan: &mut PlanGraph, composite: &mut StructureBase, host: Option<NodeIndex>, child: &dyn Substructure,
) -> Result<()> {
  let child_root = child
    .root()
    .ok_or(TopologyError::StructureInvariantViolation { structure: child.structure_type() })?;
  let comp_ty = composite.structure_type();
  match (composite.root(), host) {
    (None, _) => {
      composite.set_root(Some(child_root));
      if let Some(n) = plan.get_mut(child_root) {
        n.set_head(comp_ty, true);
      }
      trace!("graft: adopted {:?} as {:?} root", child_root, comp_ty);
    }
    (Some(comp_root), Some(host)) => {
      if !composite.nodes().contains(&host) {
        return Err(TopologyError::StructureInvariantViolation { structure: comp_ty });
      }
      let child_ty = child.structure_type();
      plan.add_child(
        host,
        child_root,
        &[child_ty, comp_ty],
        &[(child_ty, child_root), (comp_ty, comp_root)],
      );
      trace!("graft: {:?} bridged onto {:?}", child_root, host);
    }
    (Some(_), None) => {
      return Err(TopologyError::StructureInvariantViolation { structure: comp_ty });
    }
  }
  let comp_root = composite.root().unwrap();
  let members: Vec<NodeIndex> = child.structure_nodes().iter().copied().collect();
  plan.merge_structure_head(&members, comp_ty, comp_root);
  for n in members {
    composite.register(n);
  }
  Ok(())
}

/// Sever `child` back out of the composite: the inverse of [`graft`].
///
/// Strips the composite's type from the grafted nodes and their records
/// and destroys the bridge record: with the composite gone the native tag
/// it also carried no longer names an extant structure at the host, so
/// both are dropped and the record's type set empties. The host sheds the
/// child's native tag too, unless another record incident to it still
/// carries that type. Returns the child's root, again a standalone
/// structure head.
pub fn sever(
  plan: &mut PlanGraph, composite: &mut StructureBase, child: &dyn Substructure,
) -> Result<NodeIndex> {
  let child_root = child
    .root()
    .ok_or(TopologyError::StructureInvariantViolation { structure: child.structure_type() })?;
  let comp_ty = composite.structure_type();
  let child_ty = child.structure_type();
  let members: Vec<NodeIndex> = child.structure_nodes().iter().copied().collect();
  for p in plan.typed_parents(comp_ty, child_root) {
    if !members.contains(&p) {
      plan.remove_child_types(p, child_root, &[comp_ty, child_ty]);
      if plan.typed_degree(child_ty, p) == 0 {
        if let Some(n) = plan.get_mut(p) {
          n.remove_node_type(child_ty);
        }
      }
    }
  }
  plan.remove_structure_head(&members, comp_ty);
  for n in &members {
    composite.unregister(*n);
  }
  trace!("sever: {:?} detached from {:?}", child_root, comp_ty);
  Ok(child_root)
}

/// Instantiate the planner for a structure type. `Default` and `Mirror`
/// are node tags without a planner of their own and yield `None`.
pub fn strategy_for(ty: StructureType, props: &StructureProperties) -> Option<Box<dyn Substructure>> {
  match ty {
    StructureType::Ring => Some(Box::new(RingStructure::new(props))),
    StructureType::Line => Some(Box::new(LineStructure::new(props))),
    StructureType::Tree => Some(Box::new(TreeStructure::new(props))),
    StructureType::BalancedTree => Some(Box::new(BalancedTreeStructure::new(props))),
    StructureType::DepthLimitTree => Some(Box::new(DepthLimitTreeStructure::new(props))),
    StructureType::NConnected => Some(Box::new(NConnectedStructure::new(props))),
    StructureType::FullyConnected => Some(Box::new(FullyConnectedStructure::new(props))),
    StructureType::Star => Some(Box::new(StarStructure::new(props))),
    StructureType::Snowflake => Some(Box::new(SnowflakeStructure::new(props))),
    StructureType::Default | StructureType::Mirror => None,
  }
}
