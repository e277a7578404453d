use ordermap::{OrderMap, OrderSet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::arena::{Arena, ArenaIndex};
use crate::context::Context;
use crate::mirror::MirrorId;

/// The closed set of structure tags.
///
/// Types are composable: a node carries the tag of every structure it
/// currently participates in, so a star head grafted onto a snowflake ring
/// is `{Star, Snowflake}` at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StructureType {
  Default,
  Mirror,
  Tree,
  BalancedTree,
  DepthLimitTree,
  Line,
  Ring,
  Star,
  FullyConnected,
  NConnected,
  Snowflake,
}

/// The index of a planning node, which implements [`Copy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl ArenaIndex for NodeIndex {
  fn new(id: usize) -> Self {
    NodeIndex(id)
  }
  fn id(&self) -> usize {
    self.0
  }
}

/// One parent-to-child edge of the plan.
///
/// The same physical edge may participate in several structures at once;
/// `types` lists them and `heads` names the head node of each. The record
/// is only destroyed when its type set empties.
#[derive(Debug, Clone)]
pub struct ChildRecord {
  pub child: NodeIndex,
  pub types: OrderSet<StructureType>,
  pub heads: OrderMap<StructureType, NodeIndex>,
}

impl ChildRecord {
  fn new(child: NodeIndex) -> Self {
    ChildRecord { child, types: OrderSet::new(), heads: OrderMap::new() }
  }

  pub fn carries(&self, ty: StructureType) -> bool {
    self.types.contains(&ty)
  }

  pub fn head_of(&self, ty: StructureType) -> Option<NodeIndex> {
    self.heads.get(&ty).copied()
  }
}

/// A planning-plane vertex.
///
/// Nodes never touch links; they carry the structural intent that the
/// execution plane later reconciles against the mirror state. A node is
/// bound to exactly one mirror for all non-transient states.
#[derive(Debug, Clone)]
pub struct Node {
  types: OrderSet<StructureType>,
  parent: Option<NodeIndex>,
  children: Vec<ChildRecord>,
  mirror: Option<MirrorId>,
  heads: OrderSet<StructureType>,
}

impl Node {
  fn new(mirror: Option<MirrorId>) -> Self {
    Node {
      types: OrderSet::new(),
      parent: None,
      children: Vec::new(),
      mirror,
      heads: OrderSet::new(),
    }
  }

  pub fn node_types(&self) -> &OrderSet<StructureType> {
    &self.types
  }

  pub fn has_type(&self, ty: StructureType) -> bool {
    self.types.contains(&ty)
  }

  pub fn add_node_type(&mut self, ty: StructureType) {
    self.types.insert(ty);
  }

  pub fn remove_node_type(&mut self, ty: StructureType) {
    self.types.remove(&ty);
  }

  pub fn set_node_types(&mut self, types: impl IntoIterator<Item = StructureType>) {
    self.types = types.into_iter().collect();
  }

  pub fn parent(&self) -> Option<NodeIndex> {
    self.parent
  }

  pub fn children(&self) -> &[ChildRecord] {
    &self.children
  }

  /// The record for `child`, if this node has one.
  pub fn find_child_record(&self, child: NodeIndex) -> Option<&ChildRecord> {
    self.children.iter().find(|r| r.child == child)
  }

  fn find_child_record_mut(&mut self, child: NodeIndex) -> Option<&mut ChildRecord> {
    self.children.iter_mut().find(|r| r.child == child)
  }

  pub fn mirror(&self) -> Option<MirrorId> {
    self.mirror
  }

  pub fn is_head(&self, ty: StructureType) -> bool {
    self.heads.contains(&ty)
  }

  pub fn set_head(&mut self, ty: StructureType, head: bool) {
    if head {
      self.heads.insert(ty);
    } else {
      self.heads.remove(&ty);
    }
  }
}

/// The node graph one planning session works on.
///
/// All planners of a composite share a single plan graph; each owns a
/// subset of its nodes. Mutation goes through the record helpers here so
/// the typed-membership invariant (a record's types are a subset of both
/// endpoints' type sets) cannot be broken piecemeal.
#[derive(Debug, Clone)]
pub struct PlanGraph {
  ctx_id: Uuid,
  nodes: Arena<NodeIndex, Node>,
}

impl PlanGraph {
  pub fn new(ctx: &Context) -> Self {
    PlanGraph { ctx_id: ctx.id, nodes: Arena::new(ctx.node_dist.clone()) }
  }

  pub(crate) fn ctx_id(&self) -> Uuid {
    self.ctx_id
  }

  /// Create a node tagged `ty`, bound to `mirror`.
  pub fn insert_node(&mut self, ty: StructureType, mirror: Option<MirrorId>) -> NodeIndex {
    let mut node = Node::new(mirror);
    node.add_node_type(ty);
    self.nodes.insert(node)
  }

  pub fn get(&self, idx: NodeIndex) -> Option<&Node> {
    self.nodes.get(idx)
  }

  pub fn get_mut(&mut self, idx: NodeIndex) -> Option<&mut Node> {
    self.nodes.get_mut(idx)
  }

  pub fn contains(&self, idx: NodeIndex) -> bool {
    self.nodes.contains(idx)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn node_ids(&self) -> impl Iterator<Item = NodeIndex> + '_ {
    self.nodes.keys()
  }

  pub fn iter(&self) -> crate::arena::Iter<'_, NodeIndex, Node> {
    self.nodes.iter()
  }

  /// Mirror bound to `idx`, if the node exists and is bound.
  pub fn mirror_of(&self, idx: NodeIndex) -> Option<MirrorId> {
    self.nodes.get(idx).and_then(|n| n.mirror())
  }

  /// Whether any live node binds `mirror`.
  pub fn binds_mirror(&self, mirror: MirrorId) -> bool {
    self.nodes.iter().any(|(_, n)| n.mirror() == Some(mirror))
  }

  /// Add (or extend) the `parent -> child` record with `types`, each headed
  /// by the given head node. Both endpoints gain the types in their own
  /// type sets. The child's parent pointer is only filled if it was empty;
  /// a cycle-closing record never turns a root into a child.
  pub fn add_child(
    &mut self, parent: NodeIndex, child: NodeIndex, types: &[StructureType],
    heads: &[(StructureType, NodeIndex)],
  ) {
    debug_assert!(parent != child, "a node cannot be its own child");
    {
      let p = self.nodes.get_mut(parent).expect("add_child: unknown parent");
      if p.find_child_record(child).is_none() {
        p.children.push(ChildRecord::new(child));
      }
      let record = p.find_child_record_mut(child).unwrap();
      for ty in types {
        record.types.insert(*ty);
      }
      for (ty, head) in heads {
        record.heads.insert(*ty, *head);
      }
      for ty in types {
        p.types.insert(*ty);
      }
    }
    let c = self.nodes.get_mut(child).expect("add_child: unknown child");
    for ty in types {
      c.types.insert(*ty);
    }
    if c.parent.is_none() && !c.is_head_of_any() {
      c.parent = Some(parent);
    }
  }

  /// Strip `types` from the `parent -> child` record. The record itself is
  /// destroyed only when no type remains on it; types still carried by
  /// other structures stay untouched. Node-level type sets are not trimmed
  /// here, membership may persist through other edges.
  pub fn remove_child_types(&mut self, parent: NodeIndex, child: NodeIndex, types: &[StructureType]) {
    let mut record_gone = false;
    if let Some(p) = self.nodes.get_mut(parent) {
      if let Some(record) = p.find_child_record_mut(child) {
        for ty in types {
          record.types.remove(ty);
          record.heads.remove(ty);
        }
        if record.types.is_empty() {
          p.children.retain(|r| r.child != child);
          record_gone = true;
        }
      }
    }
    if record_gone {
      if let Some(c) = self.nodes.get_mut(child) {
        if c.parent == Some(parent) {
          c.parent = None;
        }
      }
    }
  }

  /// Whether the `a -> b` record exists and carries `ty`.
  pub fn typed_record(&self, a: NodeIndex, b: NodeIndex, ty: StructureType) -> bool {
    self
      .nodes
      .get(a)
      .and_then(|n| n.find_child_record(b))
      .map(|r| r.carries(ty))
      .unwrap_or(false)
  }

  /// Whether the unordered pair is planned under `ty` in either direction.
  pub fn planned_edge(&self, a: NodeIndex, b: NodeIndex, ty: StructureType) -> bool {
    self.typed_record(a, b, ty) || self.typed_record(b, a, ty)
  }

  /// Forward record targets of `n` under `ty`, in record order.
  pub fn typed_children(&self, ty: StructureType, n: NodeIndex) -> Vec<NodeIndex> {
    match self.nodes.get(n) {
      Some(node) => node.children.iter().filter(|r| r.carries(ty)).map(|r| r.child).collect(),
      None => Vec::new(),
    }
  }

  /// Nodes whose record points *at* `n` under `ty`, in arena order.
  pub fn typed_parents(&self, ty: StructureType, n: NodeIndex) -> Vec<NodeIndex> {
    self
      .nodes
      .iter()
      .filter(|(_, node)| node.find_child_record(n).map(|r| r.carries(ty)).unwrap_or(false))
      .map(|(idx, _)| idx)
      .collect()
  }

  /// All plan-adjacent nodes of `n` under `ty`, forward targets first.
  pub fn typed_neighbors(&self, ty: StructureType, n: NodeIndex) -> Vec<NodeIndex> {
    let mut result = self.typed_children(ty, n);
    for p in self.typed_parents(ty, n) {
      if !result.contains(&p) {
        result.push(p);
      }
    }
    result
  }

  /// Number of distinct plan edges under `ty` incident to `n`.
  pub fn typed_degree(&self, ty: StructureType, n: NodeIndex) -> usize {
    self.typed_neighbors(ty, n).len()
  }

  /// Every node reachable from `head` following child records tagged
  /// `ty`, breadth-first, insertion-ordered. Reachability follows the
  /// records forward, the same direction head reachability is defined in;
  /// a bridge record pointing *into* a structure never drags the node on
  /// its far side into the walk. This is the node list the execution
  /// plane reconciles.
  pub fn collect_structure(&self, ty: StructureType, head: NodeIndex) -> Vec<NodeIndex> {
    let mut visited = OrderSet::new();
    if !self.nodes.contains(head) {
      return Vec::new();
    }
    visited.insert(head);
    let mut queue = std::collections::VecDeque::from([head]);
    while let Some(n) = queue.pop_front() {
      for next in self.typed_children(ty, n) {
        if visited.insert(next) {
          queue.push_back(next);
        }
      }
    }
    visited.into_iter().collect()
  }

  /// Depth of `n` under `ty`, following parent pointers; the head sits at
  /// depth 0.
  pub fn depth_in(&self, ty: StructureType, n: NodeIndex) -> usize {
    let mut depth = 0;
    let mut at = n;
    while let Some(p) = self.nodes.get(at).and_then(|node| node.parent()) {
      if !self.typed_record(p, at, ty) {
        break;
      }
      depth += 1;
      at = p;
      if depth > self.nodes.len() {
        debug_assert!(false, "parent cycle under {:?}", ty);
        break;
      }
    }
    depth
  }

  /// Whether `n` has no typed children under `ty`.
  pub fn is_terminal(&self, ty: StructureType, n: NodeIndex) -> bool {
    self.typed_children(ty, n).is_empty()
  }

  /// Whether `n` may take another child under `ty` given `capacity`
  /// children per node.
  pub fn can_accept_children(&self, ty: StructureType, n: NodeIndex, capacity: usize) -> bool {
    self.typed_children(ty, n).len() < capacity
  }

  /// Stamp `ty` (headed by `head`) onto every node of `members` and onto
  /// every record connecting two members. The graft half of composite
  /// maintenance.
  pub fn merge_structure_head(&mut self, members: &[NodeIndex], ty: StructureType, head: NodeIndex) {
    for idx in members {
      if let Some(n) = self.nodes.get_mut(*idx) {
        n.add_node_type(ty);
      }
    }
    for idx in members {
      let targets: Vec<NodeIndex> = match self.nodes.get(*idx) {
        Some(n) => n.children.iter().map(|r| r.child).filter(|c| members.contains(c)).collect(),
        None => continue,
      };
      let node = self.nodes.get_mut(*idx).unwrap();
      for t in targets {
        let record = node.find_child_record_mut(t).unwrap();
        record.types.insert(ty);
        record.heads.insert(ty, head);
      }
    }
  }

  /// Strip `ty` from every member node and from every record between
  /// members, destroying records whose type set empties. The sever half.
  pub fn remove_structure_head(&mut self, members: &[NodeIndex], ty: StructureType) {
    for idx in members {
      let targets: Vec<NodeIndex> = match self.nodes.get(*idx) {
        Some(n) => n.children.iter().filter(|r| r.carries(ty)).map(|r| r.child).collect(),
        None => continue,
      };
      for t in targets {
        self.remove_child_types(*idx, t, &[ty]);
      }
      if let Some(n) = self.nodes.get_mut(*idx) {
        n.remove_node_type(ty);
        n.set_head(ty, false);
      }
    }
  }

  /// Detach `n` from every structure in `types` and destroy it if no type
  /// remains. Records tagged with foreign types survive untouched. Returns
  /// the freed mirror when the node is destroyed.
  pub fn remove_node_from_plan(&mut self, n: NodeIndex, types: &[StructureType]) -> Option<MirrorId> {
    let incoming = self
      .nodes
      .iter()
      .filter(|(_, node)| node.find_child_record(n).is_some())
      .map(|(idx, _)| idx)
      .collect::<Vec<_>>();
    for p in incoming {
      self.remove_child_types(p, n, types);
    }
    let outgoing: Vec<NodeIndex> = match self.nodes.get(n) {
      Some(node) => node.children.iter().map(|r| r.child).collect(),
      None => return None,
    };
    for c in outgoing {
      self.remove_child_types(n, c, types);
    }
    let node = self.nodes.get_mut(n).unwrap();
    for ty in types {
      node.remove_node_type(*ty);
      node.set_head(*ty, false);
    }
    if node.node_types().is_empty() {
      let mirror = node.mirror();
      // Orphan any remaining children of foreign-typed records first.
      let leftover: Vec<NodeIndex> = node.children.iter().map(|r| r.child).collect();
      for c in leftover {
        if let Some(cn) = self.nodes.get_mut(c) {
          if cn.parent == Some(n) {
            cn.parent = None;
          }
        }
      }
      self.nodes.remove(n);
      mirror
    } else {
      None
    }
  }

  /// How many members of `set` claim to head `ty`. Exactly one is legal.
  pub fn count_heads(&self, set: &[NodeIndex], ty: StructureType) -> usize {
    set
      .iter()
      .filter(|idx| self.nodes.get(**idx).map(|n| n.is_head(ty)).unwrap_or(false))
      .count()
  }
}

impl Node {
  fn is_head_of_any(&self) -> bool {
    !self.heads.is_empty()
  }
}
