use topolink::structures::{build_and_update_links, RingStructure};
use topolink::*;

fn setup(mirrors: usize, links_per_mirror: usize) -> (PlanGraph, Network) {
  let ctx = Context::new();
  let plan = PlanGraph::new(&ctx);
  let mut net = Network::new(&ctx, links_per_mirror);
  net.create_mirrors(mirrors, 0);
  (plan, net)
}

#[test]
fn init_then_grow() {
  let (mut plan, mut net) = setup(5, 2);
  let props = StructureProperties::default();
  let mut ring = RingStructure::new(&props);

  let links = ring.init_network(&mut plan, &mut net, &props).unwrap();
  assert_eq!(links.len(), 5);
  assert_eq!(net.num_links(), 5);
  assert_eq!(ring.num_target_links(&net), 5);
  assert!(ring.is_ring_intact(&plan));

  ring.handle_add_new_mirrors(&mut plan, &mut net, 2, &props, 1).unwrap();
  assert_eq!(net.num_usable_mirrors(), 7);
  assert_eq!(net.num_links(), 7);
  assert!(ring.is_ring_intact(&plan));

  // Every third node from the head: ceil(7 / 3) = 3 bridge candidates.
  let bridges = ring.find_bridge_nodes(&plan, 3);
  assert_eq!(bridges.len(), 3);
  assert_eq!(bridges[0], ring.root().unwrap());
}

#[test]
fn shrink_keeps_cycle() {
  let (mut plan, mut net) = setup(6, 2);
  let props = StructureProperties::default();
  let mut ring = RingStructure::new(&props);
  ring.init_network(&mut plan, &mut net, &props).unwrap();

  ring.handle_remove_mirrors(&mut plan, &mut net, 2, &props, 3).unwrap();
  assert_eq!(net.num_usable_mirrors(), 4);
  assert_eq!(net.num_links(), 4);
  assert!(ring.is_ring_intact(&plan));
  // The head always survives a shrink.
  assert!(plan.get(ring.root().unwrap()).is_some());
}

#[test]
fn walk_is_closed() {
  let (mut plan, mut net) = setup(5, 2);
  let props = StructureProperties::default();
  let mut ring = RingStructure::new(&props);
  ring.init_network(&mut plan, &mut net, &props).unwrap();

  let head = ring.root().unwrap();
  let mut at = head;
  for _ in 0..5 {
    let next = ring.next_in_ring(&plan, at).unwrap();
    assert_eq!(ring.prev_in_ring(&plan, next), Some(at));
    at = next;
  }
  assert_eq!(at, head);
}

#[test]
fn too_small_is_infeasible() {
  let (mut plan, mut net) = setup(2, 2);
  let props = StructureProperties::default();
  let mut ring = RingStructure::new(&props);
  let err = ring.init_network(&mut plan, &mut net, &props).unwrap_err();
  assert!(matches!(err, TopologyError::InfeasibleSize { structure: StructureType::Ring, .. }));
  // Nothing was planned and nothing was wired.
  assert!(plan.is_empty());
  assert_eq!(net.num_links(), 0);
}

#[test]
fn shrink_below_minimum_is_infeasible() {
  let (mut plan, mut net) = setup(3, 2);
  let props = StructureProperties::default();
  let mut ring = RingStructure::new(&props);
  ring.init_network(&mut plan, &mut net, &props).unwrap();

  let err = ring.handle_remove_mirrors(&mut plan, &mut net, 1, &props, 1).unwrap_err();
  assert!(matches!(err, TopologyError::InfeasibleSize { .. }));
  // The failed operation left the ring alone.
  assert_eq!(net.num_links(), 3);
  assert!(ring.is_ring_intact(&plan));
}

#[test]
fn reconciliation_is_idempotent() {
  let (mut plan, mut net) = setup(5, 2);
  let props = StructureProperties::default();
  let mut ring = RingStructure::new(&props);
  ring.init_network(&mut plan, &mut net, &props).unwrap();

  let before: Vec<LinkId> = net.link_ids().collect();
  let touched = build_and_update_links(&plan, &mut net, ring.root().unwrap(), StructureType::Ring, 7).unwrap();
  assert!(touched.is_empty());
  let after: Vec<LinkId> = net.link_ids().collect();
  assert_eq!(before, after);
}

#[test]
fn reconciling_a_foreign_root_fails() {
  let (mut plan, mut net) = setup(5, 2);
  let props = StructureProperties::default();
  let mut ring = RingStructure::new(&props);
  ring.init_network(&mut plan, &mut net, &props).unwrap();

  let root = ring.root().unwrap();
  let err = build_and_update_links(&plan, &mut net, root, StructureType::Line, 0).unwrap_err();
  assert!(matches!(err, TopologyError::TypeIncompatibility { expected: StructureType::Line, .. }));
}
