use topolink::structures::{FullyConnectedStructure, NConnectedStructure, StarStructure};
use topolink::*;

fn setup(mirrors: usize, links_per_mirror: usize) -> (PlanGraph, Network) {
  let ctx = Context::new();
  let plan = PlanGraph::new(&ctx);
  let mut net = Network::new(&ctx, links_per_mirror);
  net.create_mirrors(mirrors, 0);
  (plan, net)
}

#[test]
fn regular_regime() {
  let (mut plan, mut net) = setup(6, 2);
  let props = StructureProperties::default();
  let mut nc = NConnectedStructure::new(&props);

  nc.init_network(&mut plan, &mut net, &props).unwrap();
  assert_eq!(net.num_links(), 6);
  for n in nc.structure_nodes() {
    assert_eq!(nc.degree_of(&plan, *n), 2);
  }

  nc.handle_add_new_mirrors(&mut plan, &mut net, 2, &props, 1).unwrap();
  assert_eq!(net.num_links(), 8);

  nc.handle_remove_mirrors(&mut plan, &mut net, 1, &props, 2).unwrap();
  assert_eq!(net.num_usable_mirrors(), 7);
  assert_eq!(net.num_links(), 7);
}

#[test]
fn small_network_is_complete() {
  let (mut plan, mut net) = setup(4, 3);
  let props = StructureProperties {
    links_per_mirror: 3,
    target_links_per_node: Some(3),
    ..StructureProperties::default()
  };
  let mut nc = NConnectedStructure::new(&props);

  // 4 < 2 * 3, so the plan is K4.
  nc.init_network(&mut plan, &mut net, &props).unwrap();
  assert_eq!(net.num_links(), 6);
  assert_eq!(nc.num_target_links(&net), 6);
}

#[test]
fn odd_degree_uses_diameter_chords() {
  let (mut plan, mut net) = setup(8, 3);
  let props = StructureProperties {
    links_per_mirror: 3,
    target_links_per_node: Some(3),
    ..StructureProperties::default()
  };
  let mut nc = NConnectedStructure::new(&props);

  nc.init_network(&mut plan, &mut net, &props).unwrap();
  assert_eq!(net.num_links(), 12);
  for n in nc.structure_nodes() {
    assert_eq!(nc.degree_of(&plan, *n), 3);
  }
}

#[test]
fn degree_one_beyond_a_pair_is_infeasible() {
  let (mut plan, mut net) = setup(4, 1);
  let props = StructureProperties { links_per_mirror: 1, ..StructureProperties::default() };
  let mut nc = NConnectedStructure::new(&props);
  let err = nc.init_network(&mut plan, &mut net, &props).unwrap_err();
  assert!(matches!(err, TopologyError::InfeasibleSize { max: Some(2), .. }));
}

#[test]
fn fully_connected_lifecycle() {
  let (mut plan, mut net) = setup(5, 2);
  let props = StructureProperties::default();
  let mut full = FullyConnectedStructure::new(&props);

  full.init_network(&mut plan, &mut net, &props).unwrap();
  assert_eq!(net.num_links(), 10);

  full.handle_add_new_mirrors(&mut plan, &mut net, 1, &props, 1).unwrap();
  assert_eq!(net.num_links(), 15);

  full.handle_remove_mirrors(&mut plan, &mut net, 2, &props, 2).unwrap();
  assert_eq!(net.num_usable_mirrors(), 4);
  assert_eq!(net.num_links(), 6);
}

#[test]
fn star_lifecycle() {
  let (mut plan, mut net) = setup(5, 2);
  let props = StructureProperties::default();
  let mut star = StarStructure::new(&props);

  star.init_network(&mut plan, &mut net, &props).unwrap();
  assert_eq!(net.num_links(), 4);
  let center = star.center().unwrap();
  assert_eq!(plan.typed_degree(StructureType::Star, center), 4);

  star.handle_add_new_mirrors(&mut plan, &mut net, 2, &props, 1).unwrap();
  assert_eq!(net.num_links(), 6);
  assert_eq!(star.leaves(&plan).len(), 6);

  star.handle_remove_mirrors(&mut plan, &mut net, 1, &props, 2).unwrap();
  assert_eq!(net.num_links(), 5);
  // The center is the head and never a victim.
  assert_eq!(star.center(), Some(center));
}
