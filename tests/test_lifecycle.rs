//! Lifecycle behavior shared by all strategies: restart stability, link
//! symmetry after every mutation, and the target-link formulas holding
//! through grow/shrink churn.

use topolink::structures::{strategy_for, Substructure};
use topolink::*;

fn setup(mirrors: usize, links_per_mirror: usize) -> (PlanGraph, Network) {
  let ctx = Context::new();
  let plan = PlanGraph::new(&ctx);
  let mut net = Network::new(&ctx, links_per_mirror);
  net.create_mirrors(mirrors, 0);
  (plan, net)
}

fn props_for(ty: StructureType) -> StructureProperties {
  StructureProperties {
    links_per_mirror: 3,
    max_depth: 3,
    external_structure_ratio: 0.4,
    ring_bridge_gap: 2,
    substructure_rotation: vec![StructureType::Star],
    target_links_per_node: if ty == StructureType::NConnected { Some(2) } else { None },
    ..StructureProperties::default()
  }
}

const STRATEGIES: &[(StructureType, usize)] = &[
  (StructureType::Ring, 6),
  (StructureType::Line, 6),
  (StructureType::Tree, 6),
  (StructureType::BalancedTree, 6),
  (StructureType::DepthLimitTree, 6),
  (StructureType::NConnected, 6),
  (StructureType::FullyConnected, 6),
  (StructureType::Star, 6),
  (StructureType::Snowflake, 20),
];

fn assert_symmetric(net: &Network, context: &str) {
  for l in net.link_ids().collect::<Vec<_>>() {
    let link = net.get_link(l).unwrap();
    assert_ne!(link.source(), link.target(), "{}: self-loop", context);
    assert!(
      net.get_mirror(link.source()).unwrap().links_to(link.target()).contains(&l),
      "{}: source side missing {:?}",
      context,
      l
    );
    assert!(
      net.get_mirror(link.target()).unwrap().links_to(link.source()).contains(&l),
      "{}: target side missing {:?}",
      context,
      l
    );
  }
}

#[test]
fn restart_over_the_same_mirrors_changes_nothing() {
  for (ty, size) in STRATEGIES {
    let props = props_for(*ty);
    let (mut plan, mut net) = setup(*size, props.links_per_mirror);
    let mut s = strategy_for(*ty, &props).unwrap();
    s.init_network(&mut plan, &mut net, &props).unwrap();
    let before: Vec<LinkId> = net.link_ids().collect();

    // The cursor rewinds and the rebuilt plan wires the same mirrors the
    // same way, so reconciliation finds nothing to do.
    s.restart_network(&mut plan, &mut net, &props, 7).unwrap();
    let after: Vec<LinkId> = net.link_ids().collect();
    assert_eq!(before, after, "{} restart churned links", ty);
    assert_eq!(net.num_usable_mirrors(), *size, "{} restart lost mirrors", ty);
    assert_eq!(net.num_links(), s.num_target_links(&net), "{} restart target", ty);
  }
}

#[test]
fn restart_after_shrink_rebuilds_over_survivors() {
  let props = props_for(StructureType::Ring);
  let (mut plan, mut net) = setup(7, props.links_per_mirror);
  let mut ring = strategy_for(StructureType::Ring, &props).unwrap();
  ring.init_network(&mut plan, &mut net, &props).unwrap();
  ring.handle_remove_mirrors(&mut plan, &mut net, 2, &props, 1).unwrap();
  assert_eq!(net.num_usable_mirrors(), 5);

  let before: Vec<LinkId> = net.link_ids().collect();
  ring.restart_network(&mut plan, &mut net, &props, 2).unwrap();
  // Shut-down mirrors stay shut down; the survivors keep their wiring.
  assert_eq!(net.num_usable_mirrors(), 5);
  let after: Vec<LinkId> = net.link_ids().collect();
  assert_eq!(before, after);
}

#[test]
fn links_stay_symmetric_through_the_lifecycle() {
  for (ty, size) in STRATEGIES {
    let props = props_for(*ty);
    let (mut plan, mut net) = setup(*size, props.links_per_mirror);
    let mut s = strategy_for(*ty, &props).unwrap();

    s.init_network(&mut plan, &mut net, &props).unwrap();
    assert_symmetric(&net, "init");
    s.handle_add_new_mirrors(&mut plan, &mut net, 2, &props, 1).unwrap();
    assert_symmetric(&net, "add");
    s.handle_remove_mirrors(&mut plan, &mut net, 1, &props, 2).unwrap();
    assert_symmetric(&net, "remove");
    s.restart_network(&mut plan, &mut net, &props, 3).unwrap();
    assert_symmetric(&net, "restart");
  }
}

#[test]
fn churn_keeps_the_formula() {
  let props = props_for(StructureType::Ring);
  let (mut plan, mut net) = setup(5, props.links_per_mirror);
  let mut ring = strategy_for(StructureType::Ring, &props).unwrap();
  ring.init_network(&mut plan, &mut net, &props).unwrap();

  for round in 0..4u64 {
    ring.handle_add_new_mirrors(&mut plan, &mut net, 3, &props, round * 2).unwrap();
    assert_eq!(net.num_links(), ring.num_target_links(&net));
    ring.handle_remove_mirrors(&mut plan, &mut net, 2, &props, round * 2 + 1).unwrap();
    assert_eq!(net.num_links(), ring.num_target_links(&net));
  }
  // Net growth of one mirror per round.
  assert_eq!(net.num_usable_mirrors(), 9);
  assert_eq!(net.num_links(), 9);
}

#[test]
fn snowflake_churn_keeps_the_composite_sum() {
  let props = props_for(StructureType::Snowflake);
  let (mut plan, mut net) = setup(20, props.links_per_mirror);
  let mut snow = strategy_for(StructureType::Snowflake, &props).unwrap();
  snow.init_network(&mut plan, &mut net, &props).unwrap();

  for round in 0..3u64 {
    snow.handle_add_new_mirrors(&mut plan, &mut net, 3, &props, round * 2).unwrap();
    assert_eq!(net.num_links(), snow.num_target_links(&net), "round {} add", round);
    assert_symmetric(&net, "snowflake add");
    snow.handle_remove_mirrors(&mut plan, &mut net, 2, &props, round * 2 + 1).unwrap();
    assert_eq!(net.num_links(), snow.num_target_links(&net), "round {} remove", round);
    assert_symmetric(&net, "snowflake remove");
  }
  assert_eq!(net.num_usable_mirrors(), 23);
}

#[test]
fn zero_deltas_are_no_ops() {
  let props = props_for(StructureType::Line);
  let (mut plan, mut net) = setup(4, props.links_per_mirror);
  let mut line = strategy_for(StructureType::Line, &props).unwrap();
  line.init_network(&mut plan, &mut net, &props).unwrap();
  let before: Vec<LinkId> = net.link_ids().collect();

  let touched = line.handle_add_new_mirrors(&mut plan, &mut net, 0, &props, 1).unwrap();
  assert!(touched.is_empty());
  let touched = line.handle_remove_mirrors(&mut plan, &mut net, 0, &props, 1).unwrap();
  assert!(touched.is_empty());
  let after: Vec<LinkId> = net.link_ids().collect();
  assert_eq!(before, after);
}
