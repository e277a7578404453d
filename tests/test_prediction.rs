//! Prediction-matches-reality sweeps: for every strategy and every legal
//! action, the value `predicted_num_target_links` returns in state S must
//! equal `num_target_links` after the action is applied.

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

#[test]
fn mirror_change_grow() {
  for (ty, size) in STRATEGIES {
    let props = props_for(*ty);
    let (mut plan, mut net) = setup(*size, props.links_per_mirror);
    let mut s = strategy_for(*ty, &props).unwrap();
    s.init_network(&mut plan, &mut net, &props).unwrap();

    let predicted = s.predicted_num_target_links(
      &net,
      &TopologyAction::MirrorChange { new_mirror_count: size + 2, time: 1 },
    );
    s.handle_add_new_mirrors(&mut plan, &mut net, 2, &props, 1).unwrap();
    assert_eq!(s.num_target_links(&net), predicted, "{} grow target", ty);
    assert_eq!(net.num_links(), predicted, "{} grow actual", ty);
  }
}

#[test]
fn mirror_change_shrink() {
  for (ty, size) in STRATEGIES {
    let props = props_for(*ty);
    let (mut plan, mut net) = setup(*size, props.links_per_mirror);
    let mut s = strategy_for(*ty, &props).unwrap();
    s.init_network(&mut plan, &mut net, &props).unwrap();

    let predicted = s.predicted_num_target_links(
      &net,
      &TopologyAction::MirrorChange { new_mirror_count: size - 1, time: 1 },
    );
    s.handle_remove_mirrors(&mut plan, &mut net, 1, &props, 1).unwrap();
    assert_eq!(s.num_target_links(&net), predicted, "{} shrink target", ty);
    assert_eq!(net.num_links(), predicted, "{} shrink actual", ty);
  }
}

#[test]
fn target_link_change_is_pure_arithmetic() {
  for (ty, size) in STRATEGIES {
    let props = props_for(*ty);
    let (mut plan, mut net) = setup(*size, props.links_per_mirror);
    let mut s = strategy_for(*ty, &props).unwrap();
    s.init_network(&mut plan, &mut net, &props).unwrap();

    let links_before = net.num_links();
    let predicted =
      s.predicted_num_target_links(&net, &TopologyAction::TargetLinkChange { new_links_per_mirror: 4 });
    // Asking predicts; nothing moved.
    assert_eq!(net.num_links(), links_before, "{} asked without mutating", ty);

    net.set_num_target_links_per_mirror(4);
    assert_eq!(s.num_target_links(&net), predicted, "{} degree change", ty);
  }
}

#[test]
fn topology_change_delegates() {
  let props = props_for(StructureType::Ring);
  let (mut plan, mut net) = setup(6, props.links_per_mirror);
  let mut ring = strategy_for(StructureType::Ring, &props).unwrap();
  ring.init_network(&mut plan, &mut net, &props).unwrap();

  // A 6-node line carries 5 links, whatever runs today.
  let predicted = ring
    .predicted_num_target_links(&net, &TopologyAction::TopologyChange { target: StructureType::Line });
  assert_eq!(predicted, 5);

  let predicted = ring.predicted_num_target_links(
    &net,
    &TopologyAction::TopologyChange { target: StructureType::FullyConnected },
  );
  assert_eq!(predicted, 15);

  // Snowflake is fully plannable from the stored properties: six mirrors
  // split into a ring of 4 plus two one-mirror stars, one bridge each.
  let predicted = ring.predicted_num_target_links(
    &net,
    &TopologyAction::TopologyChange { target: StructureType::Snowflake },
  );
  assert_eq!(predicted, 6);
}

#[test]
fn unplannable_topology_change_falls_back() {
  let props = props_for(StructureType::Ring);
  let (mut plan, mut net) = setup(6, props.links_per_mirror);
  let mut ring = strategy_for(StructureType::Ring, &props).unwrap();
  ring.init_network(&mut plan, &mut net, &props).unwrap();

  // `Default` and `Mirror` are node tags without a planner; the prediction
  // falls back to the current target instead of failing.
  for target in [StructureType::Default, StructureType::Mirror] {
    let predicted =
      ring.predicted_num_target_links(&net, &TopologyAction::TopologyChange { target });
    assert_eq!(predicted, ring.num_target_links(&net));
  }
}

#[test]
fn prediction_never_mutates() {
  let props = props_for(StructureType::Snowflake);
  let (mut plan, mut net) = setup(20, props.links_per_mirror);
  let mut snow = strategy_for(StructureType::Snowflake, &props).unwrap();
  snow.init_network(&mut plan, &mut net, &props).unwrap();

  let links_before: Vec<LinkId> = net.link_ids().collect();
  for action in [
    TopologyAction::MirrorChange { new_mirror_count: 40, time: 9 },
    TopologyAction::TargetLinkChange { new_links_per_mirror: 9 },
    TopologyAction::TopologyChange { target: StructureType::Ring },
  ] {
    snow.predicted_num_target_links(&net, &action);
  }
  let links_after: Vec<LinkId> = net.link_ids().collect();
  assert_eq!(links_before, links_after);
  assert_eq!(net.num_usable_mirrors(), 20);
}
