use topolink::structures::{SnowflakeLayout, SnowflakeStructure};
use topolink::*;

fn snowflake_props() -> StructureProperties {
  StructureProperties {
    links_per_mirror: 2,
    external_structure_ratio: 0.4,
    ring_bridge_gap: 2,
    substructure_rotation: vec![StructureType::Star],
    ..StructureProperties::default()
  }
}

fn setup(mirrors: usize) -> (PlanGraph, Network) {
  let ctx = Context::new();
  let plan = PlanGraph::new(&ctx);
  let mut net = Network::new(&ctx, 2);
  net.create_mirrors(mirrors, 0);
  (plan, net)
}

#[test]
fn layout_distribution() {
  let layout = SnowflakeLayout::compute(20, 0.4, 2);
  assert_eq!(layout.ring_mirrors, 12);
  assert_eq!(layout.external_mirrors, 8);
  let occupied = layout.occupied();
  let positions: Vec<usize> = occupied.iter().map(|(p, _)| *p).collect();
  assert_eq!(positions, vec![0, 2, 4, 6, 8, 10]);
  // Eight external mirrors over six positions, front-heavy remainder.
  let counts: Vec<usize> = occupied.iter().map(|(_, c)| *c).collect();
  assert_eq!(counts, vec![2, 2, 1, 1, 1, 1]);
  assert_eq!(counts.iter().sum::<usize>(), 8);
}

#[test]
fn layout_loses_no_mirror() {
  for total in 3..60 {
    let layout = SnowflakeLayout::compute(total, 0.35, 3);
    let external: usize = layout.attachment_counts.iter().sum();
    assert_eq!(layout.ring_mirrors + external, total, "total {}", total);
  }
}

#[test]
fn init_twenty_mirrors() {
  let (mut plan, mut net) = setup(20);
  let props = snowflake_props();
  let mut snow = SnowflakeStructure::new(&props);

  let links = snow.init_network(&mut plan, &mut net, &props).unwrap();
  // Ring 12 + star-internal 2 + one bridge per attachment 6.
  assert_eq!(links.len(), 20);
  assert_eq!(net.num_links(), 20);
  assert_eq!(snow.num_target_links(&net), 20);

  assert_eq!(snow.num_externals(), 6);
  let ring_nodes = snow.ring().base().nodes_in_id_order();
  let hosts: Vec<NodeIndex> = snow.attachments().iter().map(|(h, _)| *h).collect();
  let expected: Vec<NodeIndex> = [0, 2, 4, 6, 8, 10].iter().map(|i| ring_nodes[*i]).collect();
  assert_eq!(hosts, expected);
  assert!(snow.ring().is_ring_intact(&plan));
  // Each bridge record tags its host with the attached structure's type.
  for host in hosts {
    assert!(plan.get(host).unwrap().has_type(StructureType::Star));
  }
}

#[test]
fn grow_matches_prediction() {
  let (mut plan, mut net) = setup(20);
  let props = snowflake_props();
  let mut snow = SnowflakeStructure::new(&props);
  snow.init_network(&mut plan, &mut net, &props).unwrap();

  let predicted = snow.predicted_num_target_links(
    &net,
    &TopologyAction::MirrorChange { new_mirror_count: 24, time: 1 },
  );
  snow.handle_add_new_mirrors(&mut plan, &mut net, 4, &props, 1).unwrap();
  assert_eq!(net.num_usable_mirrors(), 24);
  assert_eq!(net.num_links(), predicted);
  assert_eq!(snow.num_target_links(&net), predicted);
  assert!(snow.ring().is_ring_intact(&plan));
}

#[test]
fn shrink_matches_prediction() {
  let (mut plan, mut net) = setup(20);
  let props = snowflake_props();
  let mut snow = SnowflakeStructure::new(&props);
  snow.init_network(&mut plan, &mut net, &props).unwrap();

  let predicted = snow.predicted_num_target_links(
    &net,
    &TopologyAction::MirrorChange { new_mirror_count: 16, time: 1 },
  );
  snow.handle_remove_mirrors(&mut plan, &mut net, 4, &props, 1).unwrap();
  assert_eq!(net.num_usable_mirrors(), 16);
  assert_eq!(net.num_links(), predicted);
  assert_eq!(snow.num_target_links(&net), predicted);
  // 16 mirrors: ring 10, externals 6 over positions {0,2,4,6,8}.
  assert_eq!(snow.ring().structure_nodes().len(), 10);
  assert_eq!(snow.num_externals(), 5);
}

#[test]
fn rotation_cycles_through_types() {
  let (mut plan, mut net) = setup(30);
  let props = StructureProperties {
    links_per_mirror: 3,
    external_structure_ratio: 0.4,
    ring_bridge_gap: 3,
    substructure_rotation: vec![StructureType::Star, StructureType::DepthLimitTree],
    max_depth: 2,
    ..StructureProperties::default()
  };
  let mut snow = SnowflakeStructure::new(&props);
  snow.init_network(&mut plan, &mut net, &props).unwrap();

  // Both rotation entries plan trees, so links still sum exactly.
  assert_eq!(net.num_links(), snow.num_target_links(&net));
  let roots: Vec<NodeIndex> = snow.attachments().iter().map(|(_, r)| *r).collect();
  assert!(!roots.is_empty());
  let star_roots = roots.iter().filter(|r| plan.get(**r).unwrap().has_type(StructureType::Star));
  let tree_roots =
    roots.iter().filter(|r| plan.get(**r).unwrap().has_type(StructureType::DepthLimitTree));
  assert_eq!(star_roots.count() + tree_roots.count(), roots.len());
}

#[test]
fn every_member_carries_the_composite_type() {
  let (mut plan, mut net) = setup(20);
  let props = snowflake_props();
  let mut snow = SnowflakeStructure::new(&props);
  snow.init_network(&mut plan, &mut net, &props).unwrap();

  for n in snow.structure_nodes() {
    assert!(plan.get(*n).unwrap().has_type(StructureType::Snowflake));
  }
  let members = plan.collect_structure(StructureType::Snowflake, snow.root().unwrap());
  assert_eq!(members.len(), snow.structure_nodes().len());
  assert_eq!(members.len(), 20);
}

#[test]
fn too_small_for_a_ring_is_infeasible() {
  // Three mirrors leave only two for the ring once the external share is cut.
  let (mut plan, mut net) = setup(3);
  let props = snowflake_props();
  let mut snow = SnowflakeStructure::new(&props);
  let err = snow.init_network(&mut plan, &mut net, &props).unwrap_err();
  assert!(matches!(err, TopologyError::InfeasibleSize { structure: StructureType::Snowflake, .. }));
}
