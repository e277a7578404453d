use topolink::structures::LineStructure;
use topolink::*;

fn setup(mirrors: usize) -> (PlanGraph, Network) {
  let ctx = Context::new();
  let plan = PlanGraph::new(&ctx);
  let mut net = Network::new(&ctx, 2);
  net.create_mirrors(mirrors, 0);
  (plan, net)
}

#[test]
fn init_then_shrink() {
  let (mut plan, mut net) = setup(4);
  let props = StructureProperties::default();
  let mut line = LineStructure::new(&props);

  let links = line.init_network(&mut plan, &mut net, &props).unwrap();
  assert_eq!(links.len(), 3);
  assert_eq!(net.num_links(), 3);

  line.handle_remove_mirrors(&mut plan, &mut net, 1, &props, 2).unwrap();
  assert_eq!(net.num_usable_mirrors(), 3);
  assert_eq!(net.num_links(), 2);

  // Both surviving endpoints carry exactly one link.
  let (head, tail) = line.endpoints(&plan).unwrap();
  assert_ne!(head, tail);
  for endpoint in [head, tail] {
    let m = plan.mirror_of(endpoint).unwrap();
    assert_eq!(net.get_mirror(m).unwrap().num_links(), 1);
  }
}

#[test]
fn grows_at_the_far_endpoint() {
  let (mut plan, mut net) = setup(3);
  let props = StructureProperties::default();
  let mut line = LineStructure::new(&props);
  line.init_network(&mut plan, &mut net, &props).unwrap();
  let (head, old_tail) = line.endpoints(&plan).unwrap();

  line.handle_add_new_mirrors(&mut plan, &mut net, 2, &props, 1).unwrap();
  assert_eq!(net.num_links(), 4);
  let (new_head, new_tail) = line.endpoints(&plan).unwrap();
  assert_eq!(new_head, head);
  assert_ne!(new_tail, old_tail);
  assert_eq!(line.line_order(&plan).len(), 5);
}

#[test]
fn head_survives_shrink() {
  let (mut plan, mut net) = setup(5);
  let props = StructureProperties::default();
  let mut line = LineStructure::new(&props);
  line.init_network(&mut plan, &mut net, &props).unwrap();
  let head = line.root().unwrap();

  line.handle_remove_mirrors(&mut plan, &mut net, 3, &props, 1).unwrap();
  assert_eq!(line.root(), Some(head));
  assert_eq!(net.num_links(), 1);
}

#[test]
fn minimum_size_is_two() {
  let (mut plan, mut net) = setup(1);
  let props = StructureProperties::default();
  let mut line = LineStructure::new(&props);
  let err = line.init_network(&mut plan, &mut net, &props).unwrap_err();
  assert!(matches!(err, TopologyError::InfeasibleSize { structure: StructureType::Line, .. }));

  let (mut plan, mut net) = setup(2);
  let mut line = LineStructure::new(&props);
  line.init_network(&mut plan, &mut net, &props).unwrap();
  let err = line.handle_remove_mirrors(&mut plan, &mut net, 1, &props, 1).unwrap_err();
  assert!(matches!(err, TopologyError::InfeasibleSize { .. }));
}
