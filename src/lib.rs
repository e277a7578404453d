//! topolink is a topology planner and executor for simulated overlay
//! networks of replicating mirrors connected by bidirectional links.
//!
//! topolink is:
//! + A **planner**: given a mirror count and a per-mirror link budget, it
//!   lays out concrete wiring patterns: ring, line, tree (plain, balanced,
//!   depth-limited), n-regular, fully-connected, star, and a composite
//!   "snowflake" assembled from the simpler ones.
//! + An **executor**: the planned adjacency lives on a typed node graph;
//!   concrete links are created and torn down exclusively by diffing that
//!   plan against the live link set, so planning correctness and execution
//!   correctness stay independently testable.
//! + **Deterministic**: node, mirror and link ids are strictly monotone,
//!   every container iterates in insertion order, and mirrors are handed
//!   out by a single cursor. Two runs over identical inputs produce
//!   identical link id sets.
//!
//! topolink does **not** own network semantics: message delivery,
//! replication, persistence and the simulator loop are external. The
//! planner is driven serially, one operation per simulator step.
//!
//! # The two planes
//!
//! Every strategy works on two levels:
//!
//! + The *planning plane* is a graph of [`Node`]s. Each node carries a set
//!   of [`StructureType`] tags and an ordered list of child records; one
//!   record can participate in several structures at once, each with its
//!   own head pointer. Planners only ever mutate this graph.
//! + The *execution plane* is the [`Network`]: the bags of [`Mirror`]s and
//!   [`Link`]s. [`structures::build_and_update_links`] walks the nodes of
//!   one structure and computes the symmetric difference between planned
//!   and live adjacency: planned-but-unlinked pairs get a fresh link,
//!   linked-but-unplanned pairs are torn down. Running it twice changes
//!   nothing the second time.
//!
//! Composites ([`structures::SnowflakeStructure`]) attach whole
//! substructures onto host nodes with [`structures::graft`] and detach
//! them with [`structures::sever`]; every resize is a
//! detach–replan–reattach cycle.
//!
//! # Example
//!
//! ```
//! use topolink::*;
//!
//! // One context seeds every id space; plan graph and network must share it.
//! let ctx = Context::new();
//! let mut plan = PlanGraph::new(&ctx);
//! let mut net = Network::new(&ctx, 2);
//! net.create_mirrors(5, 0);
//!
//! let props = StructureProperties::default();
//! let mut ring = structures::RingStructure::new(&props);
//!
//! // Build a 5-ring over the usable mirrors and wire it up.
//! let links = ring.init_network(&mut plan, &mut net, &props).unwrap();
//! assert_eq!(links.len(), 5);
//! assert_eq!(net.num_links(), 5);
//!
//! // Grow by two mirrors at t = 1; the ring stays a ring.
//! ring.handle_add_new_mirrors(&mut plan, &mut net, 2, &props, 1).unwrap();
//! assert_eq!(net.num_links(), 7);
//! assert!(ring.is_ring_intact(&plan));
//!
//! // Planning queries are pure arithmetic, nothing mutates.
//! let predicted = ring.predicted_num_target_links(
//!   &net,
//!   &TopologyAction::MirrorChange { new_mirror_count: 10, time: 2 },
//! );
//! assert_eq!(predicted, 10);
//! ```
//!
//! # Strategy surface
//!
//! All planners implement [`structures::Substructure`]. The trait's
//! provided methods are the lifecycle the simulator drives:
//! `init_network`, `restart_network`, `handle_add_new_mirrors`,
//! `handle_remove_mirrors`, plus the two query operations
//! `num_target_links` and `predicted_num_target_links` (the latter
//! answering the three [`TopologyAction`] variants without mutation).
//! Strategies implement the planning hooks: `build_structure`,
//! `add_nodes_to_structure`, `remove_nodes_from_structure`,
//! `validate_topology` and the `expected_links` formula.
//!
//! The `debug` cargo feature (on by default) turns invariant violations
//! into panics; without it they surface as [`TopologyError`] values.

pub mod action;
pub mod arena;
pub mod config;
pub mod context;
mod display;
pub mod error;
pub mod mirror;
pub mod network;
pub mod node;
pub mod structures;

pub use action::TopologyAction;
pub use config::StructureProperties;
pub use context::Context;
pub use error::{Result, TopologyError};
pub use mirror::{Link, LinkId, Mirror, MirrorId};
pub use network::{MirrorCursor, Network};
pub use node::{ChildRecord, Node, NodeIndex, PlanGraph, StructureType};
pub use structures::Substructure;
