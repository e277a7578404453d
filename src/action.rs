use serde::{Deserialize, Serialize};

use crate::node::StructureType;

/// A planning query the simulator may pose at any time.
///
/// Actions are pure inputs to [`predicted_num_target_links`]; asking never
/// mutates the plan or the network.
///
/// [`predicted_num_target_links`]: crate::structures::Substructure::predicted_num_target_links
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TopologyAction {
  /// The network's target mirror count is redefined.
  MirrorChange { new_mirror_count: usize, time: u64 },
  /// The per-mirror degree budget changes.
  TargetLinkChange { new_links_per_mirror: usize },
  /// The active strategy is replaced; predictions delegate to the target
  /// strategy's own formula.
  TopologyChange { target: StructureType },
}
