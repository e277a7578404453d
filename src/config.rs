use serde::{Deserialize, Serialize};

use crate::error::{Result, TopologyError};
use crate::node::StructureType;

/// The recognized configuration surface of the planner.
///
/// Every strategy parameter travels with the strategy instance that was
/// constructed from it; there is no global property store. Fields carry
/// serde defaults so a partial document deserializes into a usable set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureProperties {
  /// Per-mirror link budget. Trees derive their child capacity from it.
  pub links_per_mirror: usize,
  /// Smallest admissible line. Never below 2.
  pub min_line_size: usize,
  /// Smallest admissible ring. Never below 3.
  pub min_ring_size: usize,
  /// Depth cap for the depth-limited tree, root at depth 0.
  pub max_depth: usize,
  /// Degree of the n-connected overlay. Falls back to
  /// `links_per_mirror` when absent.
  pub target_links_per_node: Option<usize>,
  /// Admissible depth spread when the balanced tree picks an attachment
  /// parent.
  pub max_allowed_balance_deviation: usize,
  /// Share of mirrors the snowflake hands to its external substructures,
  /// strictly between 0 and 1.
  pub external_structure_ratio: f64,
  /// Every `gap`-th ring position receives an external attachment.
  pub ring_bridge_gap: usize,
  /// Structure types the snowflake cycles through for successive external
  /// attachments.
  pub substructure_rotation: Vec<StructureType>,
}

impl Default for StructureProperties {
  fn default() -> Self {
    StructureProperties {
      links_per_mirror: 2,
      min_line_size: 2,
      min_ring_size: 3,
      max_depth: 3,
      target_links_per_node: None,
      max_allowed_balance_deviation: 1,
      external_structure_ratio: 0.5,
      ring_bridge_gap: 2,
      substructure_rotation: vec![StructureType::Star],
    }
  }
}

impl StructureProperties {
  /// The degree the n-connected overlay aims for.
  pub fn effective_target_links_per_node(&self) -> usize {
    self.target_links_per_node.unwrap_or(self.links_per_mirror)
  }

  /// Check every field against its documented domain.
  pub fn validate(&self) -> Result<()> {
    if self.links_per_mirror < 1 {
      return Err(TopologyError::InvalidProperties {
        reason: "links_per_mirror must be at least 1".to_string(),
      });
    }
    if self.min_line_size < 2 {
      return Err(TopologyError::InvalidProperties {
        reason: format!("min_line_size is {}, lines need at least 2 nodes", self.min_line_size),
      });
    }
    if self.min_ring_size < 3 {
      return Err(TopologyError::InvalidProperties {
        reason: format!("min_ring_size is {}, rings need at least 3 nodes", self.min_ring_size),
      });
    }
    if self.max_depth < 1 {
      return Err(TopologyError::InvalidProperties {
        reason: "max_depth must be at least 1".to_string(),
      });
    }
    if let Some(d) = self.target_links_per_node {
      if d < 1 {
        return Err(TopologyError::InvalidProperties {
          reason: "target_links_per_node must be at least 1".to_string(),
        });
      }
    }
    if !(self.external_structure_ratio > 0.0 && self.external_structure_ratio < 1.0) {
      return Err(TopologyError::InvalidProperties {
        reason: format!(
          "external_structure_ratio is {}, must lie strictly between 0 and 1",
          self.external_structure_ratio
        ),
      });
    }
    if self.ring_bridge_gap < 1 {
      return Err(TopologyError::InvalidProperties {
        reason: "ring_bridge_gap must be at least 1".to_string(),
      });
    }
    if self.substructure_rotation.is_empty() {
      return Err(TopologyError::InvalidProperties {
        reason: "substructure_rotation must name at least one structure type".to_string(),
      });
    }
    Ok(())
  }
}
