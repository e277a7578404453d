use thiserror::Error;

use crate::mirror::MirrorId;
use crate::node::{NodeIndex, StructureType};

/// Structured failures of the planning and execution planes.
///
/// Planning-plane conditions are checked before any mutation happens, so a
/// failed operation leaves the plan graph untouched. Execution-plane
/// conditions (asymmetric link state, a root without its structure type)
/// indicate an invariant that was violated from outside; they are asserted
/// under the `debug` feature and surfaced as errors otherwise, never
/// silently repaired.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
  /// The requested size is outside the feasible range of the structure,
  /// either below its minimum (ring < 3, line < 2) or past a hard maximum
  /// (depth-limited capacity).
  #[error("{structure} of {requested} nodes is infeasible (min {min}, max {max:?})")]
  InfeasibleSize { structure: StructureType, requested: usize, min: usize, max: Option<usize> },

  /// The mirror cursor ran dry while a planner still needed mirrors.
  #[error("mirror cursor exhausted, {needed} more usable mirrors required")]
  MirrorExhausted { needed: usize },

  /// The root handed to link reconciliation does not carry the structure
  /// type being reconciled.
  #[error("node {root} does not carry structure type {expected}")]
  TypeIncompatibility { root: NodeIndex, expected: StructureType },

  /// One mirror records a link to the other, but not vice versa.
  #[error("asymmetric link state between mirrors {a} and {b}")]
  AsymmetricLink { a: MirrorId, b: MirrorId },

  /// `validate_topology` failed after a build or modify step.
  #[error("{structure} failed topology validation")]
  StructureInvariantViolation { structure: StructureType },

  /// A property value outside its documented domain.
  #[error("invalid properties: {reason}")]
  InvalidProperties { reason: String },
}

pub type Result<T> = std::result::Result<T, TopologyError>;
