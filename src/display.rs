use std::fmt::Display;

use crate::mirror::{LinkId, MirrorId};
use crate::network::Network;
use crate::node::{NodeIndex, PlanGraph, StructureType};

impl Display for StructureType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      StructureType::Default => "default",
      StructureType::Mirror => "mirror",
      StructureType::Tree => "tree",
      StructureType::BalancedTree => "balanced-tree",
      StructureType::DepthLimitTree => "depth-limit-tree",
      StructureType::Line => "line",
      StructureType::Ring => "ring",
      StructureType::Star => "star",
      StructureType::FullyConnected => "fully-connected",
      StructureType::NConnected => "n-connected",
      StructureType::Snowflake => "snowflake",
    };
    write!(f, "{}", name)
  }
}

impl Display for NodeIndex {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "n{}", self.0)
  }
}

impl Display for MirrorId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "m{}", self.0)
  }
}

impl Display for LinkId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "l{}", self.0)
  }
}

impl Display for PlanGraph {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(f, "PlanGraph {{")?;
    for (idx, node) in self.iter() {
      write!(f, "  {}", idx)?;
      if let Some(m) = node.mirror() {
        write!(f, " [{}]", m)?;
      }
      write!(f, " types ")?;
      let mut dl = f.debug_list();
      for t in node.node_types() {
        dl.entry(&format_args!("{}", t));
      }
      dl.finish()?;
      write!(f, " children ")?;
      let mut dl = f.debug_list();
      for r in node.children() {
        dl.entry(&format_args!("{}", r.child));
      }
      dl.finish()?;
      writeln!(f)?;
    }
    write!(f, "}}")
  }
}

impl Display for Network {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(
      f,
      "Network {{ mirrors: {} ({} usable), links: {} }}",
      self.num_mirrors(),
      self.num_usable_mirrors(),
      self.num_links()
    )?;
    for l in self.link_ids() {
      if let Some(link) = self.get_link(l) {
        writeln!(f, "  {}: {} <-> {}", l, link.source(), link.target())?;
      }
    }
    Ok(())
  }
}
