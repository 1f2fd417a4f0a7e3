use crate::scene::NodeId;

/// An animation clip. Only the nodes it drives matter for code generation,
/// keyframes stay in the asset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Animation {
  /// The name of the animation.
  pub name: String,
  /// Nodes driven by at least one channel, in first-seen order.
  pub targets: Vec<NodeId>,
}

impl Animation {
  pub fn new<S: Into<String>>(name: S) -> Self {
    Animation {
      name: name.into(),
      targets: vec![],
    }
  }

  pub(crate) fn add_target(&mut self, node: NodeId) {
    if !self.targets.contains(&node) {
      self.targets.push(node);
    }
  }
}
