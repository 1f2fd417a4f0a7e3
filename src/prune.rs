use glam::DVec3;
use log::debug;

use crate::classify::Classifier;
use crate::error::Result;
use crate::options::Options;
use crate::props::{serialize, PropKey, Props};
use crate::scene::{NodeId, SceneGraph, Transform};
use crate::utils::round_to;

/// Why a node was pruned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
  /// No attributes of its own, or nothing left below it.
  Empty,
  /// Its rotation cancels against a directly nested group.
  DoubleNegative,
  /// Its transform was folded into its only child.
  TransformOverlap,
  /// Nothing renderable anywhere below it.
  NoContent,
}

impl Removal {
  fn describe(self) -> &'static str {
    match self {
      Removal::Empty => "empty",
      Removal::DoubleNegative => "double negative rotation",
      Removal::TransformOverlap => "transform overlap",
      Removal::NoContent => "lack of content",
    }
  }
}

/// Decisions of a dry run, applied with [`commit`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrunePlan {
  /// Removed nodes, in the order they were decided.
  pub removals: Vec<(NodeId, Removal)>,
  /// Transforms that replace a surviving node's own.
  pub transforms: Vec<(NodeId, Transform)>,
}

impl PrunePlan {
  pub fn is_empty(&self) -> bool {
    self.removals.is_empty() && self.transforms.is_empty()
  }
}

#[derive(Clone, Debug, Default)]
struct NodeState {
  removal: Option<Removal>,
  /// Replaces the node's own transform.
  transform: Option<Transform>,
  /// Child this node pushed its transform onto, with the child's previous override.
  pushed: Option<(NodeId, Option<Transform>)>,
}

///
/// Dry run over the tree. Children are decided before their parent, so a
/// parent sees its subtree in its final shape. The graph is left untouched.
///
pub fn plan(classifier: &Classifier<'_>, options: &Options) -> Result<PrunePlan> {
  let graph = classifier.graph();
  let mut pruner = Pruner {
    graph,
    classifier,
    options,
    states: vec![NodeState::default(); graph.len()],
    order: vec![],
  };
  pruner.visit(graph.root())?;

  let mut plan = PrunePlan::default();
  for id in pruner.order {
    if let Some(removal) = pruner.states[id.0].removal {
      plan.removals.push((id, removal));
    }
  }
  for id in graph.traverse(graph.root()) {
    let state = &pruner.states[id.0];
    if let (None, Some(transform)) = (state.removal, state.transform) {
      plan.transforms.push((id, transform));
    }
  }
  Ok(plan)
}

///
/// Apply a plan: write transform overrides, mark removed nodes and hand
/// their children to the nearest surviving ancestor, in place.
///
pub fn commit(graph: &mut SceneGraph, plan: &PrunePlan) {
  for (id, transform) in &plan.transforms {
    graph.node_mut(*id).transform = *transform;
  }
  for (id, _) in &plan.removals {
    graph.mark_removed(*id);
  }
  let root = graph.root();
  relink(graph, root);
}

fn relink(graph: &mut SceneGraph, id: NodeId) {
  let mut survivors = vec![];
  splice(graph, id, &mut survivors);
  graph.set_children(id, survivors.clone());
  for child in survivors {
    relink(graph, child);
  }
}

/// Surviving descendants of `id` that become its direct children, in order.
fn splice(graph: &mut SceneGraph, id: NodeId, survivors: &mut Vec<NodeId>) {
  let children = graph.children(id).to_vec();
  for child in children {
    if graph.is_removed(child) {
      splice(graph, child, survivors);
      graph.detach(child);
    } else {
      survivors.push(child);
    }
  }
}

struct Pruner<'a, 'b> {
  graph: &'a SceneGraph,
  classifier: &'b Classifier<'a>,
  options: &'b Options,
  states: Vec<NodeState>,
  /// Nodes in the order they were removed.
  order: Vec<NodeId>,
}

impl Pruner<'_, '_> {
  fn visit(&mut self, id: NodeId) -> Result<()> {
    // A bone is a handle into the loaded skeleton, nothing below it is rewritten.
    if self.classifier.kind(id).is_bone() {
      return Ok(());
    }
    for child in self.graph.children(id).to_vec() {
      self.visit(child)?;
    }
    self.rewrite(id)
  }

  fn transform(&self, id: NodeId) -> Transform {
    self.states[id.0]
      .transform
      .unwrap_or(self.graph.node(id).transform)
  }

  fn props(&self, id: NodeId) -> Result<Props> {
    let info = self.classifier.info(id);
    serialize(self.graph, id, &info, &self.transform(id), self.options)
  }

  fn remove(&mut self, id: NodeId, removal: Removal) {
    debug!(
      "gltfjsx: {} [{}] removed ({})",
      self.classifier.kind(id).tag(),
      self.classifier.name(id),
      removal.describe()
    );
    if self.states[id.0].removal.is_none() {
      self.order.push(id);
    }
    self.states[id.0].removal = Some(removal);
  }

  /// Groups that may disappear: not animated, not already gone, groups kept only on request.
  fn eligible(&self, id: NodeId) -> bool {
    !self.options.keepgroups
      && !self.graph.is_removed(id)
      && self.states[id.0].removal.is_none()
      && self.classifier.kind(id).is_group()
      && !self.classifier.is_animation_relevant(id)
  }

  ///
  /// Children as the parent will see them once pruning is applied. Empty
  /// wrappers are looked through, folded transforms are still pending.
  ///
  fn effective_children(&self, id: NodeId) -> Vec<NodeId> {
    let mut out = vec![];
    for child in self.graph.children(id) {
      match self.states[child.0].removal {
        Some(Removal::Empty) | Some(Removal::DoubleNegative) => {
          out.extend(self.effective_children(*child))
        }
        Some(Removal::NoContent) => {}
        Some(Removal::TransformOverlap) | None => out.push(*child),
      }
    }
    out
  }

  /// Undo `id`'s removal and any transform it pushed down.
  fn restore(&mut self, id: NodeId) {
    if let Some((target, previous)) = self.states[id.0].pushed.take() {
      self.states[target.0].transform = previous;
    }
    if self.states[id.0].removal.take().is_some() {
      self.order.retain(|removed| *removed != id);
    }
  }

  fn rotations_cancel(&self, a: NodeId, b: NodeId) -> bool {
    let precision = self.options.precision;
    let rnd = |v: DVec3| {
      DVec3::new(
        round_to(v.x, precision),
        round_to(v.y, precision),
        round_to(v.z, precision),
      )
    };
    rnd(self.transform(a).rotation) == rnd(-self.transform(b).rotation)
  }

  fn rewrite(&mut self, id: NodeId) -> Result<()> {
    if !self.eligible(id) {
      return Ok(());
    }
    let props = self.props(id)?;
    let children = self.effective_children(id);

    if props.is_empty() || self.graph.children(id).is_empty() {
      self.remove(id, Removal::Empty);
      return Ok(());
    }
    if !self.options.aggressive {
      // Everything below was pruned, the group would be left dangling.
      if children.is_empty() {
        self.remove(id, Removal::Empty);
      }
      return Ok(());
    }

    if let &[child] = children.as_slice() {
      let child_props = self.props(child)?;
      let same_kind = self.classifier.kind(child) == self.classifier.kind(id);

      if same_kind && props.only(PropKey::Rotation) && self.rotations_cancel(id, child) {
        if !self.eligible_child(child) {
          debug!(
            "gltfjsx: rotation of [{}] cancels against [{}], which must stay. Skipped.",
            self.classifier.name(id),
            self.classifier.name(child)
          );
        } else if child_props.only(PropKey::Rotation) {
          self.restore(child);
          self.remove(id, Removal::DoubleNegative);
          self.remove(child, Removal::DoubleNegative);
          return Ok(());
        } else {
          self.restore(child);
          self.remove(id, Removal::DoubleNegative);
          let mut transform = self.transform(child);
          transform.rotation = DVec3::ZERO;
          self.states[child.0].transform = Some(transform);
          return self.rewrite(child);
        }
      }

      let child_kind = self.classifier.kind(child);
      if props.only_transform()
        && !child_props.has_transform()
        && !child_kind.is_bone()
        && !self.classifier.is_animation_relevant(child)
      {
        let previous = self.states[child.0].transform;
        self.states[child.0].transform = Some(self.transform(id));
        self.states[id.0].pushed = Some((child, previous));
        self.remove(id, Removal::TransformOverlap);
        return self.rewrite(child);
      }
    }

    let subtree = self.graph.traverse(id);
    let has_content = subtree.iter().any(|node| {
      !self.classifier.kind(*node).is_group() || self.classifier.is_animation_relevant(*node)
    });
    if !has_content {
      for node in subtree {
        if self.states[node.0].removal.is_none() {
          self.remove(node, Removal::NoContent);
        } else {
          self.states[node.0].removal = Some(Removal::NoContent);
        }
      }
    }
    Ok(())
  }

  /// A nested group that may be pruned along with its parent, even when already folded.
  fn eligible_child(&self, id: NodeId) -> bool {
    !self.options.keepgroups
      && self.classifier.kind(id).is_group()
      && !self.classifier.is_animation_relevant(id)
  }
}
