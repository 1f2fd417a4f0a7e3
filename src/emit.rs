use crate::classify::Classifier;
use crate::error::Result;
use crate::options::Options;
use crate::props::serialize;
use crate::scene::{NodeId, SceneGraph};

/// Renders a pruned scene graph as nested JSX elements.
pub struct Emitter<'a, 'b> {
  graph: &'a SceneGraph,
  classifier: &'b Classifier<'a>,
  options: &'b Options,
}

impl<'a, 'b> Emitter<'a, 'b> {
  pub fn new(classifier: &'b Classifier<'a>, options: &'b Options) -> Self {
    Emitter {
      graph: classifier.graph(),
      classifier,
      options,
    }
  }

  ///
  /// Markup for `id` and everything below it, one element per line,
  /// indented two spaces per level starting at `depth`.
  ///
  pub fn emit(&self, id: NodeId, depth: usize) -> Result<String> {
    let mut out = String::new();
    self.write(id, depth, &mut out)?;
    Ok(out)
  }

  fn write(&self, id: NodeId, depth: usize, out: &mut String) -> Result<()> {
    // Only the root can still be removed here. Its children take its place.
    if self.graph.is_removed(id) {
      for child in self.graph.children(id) {
        self.write(*child, depth, out)?;
      }
      return Ok(());
    }

    let info = self.classifier.info(id);
    let indent = "  ".repeat(depth);

    if info.kind.is_bone() {
      out.push_str(&format!("{}<primitive object={{{}}} />\n", indent, info.node));
      return Ok(());
    }

    let tag = match info.instance {
      Some(duplicate) => format!("instances.{}", duplicate.name),
      None => info.kind.tag().to_string(),
    };

    let mut open = format!("{}<{}", indent, tag);
    let named = self.options.keepnames || info.animation_relevant;
    if named && !info.name.is_empty() {
      open.push_str(&format!(" name={}", name_attribute(info.name)));
    }
    let props = serialize(self.graph, id, &info, &self.graph.node(id).transform, self.options)?;
    if !props.is_empty() {
      open.push(' ');
      open.push_str(&props.to_string());
    }

    let children = self.graph.children(id);
    if children.is_empty() {
      out.push_str(&open);
      out.push_str(" />\n");
      return Ok(());
    }

    out.push_str(&open);
    out.push_str(">\n");
    for child in children {
      self.write(*child, depth + 1, out)?;
    }
    out.push_str(&format!("{}</{}>\n", indent, tag));
    Ok(())
  }
}

/// `"name"`, or a JSON string expression when the name holds a quote.
fn name_attribute(name: &str) -> String {
  if name.contains('"') {
    format!("{{{}}}", serde_json::Value::String(name.to_string()))
  } else {
    format!("\"{}\"", name)
  }
}
