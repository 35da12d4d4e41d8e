//! Graphviz (DOT) rendering of a workflow graph.

use crate::graph::{GraphNode, NodeResolver};
use hataori_core::NodeRole;
use std::collections::HashSet;

const SUCCESS: &str = "Success";
const FAIL: &str = "Fail";

/// Renders the graph reachable from `start` as a DOT digraph.
///
/// Sentinel nodes are yellow ellipses. Nodes with several edges, or a single
/// edge other than `Success`, get a gray decision diamond. Each transition into
/// `fail` is drawn as its own red `"<node> fail"` box.
pub fn render<C>(resolver: &dyn NodeResolver<C>, start: &GraphNode<C>) -> String {
    let mut generator = GraphvizGenerator {
        resolver,
        visited: HashSet::new(),
        lines: Vec::new(),
    };
    generator.visit(start);
    format!(
        "digraph {{\ngraph [ resolution=64];\n\n{}\n}}",
        generator.lines.join("\n")
    )
}

struct GraphvizGenerator<'a, C> {
    resolver: &'a dyn NodeResolver<C>,
    visited: HashSet<String>,
    lines: Vec<String>,
}

impl<C> GraphvizGenerator<'_, C> {
    fn visit(&mut self, node: &GraphNode<C>) {
        self.visited.insert(node.name().to_string());
        let name = node.name().as_str();

        if node.role() != NodeRole::Fail {
            let shape = match node.role() {
                NodeRole::Start | NodeRole::End => "ellipse, style=filled,fillcolor=\"yellow\"",
                _ => "box",
            };
            self.lines
                .push(format!("\"{name}\" [label=\"{name}\", shape={shape}]"));
        }

        let edges = node.edges();
        let decision = edges.len() > 1 || edges.iter().any(|edge| edge.description() != SUCCESS);
        if decision {
            self.lines.push(format!("\"{name}\"->\"{name} decision\""));
            self.lines.push(format!(
                "\"{name} decision\" [shape=diamond, label=\"\",style=filled,fillcolor=\"gray\"]"
            ));
        }

        let resolver = self.resolver;
        let mut ordered: Vec<_> = edges.iter().collect();
        ordered.sort_by_key(|edge| edge.description() == FAIL);

        for edge in ordered {
            let Some(next) = resolver.resolve(edge.target().as_str()) else {
                continue;
            };

            let mut target = next.name().to_string();
            if next.role() == NodeRole::Fail {
                self.lines.push(format!(
                    "\"{name} fail\" [label=\"fail\",style=filled,fillcolor=\"red\"]"
                ));
                target = format!("{name} fail");
            }

            let label = match edge.description() {
                SUCCESS => "",
                other => other,
            };
            let from = if decision {
                format!("{name} decision")
            } else {
                name.to_string()
            };
            self.lines
                .push(format!("\"{from}\"->\"{target}\"  [label=\"{label}\"]"));

            if !self.visited.contains(next.name().as_str()) {
                self.visit(next);
            }
        }
    }
}
