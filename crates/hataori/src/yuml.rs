//! yUML text rendering of a workflow graph.
//!
//! Two flavours are produced: the activity-diagram form, where nodes are
//! `(activities)` and branching nodes get a `<decision>`, and the class-diagram
//! form, one `[from]Label->[to]` line per edge.

use crate::graph::{GraphNode, NodeResolver};
use std::collections::HashSet;

/// Renders the graph reachable from `start` as a comma separated yUML
/// activity diagram.
///
/// Nodes with more than one edge route through a `<name decision>` and label
/// each outgoing edge with its description. Cyrillic names and labels are
/// transliterated to Latin.
pub fn render_activity<C>(resolver: &dyn NodeResolver<C>, start: &GraphNode<C>) -> String {
    let mut generator = ActivityGenerator {
        resolver,
        visited: HashSet::new(),
    };
    generator.visit(start)
}

/// Renders the graph reachable from `start` as yUML class-diagram lines.
pub fn render_class<C>(resolver: &dyn NodeResolver<C>, start: &GraphNode<C>) -> String {
    let mut generator = ClassGenerator {
        resolver,
        visited: HashSet::new(),
        out: String::new(),
    };
    generator.visit(start);
    generator.out
}

struct ActivityGenerator<'a, C> {
    resolver: &'a dyn NodeResolver<C>,
    visited: HashSet<String>,
}

impl<C> ActivityGenerator<'_, C> {
    fn visit(&mut self, node: &GraphNode<C>) -> String {
        self.visited.insert(node.name().to_string());

        let edges = node.edges();
        let name = transliterate(node.name().as_str());
        let decision = edges.len() > 1;
        let from = if decision {
            format!("<{name} decision>")
        } else {
            format!("({name})")
        };

        let mut parts = Vec::new();
        if decision {
            parts.push(format!("({name})-><{name} decision>"));
        }

        let resolver = self.resolver;
        for edge in edges {
            let Some(next) = resolver.resolve(edge.target().as_str()) else {
                continue;
            };

            let label = if decision && !edge.description().is_empty() {
                transliterate(&format!("[{}]", edge.description()))
            } else {
                String::new()
            };
            parts.push(format!(
                "{from}{label}->({})",
                transliterate(next.name().as_str())
            ));

            if !self.visited.contains(next.name().as_str()) {
                let nested = self.visit(next);
                if !nested.is_empty() {
                    parts.push(nested);
                }
            }
        }
        parts.join(",")
    }
}

struct ClassGenerator<'a, C> {
    resolver: &'a dyn NodeResolver<C>,
    visited: HashSet<String>,
    out: String,
}

impl<C> ClassGenerator<'_, C> {
    fn visit(&mut self, node: &GraphNode<C>) {
        self.visited.insert(node.name().to_string());

        let resolver = self.resolver;
        for edge in node.edges() {
            let Some(next) = resolver.resolve(edge.target().as_str()) else {
                continue;
            };
            self.out.push_str(&format!(
                "[{}]{}->[{}]\n",
                node.name(),
                edge.description(),
                edge.target()
            ));
            if !self.visited.contains(next.name().as_str()) {
                self.visit(next);
            }
        }
    }
}

/// Replaces Cyrillic letters with their Latin spelling.
fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match latin(c) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    out
}

fn latin(c: char) -> Option<&'static str> {
    let spelled = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "c",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shh",
        'ъ' | 'ь' => "",
        'ы' => "i",
        'э' => "e",
        'ю' => "u",
        'я' => "ya",
        'А' => "A",
        'Б' => "B",
        'В' => "V",
        'Г' => "G",
        'Д' => "D",
        'Е' => "E",
        'Ж' => "ZH",
        'З' => "Z",
        'И' => "I",
        'Й' => "Y",
        'К' => "K",
        'Л' => "L",
        'М' => "M",
        'Н' => "N",
        'О' => "O",
        'П' => "P",
        'Р' => "R",
        'С' => "S",
        'Т' => "T",
        'У' => "U",
        'Ф' => "F",
        'Х' => "H",
        'Ц' => "C",
        'Ч' => "CH",
        'Ш' => "SH",
        'Щ' => "SHH",
        'Ъ' | 'Ь' => "",
        'Ы' => "I",
        'Э' => "E",
        'Ю' => "U",
        'Я' => "YA",
        _ => return None,
    };
    Some(spelled)
}
