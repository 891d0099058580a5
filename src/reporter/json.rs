use super::RankView;
use crate::graph::{CallGraph, Node, NodeId};
use crate::registry::HashRegistry;

/// One node in the JSON tree (schema).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JsonNode {
    pub hash: u64,
    pub label: String,
    pub depth: usize,
    pub laps: u64,
    pub value: f64,
    pub accum: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
    pub unit: String,
    pub children: Vec<JsonNode>,
}

/// One rank (thread) section of the JSON report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JsonRank {
    pub tid: u64,
    pub graph: Vec<JsonNode>,
}

/// The top-level JSON document (schema).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    pub ranks: Vec<JsonRank>,
}

fn node_to_json(graph: &CallGraph, id: NodeId, node: &Node, registry: &HashRegistry) -> JsonNode {
    let label = registry.label_of(node.hash()).unwrap_or_else(|| format!("<{:#x}>", node.hash()));
    let children = node
        .children()
        .map(|child_id| node_to_json(graph, child_id, graph.node(child_id), registry))
        .collect();
    JsonNode {
        hash: node.hash(),
        label,
        depth: node.depth(),
        laps: node.laps(),
        value: node.data().record(),
        accum: node.data().accum(),
        min: node.data().min(),
        max: node.data().max(),
        stddev: node.data().stddev(),
        unit: node.data().unit().to_string(),
        children,
    }
}

pub(super) fn build(ranks: &[RankView<'_>], registry: &HashRegistry) -> Report {
    let json_ranks = ranks
        .iter()
        .map(|rank| {
            let graph = rank.graph.node(rank.graph.root());
            let children = graph
                .children()
                .map(|id| node_to_json(rank.graph, id, rank.graph.node(id), registry))
                .collect();
            JsonRank {
                tid: rank.tid,
                graph: children,
            }
        })
        .collect();
    Report { ranks: json_ranks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, WallClock};
    use crate::graph::{Bookmark, ScopeMode};
    use crate::registry::HashRegistry;

    #[test]
    fn builds_nested_json_preserving_depth_and_laps() {
        let registry = HashRegistry::new();
        let hash = registry.intern("outer").unwrap();
        let child_hash = registry.intern("inner").unwrap();

        let mut graph = CallGraph::new(1, Bookmark::default());
        let outer = graph.insert(hash, ScopeMode::Tree, || Box::new(WallClock::default()) as Box<dyn Component>);
        let inner = graph.insert(child_hash, ScopeMode::Tree, || {
            Box::new(WallClock::default()) as Box<dyn Component>
        });
        graph.pop(inner);
        graph.pop(outer);

        let ranks = vec![RankView { tid: graph.tid(), graph: &graph }];
        let report = build(&ranks, &registry);

        assert_eq!(report.ranks.len(), 1);
        assert_eq!(report.ranks[0].tid, 1);
        assert_eq!(report.ranks[0].graph.len(), 1);
        let outer_json = &report.ranks[0].graph[0];
        assert_eq!(outer_json.label, "outer");
        assert_eq!(outer_json.depth, 1);
        assert_eq!(outer_json.children.len(), 1);
        assert_eq!(outer_json.children[0].label, "inner");
        assert_eq!(outer_json.children[0].depth, 2);
    }
}
