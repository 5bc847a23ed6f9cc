//! Knowledge graph over petgraph
//!
//! Node identity is the trimmed entity label: every triplet naming the same
//! label attaches to the same node. Parallel edges are kept, one per triplet.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cti_core::{AnnotationDocument, CtiError, Result, Triplet};

use crate::TripletSink;

/// Directed multigraph of entities and relations
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<String, String>,
    index: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one graph from the triplets of many documents
    pub fn from_documents<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a AnnotationDocument>,
    {
        let mut graph = Self::new();
        for document in documents {
            let triplets: Vec<Triplet> = document.triplets().collect();
            let added = graph.extend_triplets(&triplets);
            debug!(added, total = triplets.len(), "Added document triplets to graph");
        }
        graph
    }

    fn node(&mut self, label: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(label) {
            return idx;
        }
        let idx = self.graph.add_node(label.to_string());
        self.index.insert(label.to_string(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label.trim())
    }

    /// Outgoing (relation, object) pairs of an entity, in insertion order
    pub fn relations(&self, subject: &str) -> Vec<(String, String)> {
        let Some(&idx) = self.index.get(subject.trim()) else {
            return Vec::new();
        };

        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.weight().clone(), self.graph[e.target()].clone()))
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);

        edges.into_iter().map(|(_, rel, obj)| (rel, obj)).collect()
    }

    /// Entities reachable from `entity` within `depth` hops, including itself
    ///
    /// Labels are returned sorted.
    pub fn related_nodes(&self, entity: &str, depth: usize) -> Result<Vec<String>> {
        let start = *self
            .index
            .get(entity.trim())
            .ok_or_else(|| CtiError::NotFound(format!("Entity not in graph: {entity}")))?;

        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([(start, 0usize)]);

        while let Some((idx, dist)) = queue.pop_front() {
            if dist == depth {
                continue;
            }
            for next in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if visited.insert(next) {
                    queue.push_back((next, dist + 1));
                }
            }
        }

        let mut labels: Vec<String> = visited.into_iter().map(|i| self.graph[i].clone()).collect();
        labels.sort();
        Ok(labels)
    }

    /// Case-insensitive substring search of node labels, per keyword
    pub fn search(&self, keywords: &[&str]) -> BTreeMap<String, Vec<String>> {
        keywords
            .iter()
            .map(|kw| {
                let needle = kw.to_lowercase();
                let hits = self
                    .graph
                    .node_indices()
                    .map(|i| &self.graph[i])
                    .filter(|label| label.to_lowercase().contains(&needle))
                    .cloned()
                    .collect();
                (kw.to_string(), hits)
            })
            .collect()
    }

    /// Node and edge elements for a graph viewer
    pub fn elements(&self) -> Vec<GraphElement> {
        let nodes = self.graph.node_indices().map(|i| GraphElement::Node {
            data: NodeData {
                id: self.graph[i].clone(),
                label: self.graph[i].clone(),
            },
            classes: "entity-node".to_string(),
        });

        let edges = self.graph.edge_references().map(|e| GraphElement::Edge {
            data: EdgeData {
                source: self.graph[e.source()].clone(),
                target: self.graph[e.target()].clone(),
                label: e.weight().clone(),
            },
            classes: "relation-edge".to_string(),
        });

        nodes.chain(edges).collect()
    }

    /// Write the graph as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = GraphSnapshot {
            nodes: self.graph.node_weights().cloned().collect(),
            edges: self
                .graph
                .edge_references()
                .map(|e| EdgeData {
                    source: self.graph[e.source()].clone(),
                    target: self.graph[e.target()].clone(),
                    label: e.weight().clone(),
                })
                .collect(),
        };

        let content = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| CtiError::Graph(format!("Failed to serialize graph: {e}")))?;
        std::fs::write(path, content).map_err(|e| CtiError::io(path, e))
    }

    /// Read a graph written by [`KnowledgeGraph::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CtiError::io(path, e))?;
        let snapshot: GraphSnapshot = serde_json::from_str(&content)
            .map_err(|e| CtiError::Graph(format!("Invalid graph file {}: {e}", path.display())))?;

        let mut graph = Self::new();
        for label in &snapshot.nodes {
            graph.node(label);
        }
        for edge in snapshot.edges {
            let (Some(&source), Some(&target)) =
                (graph.index.get(&edge.source), graph.index.get(&edge.target))
            else {
                return Err(CtiError::Graph(format!(
                    "Edge {} -> {} references an unknown node",
                    edge.source, edge.target
                )));
            };
            graph.graph.add_edge(source, target, edge.label);
        }

        Ok(graph)
    }
}

impl TripletSink for KnowledgeGraph {
    fn add_triplet(&mut self, triplet: &Triplet) -> bool {
        if !triplet.is_complete() {
            debug!(?triplet, "Skipping incomplete triplet");
            return false;
        }

        let subject = self.node(triplet.subject.trim());
        let object = self.node(triplet.object.trim());
        self.graph
            .add_edge(subject, object, triplet.relation.trim().to_string());
        true
    }
}

/// Viewer element describing a node or an edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GraphElement {
    Node { data: NodeData, classes: String },
    Edge { data: EdgeData, classes: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeData {
    pub source: String,
    pub target: String,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GraphSnapshot {
    nodes: Vec<String>,
    edges: Vec<EdgeData>,
}
