use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use indexmap::{IndexMap, IndexSet};

use crate::error::{Error, Result};

/// Handle to a node registered in a [`Graph`]. The handle remembers which
/// graph minted it, so connecting nodes across graph instances fails instead
/// of silently corrupting the indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    graph: u32,
    index: u32,
}

/// Handle to a directed, named link between two nodes of the same graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId {
    graph: u32,
    index: u32,
}

/// A directed, named, attributed link from an owner node to a resource node.
#[derive(Debug, Clone)]
pub struct Edge<A> {
    pub name: String,
    pub owner: NodeId,
    pub target: NodeId,
    pub attrs: A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Changed,
    Disposed,
}

/// Structured mutation record published by the graph. Consumers drain the
/// queue with [`Graph::take_events`]; there are no per-node listener lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEvent {
    pub node: NodeId,
    pub kind: EventKind,
}

/// The event queue is bounded; once full, the oldest events are dropped.
const EVENT_CAPACITY: usize = 1024;

static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(1);

/// Bidirectional reference-tracking engine. Owns the set of edges between
/// nodes and answers parent/child queries in O(1) average time through
/// parallel indices keyed by owner and by target.
///
/// The graph does not prevent cycles; only the node/scene tree maintained on
/// top of it is guaranteed acyclic by its own rules.
pub struct Graph<A> {
    id: u32,
    next_node: u32,
    next_edge: u32,
    nodes: IndexSet<NodeId>,
    edges: IndexMap<EdgeId, Edge<A>>,
    outgoing: IndexMap<NodeId, IndexSet<EdgeId>>,
    incoming: IndexMap<NodeId, IndexSet<EdgeId>>,
    events: VecDeque<GraphEvent>,
}

impl<A> Graph<A> {
    pub fn new() -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            next_node: 0,
            next_edge: 0,
            nodes: IndexSet::new(),
            edges: IndexMap::new(),
            outgoing: IndexMap::new(),
            incoming: IndexMap::new(),
            events: VecDeque::new(),
        }
    }

    /// Registers a new node and publishes a `Created` event.
    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId {
            graph: self.id,
            index: self.next_node,
        };
        self.next_node += 1;
        self.nodes.insert(id);
        self.outgoing.insert(id, IndexSet::new());
        self.incoming.insert(id, IndexSet::new());
        self.push_event(GraphEvent {
            node: id,
            kind: EventKind::Created,
        });
        id
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Creates an edge between two live nodes of this graph.
    pub fn connect(
        &mut self,
        name: impl Into<String>,
        owner: NodeId,
        target: NodeId,
        attrs: A,
    ) -> Result<EdgeId> {
        if owner.graph != self.id || target.graph != self.id {
            return Err(Error::GraphMismatch);
        }
        if !self.contains(owner) || !self.contains(target) {
            return Err(Error::StaleProperty);
        }

        let id = EdgeId {
            graph: self.id,
            index: self.next_edge,
        };
        self.next_edge += 1;
        self.edges.insert(
            id,
            Edge {
                name: name.into(),
                owner,
                target,
                attrs,
            },
        );
        self.outgoing[&owner].insert(id);
        self.incoming[&target].insert(id);
        Ok(id)
    }

    /// Removes an edge from both indices. Disposing an already-disposed edge
    /// is a no-op.
    pub fn disconnect(&mut self, edge: EdgeId) {
        if let Some(removed) = self.edges.swap_remove(&edge) {
            if let Some(set) = self.outgoing.get_mut(&removed.owner) {
                set.swap_remove(&edge);
            }
            if let Some(set) = self.incoming.get_mut(&removed.target) {
                set.swap_remove(&edge);
            }
        }
    }

    /// Points an existing edge at a different target, preserving the edge
    /// name and attributes. Used when one resource is swapped for another.
    pub fn retarget(&mut self, edge: EdgeId, target: NodeId) -> Result<()> {
        if target.graph != self.id {
            return Err(Error::GraphMismatch);
        }
        if !self.contains(target) {
            return Err(Error::StaleProperty);
        }
        let old_target = match self.edges.get_mut(&edge) {
            Some(e) => std::mem::replace(&mut e.target, target),
            None => return Err(Error::StaleProperty),
        };
        self.incoming[&old_target].swap_remove(&edge);
        self.incoming[&target].insert(edge);
        Ok(())
    }

    pub fn edge(&self, edge: EdgeId) -> Option<&Edge<A>> {
        self.edges.get(&edge)
    }

    pub fn target_of(&self, edge: EdgeId) -> Option<NodeId> {
        self.edges.get(&edge).map(|e| e.target)
    }

    pub fn list_children(&self, node: NodeId) -> Vec<NodeId> {
        self.outgoing
            .get(&node)
            .map(|set| set.iter().map(|e| self.edges[e].target).collect())
            .unwrap_or_default()
    }

    pub fn list_parents(&self, node: NodeId) -> Vec<NodeId> {
        self.incoming
            .get(&node)
            .map(|set| set.iter().map(|e| self.edges[e].owner).collect())
            .unwrap_or_default()
    }

    pub fn incoming_edges(&self, node: NodeId) -> Vec<EdgeId> {
        self.incoming
            .get(&node)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn outgoing_edges(&self, node: NodeId) -> Vec<EdgeId> {
        self.outgoing
            .get(&node)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Severs the inbound edges of `node` that match `filter`, leaving the
    /// node usable as a subtree. Returns the severed edges along with their
    /// owners so the caller can clear the owners' reference slots.
    pub fn disconnect_parents(
        &mut self,
        node: NodeId,
        mut filter: impl FnMut(&Edge<A>) -> bool,
    ) -> Vec<(EdgeId, NodeId)> {
        let candidates = self.incoming_edges(node);
        let mut severed = Vec::new();
        for edge in candidates {
            let keep = match self.edges.get(&edge) {
                Some(e) => !filter(e),
                None => continue,
            };
            if keep {
                continue;
            }
            let owner = self.edges[&edge].owner;
            self.disconnect(edge);
            severed.push((edge, owner));
        }
        severed
    }

    /// Unregisters a node, severing every edge in both directions, and
    /// publishes a `Disposed` event. Returns the severed inbound edges with
    /// their owners for slot cleanup.
    pub fn remove_node(&mut self, node: NodeId) -> Vec<(EdgeId, NodeId)> {
        let severed = self.disconnect_parents(node, |_| true);
        for edge in self.outgoing_edges(node) {
            self.disconnect(edge);
        }
        self.nodes.swap_remove(&node);
        self.outgoing.swap_remove(&node);
        self.incoming.swap_remove(&node);
        self.push_event(GraphEvent {
            node,
            kind: EventKind::Disposed,
        });
        severed
    }

    /// Publishes a `Changed` event for a mutated node.
    pub fn touch(&mut self, node: NodeId) {
        self.push_event(GraphEvent {
            node,
            kind: EventKind::Changed,
        });
    }

    /// Drains all pending mutation events.
    pub fn take_events(&mut self) -> Vec<GraphEvent> {
        self.events.drain(..).collect()
    }

    fn push_event(&mut self, event: GraphEvent) {
        if self.events.len() == EVENT_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

impl<A> Default for Graph<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn edge_symmetry() {
        let mut graph: Graph<()> = Graph::new();
        let owner = graph.add_node();
        let resource = graph.add_node();

        let edge = graph.connect("child", owner, resource, ()).unwrap();
        assert_eq!(vec![resource], graph.list_children(owner));
        assert_eq!(vec![owner], graph.list_parents(resource));

        graph.disconnect(edge);
        assert!(graph.list_children(owner).is_empty());
        assert!(graph.list_parents(resource).is_empty());

        // Disposal is idempotent.
        graph.disconnect(edge);
        assert!(graph.list_children(owner).is_empty());
    }

    #[test]
    fn rejects_cross_graph_edges() {
        let mut a: Graph<()> = Graph::new();
        let mut b: Graph<()> = Graph::new();
        let owner = a.add_node();
        let stranger = b.add_node();

        assert!(matches!(
            a.connect("child", owner, stranger, ()),
            Err(Error::GraphMismatch)
        ));
    }

    #[test]
    fn disconnect_parents_is_filtered() {
        let mut graph: Graph<u8> = Graph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let child = graph.add_node();

        graph.connect("left", a, child, 1).unwrap();
        graph.connect("right", b, child, 2).unwrap();

        let severed = graph.disconnect_parents(child, |edge| edge.attrs == 1);
        assert_eq!(1, severed.len());
        assert_eq!(a, severed[0].1);
        assert_eq!(vec![b], graph.list_parents(child));
    }

    #[test]
    fn remove_node_severs_both_directions() {
        let mut graph: Graph<()> = Graph::new();
        let parent = graph.add_node();
        let node = graph.add_node();
        let child = graph.add_node();

        graph.connect("child", parent, node, ()).unwrap();
        graph.connect("child", node, child, ()).unwrap();

        let severed = graph.remove_node(node);
        assert_eq!(1, severed.len());
        assert_eq!(parent, severed[0].1);
        assert!(graph.list_children(parent).is_empty());
        assert!(graph.list_parents(child).is_empty());
        assert!(!graph.contains(node));
    }

    #[test]
    fn retarget_preserves_attrs() {
        let mut graph: Graph<u8> = Graph::new();
        let owner = graph.add_node();
        let old = graph.add_node();
        let new = graph.add_node();

        let edge = graph.connect("ref", owner, old, 7).unwrap();
        graph.retarget(edge, new).unwrap();

        assert!(graph.list_parents(old).is_empty());
        assert_eq!(vec![owner], graph.list_parents(new));
        assert_eq!(7, graph.edge(edge).unwrap().attrs);
    }

    #[test]
    fn publishes_mutation_events() {
        let mut graph: Graph<()> = Graph::new();
        let node = graph.add_node();
        graph.touch(node);
        graph.remove_node(node);

        let kinds: Vec<_> = graph.take_events().iter().map(|e| e.kind).collect();
        assert_eq!(
            vec![EventKind::Created, EventKind::Changed, EventKind::Disposed],
            kinds
        );
        assert!(graph.take_events().is_empty());
    }
}
