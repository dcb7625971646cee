use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use log::debug;

use crate::config::ConfigArena;
use crate::semantics::{EdgeLabel, TransitionData};
use crate::sim::SimCache;
use crate::state::{CoverPred, State};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct EdgeId(u32);

impl EdgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Exploration status of a node. `Subsumed` is terminal: a node covered by
/// another node must never be expanded.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NodeStatus {
    Unexpanded,
    Expanding,
    Expanded,
    Subsumed,
}

/// Which existing nodes are candidates for covering a new state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CoveringPolicy {
    /// Any non-subsumed node may cover.
    Full,
    /// Only nodes without outgoing edges may cover.
    LeafOnly,
}

/// Outcome of a covering lookup.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Lookup {
    /// The state was new and is now the given node.
    Inserted(NodeId),
    /// The state is covered by the given existing node; nothing was inserted.
    Covered(NodeId),
}

impl Lookup {
    pub fn node(self) -> NodeId {
        match self {
            Lookup::Inserted(id) | Lookup::Covered(id) => id,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EdgeKind {
    /// A discrete transition actually taken by the exploration.
    Actual,
    /// A subsumption link from a covered state to its coverer.
    Covering,
}

#[derive(Debug)]
pub struct Edge {
    src: NodeId,
    tgt: NodeId,
    kind: EdgeKind,
    /// `None` only for subsumption links established after the fact.
    label: Option<EdgeLabel>,
}

impl Edge {
    pub fn src(&self) -> NodeId {
        self.src
    }

    pub fn tgt(&self) -> NodeId {
        self.tgt
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    pub fn label(&self) -> Option<EdgeLabel> {
        self.label
    }
}

struct Node {
    state: State,
    status: NodeStatus,
    initial: bool,
    is_final: bool,
    out: Vec<EdgeId>,
    /// First incoming actual edge, for counterexample reconstruction.
    parent: Option<EdgeId>,
}

/// The covering graph: symbolic-state nodes, actual and covering edges, and
/// the covering lookup that decides insertion versus subsumption.
///
/// Nodes are bucketed by the discrete hash of their state, so a lookup only
/// scans states sharing the discrete configuration's hash. The covering test
/// itself is fixed at construction (plain inclusion, or relaxed through a
/// simulation cache); every accepted edge synchronously feeds the cache.
pub struct Graph {
    dim: usize,
    policy: CoveringPolicy,
    cover: CoverPred,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// Chain link per node (1-based bucket encoding, 0 = end of chain).
    next: Vec<u32>,
    buckets: Vec<u32>,
    bitmask: u64,
}

impl Graph {
    /// Create a graph over zones of dimension `dim` with `2^bits` hash
    /// buckets. Passing a cache selects the relaxed covering test.
    pub fn new(dim: usize, policy: CoveringPolicy, bits: usize, cache: Option<SimCache>) -> Self {
        assert!(bits <= 31, "Graph bits should be in the range 0..=31");
        let cover = match cache {
            Some(cache) => {
                assert_eq!(
                    cache.dim(),
                    dim,
                    "Zone dimension mismatch: {} vs {}",
                    cache.dim(),
                    dim
                );
                CoverPred::Relaxed(cache)
            }
            None => CoverPred::Inclusion,
        };
        let size = 1usize << bits;
        Self {
            dim,
            policy,
            cover,
            nodes: Vec::new(),
            edges: Vec::new(),
            next: Vec::new(),
            buckets: vec![0; size],
            bitmask: (size - 1) as u64,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn state(&self, id: NodeId) -> &State {
        &self.nodes[id.index()].state
    }

    pub fn status(&self, id: NodeId) -> NodeStatus {
        self.nodes[id.index()].status
    }

    pub fn set_initial(&mut self, id: NodeId) {
        self.nodes[id.index()].initial = true;
    }

    pub fn is_initial(&self, id: NodeId) -> bool {
        self.nodes[id.index()].initial
    }

    pub fn set_final(&mut self, id: NodeId) {
        self.nodes[id.index()].is_final = true;
    }

    pub fn is_final(&self, id: NodeId) -> bool {
        self.nodes[id.index()].is_final
    }

    pub fn cache(&self) -> Option<&SimCache> {
        self.cover.cache()
    }

    /// Covering lookup: scan the bucket of states sharing `state`'s discrete
    /// hash for a node covering it; the first sound coverer wins. Without a
    /// coverer the state becomes a new unexpanded node.
    pub fn find_or_insert(&mut self, state: State) -> Lookup {
        assert_eq!(
            state.zone().dim(),
            self.dim,
            "Zone dimension mismatch: {} vs {}",
            state.zone().dim(),
            self.dim
        );
        let bucket = (state.discrete_hash() & self.bitmask) as usize;
        let mut slot = self.buckets[bucket];
        while slot != 0 {
            let entry = (slot - 1) as usize;
            let node = &self.nodes[entry];
            if self.is_candidate(node) && self.cover.covers(&state, &node.state) {
                debug!("graph: state at {} covered by n{}", state.cfg(), entry);
                return Lookup::Covered(NodeId(entry as u32));
            }
            slot = self.next[entry];
        }
        let entry = self.nodes.len();
        self.nodes.push(Node {
            state,
            status: NodeStatus::Unexpanded,
            initial: false,
            is_final: false,
            out: Vec::new(),
            parent: None,
        });
        self.next.push(self.buckets[bucket]);
        self.buckets[bucket] = (entry + 1) as u32;
        debug!("graph: inserted n{}", entry);
        Lookup::Inserted(NodeId(entry as u32))
    }

    fn is_candidate(&self, node: &Node) -> bool {
        if node.status == NodeStatus::Subsumed {
            return false;
        }
        match self.policy {
            CoveringPolicy::Full => true,
            CoveringPolicy::LeafOnly => node.out.is_empty(),
        }
    }

    /// Re-test an unexpanded node against the rest of the graph. Invariants
    /// may have strengthened since the node was inserted, so a node that was
    /// not covered then may be covered now. On success the node is marked
    /// subsumed and linked to its coverer.
    pub fn recheck_cover(&mut self, id: NodeId) -> Option<NodeId> {
        assert_eq!(
            self.nodes[id.index()].status,
            NodeStatus::Unexpanded,
            "Only unexpanded nodes can be re-checked for covering"
        );
        let bucket = (self.nodes[id.index()].state.discrete_hash() & self.bitmask) as usize;
        let mut slot = self.buckets[bucket];
        let mut coverer = None;
        while slot != 0 {
            let entry = (slot - 1) as usize;
            let node = &self.nodes[entry];
            if entry != id.index()
                && self.is_candidate(node)
                && self.cover.covers(&self.nodes[id.index()].state, &node.state)
            {
                coverer = Some(NodeId(entry as u32));
                break;
            }
            slot = self.next[entry];
        }
        let by = coverer?;
        debug!("graph: {} subsumed by {}", id, by);
        self.nodes[id.index()].status = NodeStatus::Subsumed;
        self.push_edge(id, by, EdgeKind::Covering, None);
        Some(by)
    }

    /// Mark a node as currently generating its successors.
    pub fn start_expansion(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.index()];
        assert_eq!(
            node.status,
            NodeStatus::Unexpanded,
            "Node {} is not unexpanded",
            id
        );
        node.status = NodeStatus::Expanding;
    }

    /// Mark a node whose successors have all been processed.
    pub fn finish_expansion(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.index()];
        assert_eq!(
            node.status,
            NodeStatus::Expanding,
            "Node {} is not being expanded",
            id
        );
        node.status = NodeStatus::Expanded;
    }

    /// Record the edge behind a successor computation. The edge is `Actual`
    /// when the successor was freshly inserted and `Covering` when it was
    /// subsumed by an existing node. Either way the transition flows into
    /// the simulation cache; by the time this returns, the cache has been
    /// re-stabilized.
    pub fn add_edge(&mut self, src: NodeId, tgt: Lookup, data: TransitionData) -> EdgeId {
        let (tgt_id, kind) = match tgt {
            Lookup::Inserted(id) => (id, EdgeKind::Actual),
            Lookup::Covered(id) => (id, EdgeKind::Covering),
        };
        let eid = self.push_edge(src, tgt_id, kind, Some(data.label));
        if kind == EdgeKind::Actual && self.nodes[tgt_id.index()].parent.is_none() {
            self.nodes[tgt_id.index()].parent = Some(eid);
        }
        let src_cfg = self.nodes[src.index()].state.cfg();
        let tgt_cfg = self.nodes[tgt_id.index()].state.cfg();
        if let Some(cache) = self.cover.cache_mut() {
            cache.record_transition(src_cfg, tgt_cfg, data);
        }
        eid
    }

    fn push_edge(
        &mut self,
        src: NodeId,
        tgt: NodeId,
        kind: EdgeKind,
        label: Option<EdgeLabel>,
    ) -> EdgeId {
        let eid = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            src,
            tgt,
            kind,
            label,
        });
        self.nodes[src.index()].out.push(eid);
        eid
    }

    /// The actual edge through which `id` was first reached, if any.
    /// Following these links from a final node leads back to an initial one.
    pub fn actual_parent(&self, id: NodeId) -> Option<(NodeId, EdgeLabel)> {
        let eid = self.nodes[id.index()].parent?;
        let edge = &self.edges[eid.index()];
        Some((edge.src, edge.label.unwrap()))
    }

    /// Attribute export for rendering.
    pub fn node_attributes(&self, arena: &ConfigArena, id: NodeId) -> BTreeMap<String, String> {
        let node = &self.nodes[id.index()];
        let mut attr = BTreeMap::new();
        attr.insert("config".to_owned(), arena.get(node.state.cfg()).to_string());
        attr.insert("zone".to_owned(), node.state.zone().to_string());
        attr.insert("initial".to_owned(), node.initial.to_string());
        attr.insert("final".to_owned(), node.is_final.to_string());
        if node.status == NodeStatus::Subsumed {
            attr.insert("subsumed".to_owned(), "true".to_owned());
        }
        attr
    }

    pub fn edge_attributes(&self, edge: &Edge) -> BTreeMap<String, String> {
        let mut attr = BTreeMap::new();
        let kind = match edge.kind {
            EdgeKind::Actual => "actual",
            EdgeKind::Covering => "covering",
        };
        attr.insert("kind".to_owned(), kind.to_owned());
        if let Some(label) = edge.label {
            attr.insert("label".to_owned(), label.to_string());
        }
        attr
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bound::Db;
    use crate::config::{CfgRef, Config};
    use crate::semantics::{ClockConstraint, ClockReset};
    use crate::zone::Zone;

    fn arena_with_two() -> (ConfigArena, CfgRef, CfgRef) {
        let mut arena = ConfigArena::new(4);
        let a = arena.intern(Config::new(vec![0], vec![]));
        let b = arena.intern(Config::new(vec![1], vec![]));
        (arena, a, b)
    }

    /// `{x = 0, 0 <= y <= upper}` over dimension 3.
    fn slab(upper: i32) -> Zone {
        let mut z = Zone::universal_positive(3);
        assert!(z.constrain(1, 0, Db::le(0)));
        assert!(z.constrain(2, 0, Db::le(upper)));
        assert!(z.tighten());
        z
    }

    #[test]
    fn test_covering_end_to_end() {
        let (_, a, _) = arena_with_two();
        let mut graph = Graph::new(3, CoveringPolicy::Full, 4, None);

        let wide = graph.find_or_insert(State::new(a, slab(10)));
        let Lookup::Inserted(n0) = wide else {
            panic!("first state must be inserted");
        };
        // The narrower slab is covered; no node is added.
        let narrow = graph.find_or_insert(State::new(a, slab(5)));
        assert_eq!(narrow, Lookup::Covered(n0));
        assert_eq!(graph.node_count(), 1);
        // The other direction inserts.
        assert!(matches!(
            graph.find_or_insert(State::new(a, slab(20))),
            Lookup::Inserted(_)
        ));
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_leaf_only_policy() {
        let (_, a, b) = arena_with_two();
        let mut graph = Graph::new(3, CoveringPolicy::LeafOnly, 4, None);

        let n0 = graph.find_or_insert(State::new(a, slab(10))).node();
        let succ = graph.find_or_insert(State::new(b, slab(10)));
        graph.add_edge(n0, succ, TransitionData::new(EdgeLabel(0)));

        // n0 has an outgoing edge and may no longer cover.
        assert!(matches!(
            graph.find_or_insert(State::new(a, slab(5))),
            Lookup::Inserted(_)
        ));
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_recheck_cover_subsumes() {
        let (_, a, _) = arena_with_two();
        let mut graph = Graph::new(3, CoveringPolicy::Full, 4, None);

        let n0 = graph.find_or_insert(State::new(a, slab(5))).node();
        let n1 = graph.find_or_insert(State::new(a, slab(10))).node();
        assert_ne!(n0, n1);

        assert_eq!(graph.recheck_cover(n0), Some(n1));
        assert_eq!(graph.status(n0), NodeStatus::Subsumed);
        // The subsumption link is an unlabeled covering edge.
        let edge = graph.edges().last().unwrap();
        assert_eq!(edge.kind(), EdgeKind::Covering);
        assert_eq!(edge.label(), None);

        // Subsumed nodes never cover.
        assert_eq!(
            graph.find_or_insert(State::new(a, slab(5))),
            Lookup::Covered(n1)
        );
    }

    #[test]
    fn test_status_transitions() {
        let (_, a, _) = arena_with_two();
        let mut graph = Graph::new(3, CoveringPolicy::Full, 4, None);
        let n0 = graph.find_or_insert(State::new(a, slab(1))).node();
        assert_eq!(graph.status(n0), NodeStatus::Unexpanded);
        graph.start_expansion(n0);
        assert_eq!(graph.status(n0), NodeStatus::Expanding);
        graph.finish_expansion(n0);
        assert_eq!(graph.status(n0), NodeStatus::Expanded);
    }

    #[test]
    #[should_panic(expected = "not unexpanded")]
    fn test_subsumed_is_never_expanded() {
        let (_, a, _) = arena_with_two();
        let mut graph = Graph::new(3, CoveringPolicy::Full, 4, None);
        let n0 = graph.find_or_insert(State::new(a, slab(5))).node();
        graph.find_or_insert(State::new(a, slab(10))).node();
        graph.recheck_cover(n0).unwrap();
        graph.start_expansion(n0);
    }

    #[test]
    fn test_cache_strengthening_enables_coverage() {
        let (_, a, _) = arena_with_two();
        let mut graph = Graph::new(2, CoveringPolicy::Full, 4, Some(SimCache::new(2)));

        let n0 = graph.find_or_insert(State::new(a, Zone::zero(2))).node();

        // Take the self-loop "x >= 2, reset x" once: the successor zone is
        // {x = 0} again, so the lookup reports covered by n0 itself, and the
        // edge teaches the cache that x's upper bound is irrelevant at `a`.
        let mut d = TransitionData::new(EdgeLabel(0));
        d.guard.push(ClockConstraint::ge(1, 2));
        d.resets.push(ClockReset::to_zero(1));
        d.src_delay_allowed = true;
        d.tgt_delay_allowed = true;
        let lookup = graph.find_or_insert(State::new(a, Zone::zero(2)));
        assert_eq!(lookup, Lookup::Covered(n0));
        graph.add_edge(n0, lookup, d);
        assert!(graph.cache().unwrap().settled());

        // {0 <= x <= 10} is not included in {x = 0}, but with the learned
        // invariant it is covered anyway.
        let mut wide = Zone::universal_positive(2);
        assert!(wide.constrain(1, 0, Db::le(10)));
        assert!(wide.tighten());
        assert_eq!(
            graph.find_or_insert(State::new(a, wide)),
            Lookup::Covered(n0)
        );
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_actual_parent_chain() {
        let (_, a, b) = arena_with_two();
        let mut graph = Graph::new(3, CoveringPolicy::Full, 4, None);
        let n0 = graph.find_or_insert(State::new(a, slab(5))).node();
        graph.set_initial(n0);
        let succ = graph.find_or_insert(State::new(b, slab(5)));
        graph.add_edge(n0, succ, TransitionData::new(EdgeLabel(7)));

        let n1 = succ.node();
        assert_eq!(graph.actual_parent(n1), Some((n0, EdgeLabel(7))));
        assert_eq!(graph.actual_parent(n0), None);
        assert!(graph.is_initial(n0));
    }

    #[test]
    fn test_attributes() {
        let (arena, a, _) = arena_with_two();
        let mut graph = Graph::new(3, CoveringPolicy::Full, 4, None);
        let n0 = graph.find_or_insert(State::new(a, slab(5))).node();
        graph.set_initial(n0);

        let attr = graph.node_attributes(&arena, n0);
        assert_eq!(attr["config"], "<0>");
        assert_eq!(attr["initial"], "true");
        assert_eq!(attr["final"], "false");
        assert!(attr.contains_key("zone"));
    }
}
