//! Covering graph to DOT (Graphviz) conversion.
//!
//! Nodes and edges are emitted in lexical order of their state content, not
//! in discovery order, so that two explorations of the same automaton that
//! reach the same graph produce byte-identical output. Node and edge
//! attributes come straight from the graph's attribute export.

use std::collections::HashMap;

use crate::config::ConfigArena;
use crate::graph::{Graph, NodeId};

impl Graph {
    /// Renders the covering graph in DOT format.
    ///
    /// Node identifiers in the output are positions in the lexical order of
    /// the node states; they are stable across runs but unrelated to
    /// insertion order.
    pub fn to_dot(&self, arena: &ConfigArena) -> Result<String, std::fmt::Error> {
        use std::fmt::Write as _;

        let mut order: Vec<NodeId> = self.node_ids().collect();
        order.sort_by(|&a, &b| self.state(a).lexical_cmp(self.state(b), arena));
        let position: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        for (i, &id) in order.iter().enumerate() {
            write!(dot, "  {} [", i)?;
            for (k, (key, value)) in self.node_attributes(arena, id).iter().enumerate() {
                if k > 0 {
                    write!(dot, ", ")?;
                }
                write!(dot, "{}=\"{}\"", key, value)?;
            }
            writeln!(dot, "]")?;
        }

        let mut edges: Vec<_> = self.edges().collect();
        edges.sort_by_key(|e| (position[&e.src()], position[&e.tgt()], e.label()));
        for edge in edges {
            write!(dot, "  {} -> {} [", position[&edge.src()], position[&edge.tgt()])?;
            for (k, (key, value)) in self.edge_attributes(edge).iter().enumerate() {
                if k > 0 {
                    write!(dot, ", ")?;
                }
                write!(dot, "{}=\"{}\"", key, value)?;
            }
            writeln!(dot, "]")?;
        }
        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::bound::Db;
    use crate::config::{Config, ConfigArena};
    use crate::graph::{CoveringPolicy, Graph};
    use crate::semantics::{EdgeLabel, TransitionData};
    use crate::state::State;
    use crate::zone::Zone;

    fn bounded(upper: i32) -> Zone {
        let mut z = Zone::universal_positive(2);
        assert!(z.constrain(1, 0, Db::le(upper)));
        assert!(z.tighten());
        z
    }

    #[test]
    fn test_to_dot_structure() {
        let mut arena = ConfigArena::new(4);
        let a = arena.intern(Config::new(vec![0], vec![]));
        let b = arena.intern(Config::new(vec![1], vec![]));

        let mut graph = Graph::new(2, CoveringPolicy::Full, 4, None);
        let n0 = graph.find_or_insert(State::new(a, bounded(5))).node();
        graph.set_initial(n0);
        let succ = graph.find_or_insert(State::new(b, bounded(5)));
        graph.add_edge(n0, succ, TransitionData::new(EdgeLabel(0)));

        let dot = graph.to_dot(&arena).unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.trim_end().ends_with('}'));
        assert!(dot.contains("config=\"<0>\""));
        assert!(dot.contains("config=\"<1>\""));
        assert!(dot.contains("0 -> 1 ["));
        assert!(dot.contains("kind=\"actual\""));
        assert!(dot.contains("label=\"e0\""));
    }

    #[test]
    fn test_to_dot_is_insertion_order_independent() {
        let mut arena = ConfigArena::new(4);
        let a = arena.intern(Config::new(vec![0], vec![]));
        let b = arena.intern(Config::new(vec![1], vec![]));

        let mut g1 = Graph::new(2, CoveringPolicy::Full, 4, None);
        g1.find_or_insert(State::new(a, bounded(5)));
        g1.find_or_insert(State::new(b, bounded(5)));

        let mut g2 = Graph::new(2, CoveringPolicy::Full, 4, None);
        g2.find_or_insert(State::new(b, bounded(5)));
        g2.find_or_insert(State::new(a, bounded(5)));

        assert_eq!(g1.to_dot(&arena).unwrap(), g2.to_dot(&arena).unwrap());
    }
}
