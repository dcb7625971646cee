//! # covreach-rs: Symbolic covering reachability for timed automata
//!
//! **`covreach-rs`** is a library for exploring the infinite state space of a
//! timed automaton symbolically. Sets of clock valuations are represented
//! compactly as **Difference Bound Matrices** (DBMs, "zones"), and the
//! explored state space is pruned with a **covering** (subsumption) relation:
//! a freshly discovered symbolic state whose valuation set is already
//! contained in an existing state at the same discrete configuration is
//! redundant and need not be expanded.
//!
//! On top of plain zone inclusion, the engine maintains a **simulation
//! cache**: per discrete configuration, a sound over-approximating invariant
//! computed as a backward fixpoint over the transitions taken so far. Zone
//! cells the invariant leaves unconstrained cannot influence the future of a
//! run and are exempt from the covering comparison, which makes covering
//! strictly more powerful without losing soundness of the reachability
//! answer.
//!
//! ## Core Components
//!
//! - **[`bound`]**: difference bounds packed into an `i32` so that the
//!   integer order is the bound order.
//! - **[`zone`]**: the DBM type and its algebra (closure, inclusion,
//!   emptiness, delay, resets, widening).
//! - **[`config`]**: interned discrete configurations with content-derived
//!   handle identity.
//! - **[`semantics`]**: guards, resets, and the forward/backward image of a
//!   discrete transition.
//! - **[`sim`]**: the simulation cache and its synchronous backward
//!   fixpoint.
//! - **[`state`]**: symbolic states and the covering predicate.
//! - **[`graph`]**: the covering graph with its insertion-or-subsumption
//!   lookup.
//! - **[`dot`]**: Graphviz rendering of the covering graph.
//!
//! ## Basic Usage
//!
//! ```rust
//! use covreach_rs::config::{Config, ConfigArena};
//! use covreach_rs::graph::{CoveringPolicy, Graph, Lookup};
//! use covreach_rs::semantics::{next, ClockConstraint, EdgeLabel, TransitionData};
//! use covreach_rs::sim::SimCache;
//! use covreach_rs::state::State;
//! use covreach_rs::zone::Zone;
//!
//! // One process with two locations, one clock (dimension 2 with the
//! // reference clock).
//! let mut arena = ConfigArena::new(4);
//! let q0 = arena.intern(Config::new(vec![0], vec![]));
//! let q1 = arena.intern(Config::new(vec![1], vec![]));
//!
//! let mut graph = Graph::new(2, CoveringPolicy::Full, 8, Some(SimCache::new(2)));
//! let init = graph.find_or_insert(State::new(q0, Zone::zero(2)));
//! let Lookup::Inserted(root) = init else { unreachable!() };
//! graph.set_initial(root);
//!
//! // Take the edge "x >= 1" from q0 to q1.
//! let mut edge = TransitionData::new(EdgeLabel(0));
//! edge.guard.push(ClockConstraint::ge(1, 1));
//! edge.src_delay_allowed = true;
//! let mut zone = graph.state(root).zone().clone();
//! assert!(next(&mut zone, &edge));
//! let succ = graph.find_or_insert(State::new(q1, zone));
//! graph.add_edge(root, succ, edge);
//!
//! assert_eq!(graph.node_count(), 2);
//! ```

pub mod bound;
pub mod config;
pub mod dot;
pub mod graph;
pub mod semantics;
pub mod sim;
pub mod state;
pub mod utils;
pub mod zone;
