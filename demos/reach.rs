use clap::Parser;

use covreach_rs::config::{Config, ConfigArena};
use covreach_rs::graph::{CoveringPolicy, Graph, Lookup, NodeId, NodeStatus};
use covreach_rs::semantics::{next, ClockConstraint, ClockReset, EdgeLabel, TransitionData};
use covreach_rs::sim::SimCache;
use covreach_rs::state::State;
use covreach_rs::zone::Zone;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Node table size (in bits, so the actual size is `2^bits` buckets).
    #[clap(long, value_name = "INT", default_value = "8")]
    bits: usize,

    /// Only nodes without outgoing edges may cover.
    #[clap(long)]
    leaf_only: bool,

    /// Disable the simulation cache and use plain zone inclusion.
    #[clap(long)]
    no_cache: bool,

    /// Stop after this many nodes.
    #[clap(long, value_name = "INT", default_value = "1000")]
    max_nodes: usize,

    /// Print the covering graph in DOT format.
    #[clap(long)]
    dot: bool,
}

// A single process with one clock x (zone dimension 2) and three locations:
//
//            x >= 2 / x := 0
//           +---------------+
//           v               |
//   (start) --------> (work)
//      |        e0      |
//      | e1: x >= 5     | e2: x < 2
//      +------> (work)  v
//                     (done)
//
// Two paths reach "work": immediately (x = 0) and after waiting (x >= 5).
// The self-loop at "work" resets x once x >= 2, so the value of x above 0
// is irrelevant to anything that happens later there. The simulation cache
// learns exactly that and subsumes the x >= 5 node under the x = 0 one;
// with --no-cache both nodes stay and are expanded separately.
const START: u32 = 0;
const WORK: u32 = 1;
const DONE: u32 = 2;
const X: usize = 1;

fn edges_from(loc: u32) -> Vec<(u32, TransitionData)> {
    match loc {
        START => {
            let enter = TransitionData::new(EdgeLabel(0));

            let mut late = TransitionData::new(EdgeLabel(1));
            late.guard.push(ClockConstraint::ge(X, 5));
            late.src_delay_allowed = true;

            vec![(WORK, enter), (WORK, late)]
        }
        WORK => {
            let mut again = TransitionData::new(EdgeLabel(2));
            again.guard.push(ClockConstraint::ge(X, 2));
            again.resets.push(ClockReset::to_zero(X));
            again.src_delay_allowed = true;

            let mut finish = TransitionData::new(EdgeLabel(3));
            finish.guard.push(ClockConstraint::lt(X, 2));

            vec![(WORK, again), (DONE, finish)]
        }
        DONE => vec![],
        _ => unreachable!(),
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let dim = 2;
    let policy = if args.leaf_only {
        CoveringPolicy::LeafOnly
    } else {
        CoveringPolicy::Full
    };
    let cache = if args.no_cache {
        None
    } else {
        Some(SimCache::new(dim))
    };

    let mut arena = ConfigArena::new(args.bits);
    let mut graph = Graph::new(dim, policy, args.bits, cache);

    let init_cfg = arena.intern(Config::new(vec![START], vec![]));
    let root = match graph.find_or_insert(State::new(init_cfg, Zone::zero(dim))) {
        Lookup::Inserted(id) => id,
        Lookup::Covered(_) => unreachable!("empty graph cannot cover"),
    };
    graph.set_initial(root);

    let mut queue = std::collections::VecDeque::from([root]);
    let mut covered_lookups = 0usize;
    let mut truncated = false;

    while let Some(node) = queue.pop_front() {
        if graph.status(node) != NodeStatus::Unexpanded {
            continue;
        }
        // Invariants may have strengthened since this node was enqueued.
        if graph.recheck_cover(node).is_some() {
            continue;
        }
        if graph.node_count() >= args.max_nodes {
            truncated = true;
            break;
        }

        graph.start_expansion(node);
        let loc = arena.get(graph.state(node).cfg()).locations()[0];
        for (tgt_loc, data) in edges_from(loc) {
            let mut zone = graph.state(node).zone().clone();
            if !next(&mut zone, &data) {
                continue;
            }
            let tgt_cfg = arena.intern(Config::new(vec![tgt_loc], vec![]));
            let lookup = graph.find_or_insert(State::new(tgt_cfg, zone));
            if let Lookup::Inserted(id) = lookup {
                if tgt_loc == DONE {
                    graph.set_final(id);
                }
                queue.push_back(id);
            } else {
                covered_lookups += 1;
            }
            graph.add_edge(node, lookup, data);
        }
        graph.finish_expansion(node);
    }

    let subsumed = graph
        .node_ids()
        .filter(|&id| graph.status(id) == NodeStatus::Subsumed)
        .count();
    println!("nodes: {}", graph.node_count());
    println!("edges: {}", graph.edge_count());
    println!("covered lookups: {}", covered_lookups);
    println!("subsumed nodes: {}", subsumed);
    if truncated {
        println!("exploration stopped at the {}-node limit", args.max_nodes);
    }

    let reached: Vec<NodeId> = graph.node_ids().filter(|&id| graph.is_final(id)).collect();
    match reached.first() {
        Some(&id) => {
            println!("final location reachable");
            let mut trace = vec![id];
            let mut cur = id;
            while let Some((parent, label)) = graph.actual_parent(cur) {
                println!("  reached via {} from {}", label, parent);
                trace.push(parent);
                cur = parent;
            }
            trace.reverse();
            println!(
                "trace: {}",
                trace
                    .iter()
                    .map(|&id| arena.get(graph.state(id).cfg()).to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ")
            );
        }
        None => println!("final location not reached"),
    }

    if args.dot {
        println!("{}", graph.to_dot(&arena)?);
    }

    let time_total = time_total.elapsed();
    println!("Total time: {:.3} s", time_total.as_secs_f64());

    Ok(())
}
