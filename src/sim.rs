use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use crate::bound::LT_INFINITY;
use crate::config::CfgRef;
use crate::semantics::{prev, TransitionData};
use crate::zone::Zone;

/// One recorded transition of the explored graph, replayed backwards during
/// invariant propagation. Keyed by `(src, data.label)` within the incoming
/// list of its target.
struct Program {
    src: CfgRef,
    data: TransitionData,
}

/// Per-configuration simulation invariants, learned from the transitions the
/// exploration has taken so far.
///
/// The invariant of a configuration is an over-approximation of the clock
/// differences that can still influence the future of a run passing through
/// it. It starts as the zero valuation when the configuration is first seen
/// and only ever grows: each recorded transition propagates the target's
/// invariant backwards through the transition's predecessor transformation
/// and widens the source's invariant with the result, to a fixpoint.
///
/// Cells of an invariant equal to `LT_INFINITY` mark differences that no
/// recorded future constrains; the relaxed covering test ignores exactly
/// those cells. Since invariants only grow, relaxation only ever gets more
/// permissive, so a covering established earlier stays valid.
pub struct SimCache {
    dim: usize,
    entries: HashMap<CfgRef, Zone>,
    incoming: HashMap<CfgRef, Vec<Program>>,
    pending: VecDeque<CfgRef>,
    in_queue: HashSet<CfgRef>,
}

impl SimCache {
    pub fn new(dim: usize) -> Self {
        assert!(dim >= 1, "Zone dimension must be at least 1");
        Self {
            dim,
            entries: HashMap::new(),
            incoming: HashMap::new(),
            pending: VecDeque::new(),
            in_queue: HashSet::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Make sure `cfg` has an invariant entry, seeded with the tightest
    /// possible zone (all clocks equal to 0).
    pub fn ensure_entry(&mut self, cfg: CfgRef) {
        let dim = self.dim;
        self.entries
            .entry(cfg)
            .or_insert_with(|| Zone::zero(dim));
    }

    /// The current invariant of `cfg`, if the configuration has been seen.
    pub fn invariant(&self, cfg: CfgRef) -> Option<&Zone> {
        self.entries.get(&cfg)
    }

    /// Whether all propagation triggered so far has run to completion.
    /// Holds whenever no `&mut self` method is in progress.
    pub fn settled(&self) -> bool {
        self.pending.is_empty()
    }

    /// Covering test relaxed by the invariant of `cfg`: like zone inclusion,
    /// but cells whose invariant bound is `LT_INFINITY` are exempt from the
    /// comparison. Without an entry for `cfg` this is plain inclusion.
    pub fn relaxed_covered(&self, cfg: CfgRef, lhs: &Zone, rhs: &Zone) -> bool {
        let Some(inv) = self.entries.get(&cfg) else {
            return lhs.le(rhs);
        };
        assert_eq!(
            lhs.dim(),
            self.dim,
            "Zone dimension mismatch: {} vs {}",
            lhs.dim(),
            self.dim
        );
        if lhs.dim() != rhs.dim() {
            return false;
        }
        if lhs.is_empty() {
            return true;
        }
        if rhs.is_empty() {
            return false;
        }
        for i in 0..self.dim {
            for j in 0..self.dim {
                if inv.at(i, j) == LT_INFINITY {
                    continue;
                }
                if lhs.at(i, j) > rhs.at(i, j) {
                    return false;
                }
            }
        }
        true
    }

    /// Record a taken transition from `src` to `tgt` and propagate invariants
    /// backwards to a fixpoint before returning.
    ///
    /// Records are deduplicated by `(src, label)`: re-recording the identical
    /// edge keeps the existing record and merely re-triggers propagation.
    pub fn record_transition(&mut self, src: CfgRef, tgt: CfgRef, data: TransitionData) {
        self.ensure_entry(src);
        self.ensure_entry(tgt);

        let bucket = self.incoming.entry(tgt).or_default();
        let idx = match bucket
            .iter()
            .position(|p| p.src == src && p.data.label == data.label)
        {
            Some(i) => i,
            None => {
                debug!("sim: record {} --{}--> {}", src, data.label, tgt);
                bucket.push(Program { src, data });
                bucket.len() - 1
            }
        };

        let prog = &self.incoming[&tgt][idx];
        if Self::apply_program(&mut self.entries, prog, tgt) {
            Self::enqueue(&mut self.pending, &mut self.in_queue, src);
        }
        self.drain();
    }

    /// Propagate the invariant of `tgt` backwards through `prog` and widen
    /// the invariant of `prog.src` with the result. Returns whether the
    /// source invariant grew.
    fn apply_program(entries: &mut HashMap<CfgRef, Zone>, prog: &Program, tgt: CfgRef) -> bool {
        let mut candidate = entries[&tgt].clone();
        if !prev(&mut candidate, &prog.data) {
            // The transition contributes nothing through this invariant.
            return false;
        }
        let inv = entries
            .get_mut(&prog.src)
            .unwrap_or_else(|| panic!("Missing invariant entry for {}", prog.src));
        inv.widen(&candidate)
    }

    fn enqueue(pending: &mut VecDeque<CfgRef>, in_queue: &mut HashSet<CfgRef>, cfg: CfgRef) {
        if in_queue.insert(cfg) {
            pending.push_back(cfg);
        }
    }

    /// Process configurations whose invariant changed until no propagation
    /// fires anymore. Termination follows from widening being monotone over
    /// a finite lattice of bound values per cell.
    fn drain(&mut self) {
        while let Some(cur) = self.pending.pop_front() {
            self.in_queue.remove(&cur);
            let Some(bucket) = self.incoming.get(&cur) else {
                continue;
            };
            for prog in bucket {
                if Self::apply_program(&mut self.entries, prog, cur) {
                    debug!("sim: invariant of {} grew via {}", prog.src, prog.data.label);
                    Self::enqueue(&mut self.pending, &mut self.in_queue, prog.src);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::config::{Config, ConfigArena};
    use crate::semantics::{ClockConstraint, ClockReset, EdgeLabel};

    fn two_cfgs() -> (ConfigArena, CfgRef, CfgRef) {
        let mut arena = ConfigArena::new(4);
        let q0 = arena.intern(Config::new(vec![0], vec![]));
        let q1 = arena.intern(Config::new(vec![1], vec![]));
        (arena, q0, q1)
    }

    /// Self-loop on q0 guarded `x >= 2` that resets x, with delay at q0.
    fn self_loop() -> TransitionData {
        let mut d = TransitionData::new(EdgeLabel(0));
        d.guard.push(ClockConstraint::ge(1, 2));
        d.resets.push(ClockReset::to_zero(1));
        d.src_delay_allowed = true;
        d.tgt_delay_allowed = true;
        d
    }

    /// Forward edge q0 -> q1 guarded `x < 2`.
    fn forward_edge() -> TransitionData {
        let mut d = TransitionData::new(EdgeLabel(1));
        d.guard.push(ClockConstraint::lt(1, 2));
        d.src_delay_allowed = true;
        d.tgt_delay_allowed = true;
        d
    }

    #[test]
    fn test_relaxed_without_entry_is_inclusion() {
        let (_, q0, _) = two_cfgs();
        let cache = SimCache::new(2);
        let small = Zone::zero(2);
        let big = Zone::universal_positive(2);
        assert!(cache.relaxed_covered(q0, &small, &big));
        assert!(!cache.relaxed_covered(q0, &big, &small));
    }

    #[test]
    fn test_fresh_entry_is_zero_valuation() {
        let (_, q0, _) = two_cfgs();
        let mut cache = SimCache::new(2);
        cache.ensure_entry(q0);
        assert_eq!(cache.invariant(q0), Some(&Zone::zero(2)));
    }

    #[test]
    fn test_fixpoint_on_cyclic_graph() {
        let (_, q0, q1) = two_cfgs();
        let mut cache = SimCache::new(2);
        cache.record_transition(q0, q1, forward_edge());
        cache.record_transition(q0, q0, self_loop());
        assert!(cache.settled());

        // The self-loop admits arbitrarily large x at q0, so the invariant
        // there releases the upper bound of x. Nothing flows into q1.
        assert_eq!(cache.invariant(q0), Some(&Zone::universal_positive(2)));
        assert_eq!(cache.invariant(q1), Some(&Zone::zero(2)));

        // Replaying the same edges is a no-op at the fixpoint.
        cache.record_transition(q0, q1, forward_edge());
        cache.record_transition(q0, q0, self_loop());
        assert_eq!(cache.invariant(q0), Some(&Zone::universal_positive(2)));
        assert_eq!(cache.invariant(q1), Some(&Zone::zero(2)));
    }

    #[test]
    fn test_order_independence() {
        let (_, q0, q1) = two_cfgs();

        let mut fwd_first = SimCache::new(2);
        fwd_first.record_transition(q0, q1, forward_edge());
        fwd_first.record_transition(q0, q0, self_loop());

        let mut loop_first = SimCache::new(2);
        loop_first.record_transition(q0, q0, self_loop());
        loop_first.record_transition(q0, q1, forward_edge());

        assert_eq!(fwd_first.invariant(q0), loop_first.invariant(q0));
        assert_eq!(fwd_first.invariant(q1), loop_first.invariant(q1));
    }

    #[test]
    fn test_relaxation_exempts_released_cells() {
        let (_, q0, q1) = two_cfgs();
        let mut cache = SimCache::new(2);
        cache.record_transition(q0, q0, self_loop());

        // x in [0, 10] is not included in x in [0, 5], but the upper bound
        // of x is released at q0, so the relaxed test covers it anyway.
        let mut wide = Zone::universal_positive(2);
        assert!(wide.constrain(1, 0, crate::bound::Db::le(10)));
        assert!(wide.tighten());
        let mut narrow = Zone::universal_positive(2);
        assert!(narrow.constrain(1, 0, crate::bound::Db::le(5)));
        assert!(narrow.tighten());

        assert!(!wide.le(&narrow));
        assert!(cache.relaxed_covered(q0, &wide, &narrow));
        // At q1 nothing is released and plain inclusion still rules.
        cache.ensure_entry(q1);
        assert!(!cache.relaxed_covered(q1, &wide, &narrow));
    }

    #[test]
    fn test_invariants_only_grow() {
        let (_, q0, q1) = two_cfgs();
        let mut cache = SimCache::new(2);
        cache.ensure_entry(q0);
        let before = cache.invariant(q0).unwrap().clone();

        cache.record_transition(q0, q1, forward_edge());
        cache.record_transition(q0, q0, self_loop());

        // Monotone growth: the earlier invariant is included in the later.
        assert!(before.le(cache.invariant(q0).unwrap()));

        // Consequently a covering established before strengthening holds
        // after it as well.
        let small = Zone::zero(2);
        let big = Zone::universal_positive(2);
        assert!(cache.relaxed_covered(q0, &small, &big));
    }
}
