use std::fmt::{Display, Formatter};

use crate::bound::{Db, LE_ZERO};
use crate::zone::Zone;

/// A single difference constraint `x - y <= c` or `x - y < c` of a guard or
/// a location invariant.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ClockConstraint {
    pub x: usize,
    pub y: usize,
    pub db: Db,
}

impl ClockConstraint {
    pub fn new(x: usize, y: usize, db: Db) -> Self {
        assert_ne!(x, y, "constraint on a clock against itself");
        Self { x, y, db }
    }

    /// `x <= c`
    pub fn le(x: usize, c: i32) -> Self {
        Self::new(x, 0, Db::le(c))
    }

    /// `x < c`
    pub fn lt(x: usize, c: i32) -> Self {
        Self::new(x, 0, Db::lt(c))
    }

    /// `x >= c`
    pub fn ge(x: usize, c: i32) -> Self {
        Self::new(0, x, Db::le(-c))
    }

    /// `x > c`
    pub fn gt(x: usize, c: i32) -> Self {
        Self::new(0, x, Db::lt(-c))
    }
}

/// A clock update `x := y + c`; `y = 0` resets `x` to the constant `c`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ClockReset {
    pub x: usize,
    pub y: usize,
    pub c: i32,
}

impl ClockReset {
    pub fn new(x: usize, y: usize, c: i32) -> Self {
        assert_ne!(x, 0, "cannot reset the reference clock");
        Self { x, y, c }
    }

    /// `x := 0`
    pub fn to_zero(x: usize) -> Self {
        Self::new(x, 0, 0)
    }
}

/// Identity of a discrete edge of the automaton.
///
/// Distinct parallel edges between the same pair of configurations must
/// carry distinct labels: the simulation cache deduplicates transition
/// records by `(source configuration, label)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct EdgeLabel(pub u32);

impl Display for EdgeLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// The clock-related content of one discrete transition: guard, resets, the
/// invariants of both endpoint locations, and whether time may elapse at
/// each endpoint.
#[derive(Debug, Clone)]
pub struct TransitionData {
    pub label: EdgeLabel,
    pub src_invariant: Vec<ClockConstraint>,
    pub guard: Vec<ClockConstraint>,
    pub resets: Vec<ClockReset>,
    pub tgt_invariant: Vec<ClockConstraint>,
    pub src_delay_allowed: bool,
    pub tgt_delay_allowed: bool,
}

impl TransitionData {
    /// An unconstrained transition with the given label; callers fill in the
    /// fields they need.
    pub fn new(label: EdgeLabel) -> Self {
        Self {
            label,
            src_invariant: Vec::new(),
            guard: Vec::new(),
            resets: Vec::new(),
            tgt_invariant: Vec::new(),
            src_delay_allowed: false,
            tgt_delay_allowed: false,
        }
    }
}

/// Intersect the zone with a conjunction of constraints.
///
/// Returns `false` as soon as a constraint pair witnesses infeasibility.
/// The zone must be re-closed before comparisons.
pub fn constrain_all(zone: &mut Zone, constraints: &[ClockConstraint]) -> bool {
    for c in constraints {
        if !zone.constrain(c.x, c.y, c.db) {
            return false;
        }
    }
    true
}

/// Forward image of a transition, in place: optional delay at the source,
/// source invariant, guard, resets, target invariant, optional delay at the
/// target, then closure.
///
/// Returns whether the image is non-empty. `false` is the expected outcome
/// for a disabled transition, not an error.
pub fn next(zone: &mut Zone, d: &TransitionData) -> bool {
    if d.src_delay_allowed {
        zone.up();
    }
    if !constrain_all(zone, &d.src_invariant) {
        return false;
    }
    if !constrain_all(zone, &d.guard) {
        return false;
    }
    // Resets assume a closed matrix.
    if !zone.tighten() {
        return false;
    }
    for r in &d.resets {
        zone.reset_assign(r.x, r.y, r.c);
    }
    if !constrain_all(zone, &d.tgt_invariant) {
        return false;
    }
    if d.tgt_delay_allowed {
        if !zone.tighten() {
            return false;
        }
        zone.up();
    }
    zone.tighten()
}

/// Predecessor transformation, in place: turn a zone over the target
/// location into the weakest zone over the source location whose forward
/// image under the transition lands inside it.
///
/// Runs the forward steps of [`next`] in reverse: delay predecessors at the
/// target, target invariant, reset preimages, guard, source invariant, delay
/// predecessors at the source. Returns `false` if no feasible preimage
/// exists ("no contribution"), which callers must treat as normal
/// control flow.
pub fn prev(zone: &mut Zone, d: &TransitionData) -> bool {
    if d.tgt_delay_allowed {
        zone.down();
    }
    if !constrain_all(zone, &d.tgt_invariant) {
        return false;
    }
    for r in d.resets.iter().rev() {
        if !unreset(zone, r) {
            return false;
        }
    }
    if !constrain_all(zone, &d.guard) {
        return false;
    }
    if !constrain_all(zone, &d.src_invariant) {
        return false;
    }
    if d.src_delay_allowed {
        if !zone.tighten() {
            return false;
        }
        zone.down();
    }
    zone.tighten()
}

/// Preimage of the update `x := y + c`: translate every constraint on `x`
/// into a constraint on `y`, then release `x`.
///
/// Returns `false` if the updated value cannot satisfy the target-side
/// constraints on `x` (the update makes the system infeasible).
fn unreset(zone: &mut Zone, r: &ClockReset) -> bool {
    let (x, y, c) = (r.x, r.y, r.c);
    if x == y {
        // x := x + c is a shift; its preimage is the shift by -c.
        zone.reset_assign(x, x, -c);
        return zone.constrain(0, x, LE_ZERO);
    }
    for k in 0..zone.dim() {
        if k == x {
            continue;
        }
        let upper = zone.at(x, k); // x - k <= b  =>  y - k <= b - c
        let lower = zone.at(k, x); // k - x <= b  =>  k - y <= b + c
        if k == y {
            // The difference x - y is exactly c in the image.
            if !upper.is_inf() && upper.shift(-c) < LE_ZERO {
                return false;
            }
            if !lower.is_inf() && lower.shift(c) < LE_ZERO {
                return false;
            }
        } else {
            if !upper.is_inf() && !zone.constrain(y, k, upper.shift(-c)) {
                return false;
            }
            if !lower.is_inf() && !zone.constrain(k, y, lower.shift(c)) {
                return false;
            }
        }
    }
    zone.free_clock(x);
    true
}
