use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Write};

use crate::bound::{Db, LE_ZERO, LT_INFINITY};
use crate::utils::{pairing2, pairing_seq, MyHash};

/// Marker for a clock without a known maximal constant in a bound map.
///
/// A clock mapped to `NO_BOUND` is never compared against a constant, so
/// every constraint on it is exempt from the bound-aware inclusion tests.
pub const NO_BOUND: i32 = i32::MIN;

/// Error returned when a raw matrix buffer does not describe a `dim x dim`
/// difference bound matrix.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InvalidRawMatrix {
    pub dim: usize,
    pub len: usize,
}

impl Display for InvalidRawMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "raw matrix of length {} does not match dimension {} (expected {})",
            self.len,
            self.dim,
            self.dim * self.dim
        )
    }
}

impl std::error::Error for InvalidRawMatrix {}

/// A zone: a `dim x dim` difference bound matrix over `dim` clocks.
///
/// Clock 0 is the reference clock whose value is always 0, so cell `(i, j)`
/// constrains `x_i - x_j`, cells `(i, 0)` are upper bounds and cells `(0, j)`
/// are (negated) lower bounds. The dimension is fixed at construction.
///
/// Most operations require the matrix to be in closed (canonical) form,
/// established by [`Zone::tighten`]. Emptiness is recorded by a negative
/// `(0, 0)` cell so that [`Zone::is_empty`] is O(1) and an empty matrix is
/// never mistaken for a valid one.
#[derive(Debug, Clone)]
pub struct Zone {
    dim: usize,
    data: Vec<Db>,
}

impl Zone {
    /// The universal positive zone: all clocks >= 0, otherwise unconstrained.
    pub fn universal_positive(dim: usize) -> Self {
        assert!(dim >= 1, "Zone dimension must be at least 1");
        let mut data = vec![LT_INFINITY; dim * dim];
        for j in 0..dim {
            data[j] = LE_ZERO; // row 0: 0 - x_j <= 0
        }
        for i in 0..dim {
            data[i * dim + i] = LE_ZERO;
        }
        Self { dim, data }
    }

    /// The zone containing the single valuation with all clocks equal to 0.
    ///
    /// This is the strongest non-empty zone of a given dimension.
    pub fn zero(dim: usize) -> Self {
        assert!(dim >= 1, "Zone dimension must be at least 1");
        Self {
            dim,
            data: vec![LE_ZERO; dim * dim],
        }
    }

    /// Rebuild a zone from a raw cell buffer (row-major, `dim * dim` cells).
    ///
    /// The buffer is taken as-is; callers should [`Zone::tighten`] the result
    /// before comparing it with other zones.
    pub fn from_raw(dim: usize, data: Vec<Db>) -> Result<Self, InvalidRawMatrix> {
        if dim == 0 || data.len() != dim * dim {
            return Err(InvalidRawMatrix {
                dim,
                len: data.len(),
            });
        }
        Ok(Self { dim, data })
    }

    /// The raw cell buffer (row-major).
    pub fn raw(&self) -> &[Db] {
        &self.data
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.dim && j < self.dim);
        i * self.dim + j
    }

    /// The bound on `x_i - x_j`.
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> Db {
        self.data[self.index(i, j)]
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize, j: usize, db: Db) {
        let index = self.index(i, j);
        self.data[index] = db;
    }

    /// Copy `other` into `self`.
    ///
    /// # Panics
    ///
    /// Panics on dimension mismatch: a zone is never silently resized.
    pub fn assign(&mut self, other: &Zone) {
        assert_eq!(
            self.dim, other.dim,
            "Zone dimension mismatch: {} vs {}",
            self.dim, other.dim
        );
        self.data.copy_from_slice(&other.data);
    }

    /// Close the matrix in place (all-pairs shortest paths over the bound
    /// algebra) and return whether the zone is non-empty.
    ///
    /// A negative cycle means the constraint system is infeasible; in that
    /// case the zone is marked empty instead of being left half-updated.
    /// Closure is idempotent.
    pub fn tighten(&mut self) -> bool {
        let dim = self.dim;
        for k in 0..dim {
            for i in 0..dim {
                if i == k {
                    continue;
                }
                let ik = self.at(i, k);
                if ik.is_inf() {
                    continue;
                }
                for j in 0..dim {
                    if j == k {
                        continue;
                    }
                    let ikj = ik.add(self.at(k, j));
                    if ikj < self.at(i, j) {
                        self.set(i, j, ikj);
                    }
                }
                if self.at(i, i) < LE_ZERO {
                    self.mark_empty();
                    return false;
                }
            }
        }
        true
    }

    fn mark_empty(&mut self) {
        self.data[0] = Db::lt(-1);
    }

    /// O(1) emptiness check. Only meaningful on a closed matrix.
    pub fn is_empty(&self) -> bool {
        self.data[0] < LE_ZERO
    }

    /// Whether this is exactly the universal positive zone.
    pub fn is_universal_positive(&self) -> bool {
        let dim = self.dim;
        for i in 0..dim {
            for j in 0..dim {
                let expected = if i == j || i == 0 { LE_ZERO } else { LT_INFINITY };
                if self.at(i, j) != expected {
                    return false;
                }
            }
        }
        true
    }

    /// Inclusion as valuation sets: `self` is a subset of `other`.
    ///
    /// Both zones must be closed. A dimension mismatch yields `false`; an
    /// empty zone is included in everything, and nothing non-empty is
    /// included in an empty zone.
    pub fn le(&self, other: &Zone) -> bool {
        if self.dim != other.dim {
            return false;
        }
        if self.is_empty() {
            return true;
        }
        if other.is_empty() {
            return false;
        }
        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(a, b)| a <= b)
    }

    /// Bounded inclusion up to the `M`-extrapolation of `other`.
    ///
    /// `m` maps each clock (index 0 = reference clock, entry 0) to its
    /// maximal compared constant, or [`NO_BOUND`]. Each cell of `other` is
    /// relaxed through the bound map before the cell-wise comparison, which
    /// accepts strictly more left-hand zones than [`Zone::le`] while staying
    /// sound for covering.
    pub fn is_am_le(&self, other: &Zone, m: &[i32]) -> bool {
        self.bounded_le(other, m, m)
    }

    /// Bounded inclusion up to the `LU`-extrapolation of `other`.
    ///
    /// Like [`Zone::is_am_le`] with separate maps for lower (`l`) and upper
    /// (`u`) comparison constants.
    pub fn is_alu_le(&self, other: &Zone, l: &[i32], u: &[i32]) -> bool {
        self.bounded_le(other, l, u)
    }

    fn bounded_le(&self, other: &Zone, row_bounds: &[i32], col_bounds: &[i32]) -> bool {
        if self.dim != other.dim {
            return false;
        }
        assert_eq!(row_bounds.len(), self.dim, "bound map length mismatch");
        assert_eq!(col_bounds.len(), self.dim, "bound map length mismatch");
        if self.is_empty() {
            return true;
        }
        if other.is_empty() {
            return false;
        }
        for i in 0..self.dim {
            for j in 0..self.dim {
                if i == j {
                    continue;
                }
                let relaxed = relax_cell(other.at(i, j), i, row_bounds[i], col_bounds[j]);
                if self.at(i, j) > relaxed {
                    return false;
                }
            }
        }
        true
    }

    /// Total lexical order, consistent with equality. Used for deterministic
    /// output ordering only.
    pub fn lexical_cmp(&self, other: &Zone) -> Ordering {
        if self.dim != other.dim {
            return self.dim.cmp(&other.dim);
        }
        let e1 = self.is_empty();
        let e2 = other.is_empty();
        if e1 || e2 {
            return e2.cmp(&e1); // empty sorts first; both empty are equal
        }
        self.data.cmp(&other.data)
    }

    /// Tighten the single cell `(i, j)` with `db` (guard intersection).
    ///
    /// Returns `false` if the cell pair already witnesses infeasibility (the
    /// new bound and its transpose form a negative cycle). This is an
    /// expected outcome, not an error; the matrix must be re-closed with
    /// [`Zone::tighten`] before further comparisons.
    pub fn constrain(&mut self, i: usize, j: usize, db: Db) -> bool {
        assert!(i < self.dim && j < self.dim, "clock index out of range");
        assert_ne!(i, j, "cannot constrain a clock against itself");
        if db < self.at(i, j) {
            self.set(i, j, db);
        }
        self.at(i, j).add(self.at(j, i)) >= LE_ZERO
    }

    /// Delay (time elapse): remove all upper bounds. Preserves closure.
    pub fn up(&mut self) {
        for i in 1..self.dim {
            self.set(i, 0, LT_INFINITY);
        }
    }

    /// Past of delay: every valuation that can reach the zone by letting
    /// time pass. Lower bounds drop to 0, kept consistent with the
    /// difference constraints. Preserves closure.
    pub fn down(&mut self) {
        for j in 1..self.dim {
            let mut low = LE_ZERO;
            for i in 1..self.dim {
                low = low.min(self.at(i, j));
            }
            self.set(0, j, low);
        }
    }

    /// Remove all constraints on clock `x` except positivity.
    /// Preserves closure.
    pub fn free_clock(&mut self, x: usize) {
        assert!(x >= 1 && x < self.dim, "cannot free the reference clock");
        for k in 0..self.dim {
            if k != x {
                self.set(x, k, LT_INFINITY);
                let upper = self.at(k, 0);
                self.set(k, x, upper);
            }
        }
    }

    /// Forward image of the update `x := y + c`. Preserves closure.
    pub fn reset_assign(&mut self, x: usize, y: usize, c: i32) {
        assert!(x >= 1 && x < self.dim, "cannot reset the reference clock");
        assert!(y < self.dim, "clock index out of range");
        if x == y {
            // Plain shift of x by c.
            for k in 0..self.dim {
                if k != x {
                    let xk = self.at(x, k).shift(c);
                    self.set(x, k, xk);
                    let kx = self.at(k, x).shift(-c);
                    self.set(k, x, kx);
                }
            }
            return;
        }
        for k in 0..self.dim {
            if k != x && k != y {
                let yk = self.at(y, k).shift(c);
                self.set(x, k, yk);
                let ky = self.at(k, y).shift(-c);
                self.set(k, x, ky);
            }
        }
        self.set(x, y, Db::le(c));
        self.set(y, x, Db::le(-c));
    }

    /// Widen `self` by `other`: cell-wise most-permissive-wins combination,
    /// re-closed afterwards. Returns whether any cell grew.
    ///
    /// This is the monotone growth step of the simulation invariants, not
    /// the extrapolation operator of the same name. The result contains both
    /// operands, so widening a non-empty zone never produces an empty one
    /// and never shrinks below either operand's canonical form.
    pub fn widen(&mut self, other: &Zone) -> bool {
        assert_eq!(
            self.dim, other.dim,
            "Zone dimension mismatch: {} vs {}",
            self.dim, other.dim
        );
        let mut changed = false;
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            if *b > *a {
                *a = *b;
                changed = true;
            }
        }
        if changed {
            let nonempty = self.tighten();
            debug_assert!(nonempty, "widening produced an empty zone");
        }
        changed
    }

    /// Membership test for an integer valuation (`v[0]` must be 0).
    pub fn satisfies(&self, v: &[i32]) -> bool {
        assert_eq!(v.len(), self.dim, "valuation length mismatch");
        assert_eq!(v[0], 0, "reference clock must be 0");
        if self.is_empty() {
            return false;
        }
        for i in 0..self.dim {
            for j in 0..self.dim {
                let db = self.at(i, j);
                if db.is_inf() {
                    continue;
                }
                let diff = v[i] - v[j];
                let ok = if db.is_strict() {
                    diff < db.value()
                } else {
                    diff <= db.value()
                };
                if !ok {
                    return false;
                }
            }
        }
        true
    }

    /// Conjunction form, e.g. `1<=x1 & x1<3 & x1-x2<=2`, using the given
    /// clock names (`names[0]` names clock 1).
    pub fn fmt_conjunctions(&self, names: &[&str]) -> String {
        assert_eq!(names.len(), self.dim - 1, "need one name per clock");
        if self.is_empty() {
            return "false".into();
        }
        let mut parts = Vec::new();
        for i in 1..self.dim {
            let lower = self.at(0, i);
            if lower != LE_ZERO && !lower.is_inf() {
                // 0 - x_i <= c, rendered as -c <= x_i.
                let rel = if lower.is_strict() { "<" } else { "<=" };
                parts.push(format!("{}{}{}", -lower.value(), rel, names[i - 1]));
            }
            let upper = self.at(i, 0);
            if !upper.is_inf() {
                parts.push(format!("{}{}", names[i - 1], upper));
            }
            for j in 1..self.dim {
                if i == j {
                    continue;
                }
                let db = self.at(i, j);
                if !db.is_inf() {
                    parts.push(format!("{}-{}{}", names[i - 1], names[j - 1], db));
                }
            }
        }
        if parts.is_empty() {
            return "true".into();
        }
        parts.join(" & ")
    }

    /// Labeled matrix rendering, one row per clock.
    pub fn fmt_matrix(&self, names: &[&str]) -> String {
        assert_eq!(names.len(), self.dim - 1, "need one name per clock");
        let label = |i: usize| if i == 0 { "0" } else { names[i - 1] };
        let mut out = String::new();
        for i in 0..self.dim {
            let _ = write!(out, "{:>6} |", label(i));
            for j in 0..self.dim {
                let _ = write!(out, " {:>8}", self.at(i, j).to_string());
            }
            out.push('\n');
        }
        out
    }
}

/// One cell of the bounded (extrapolated) comparison: relax an upper-bound
/// cell beyond the row clock's constant to "unconstrained", and saturate a
/// lower-bound cell below the column clock's constant.
fn relax_cell(db: Db, row: usize, row_bound: i32, col_bound: i32) -> Db {
    if row != 0 && (row_bound == NO_BOUND || db > Db::le(row_bound)) {
        return LT_INFINITY;
    }
    if col_bound == NO_BOUND {
        return LT_INFINITY;
    }
    if db < Db::lt(-col_bound) {
        return Db::lt(-col_bound);
    }
    db
}

impl PartialEq for Zone {
    fn eq(&self, other: &Self) -> bool {
        if self.dim != other.dim {
            return false;
        }
        let e1 = self.is_empty();
        let e2 = other.is_empty();
        if e1 || e2 {
            return e1 && e2;
        }
        self.data == other.data
    }
}

impl Eq for Zone {}

impl MyHash for Zone {
    fn hash(&self) -> u64 {
        if self.is_empty() {
            // All empty zones compare equal, so they must hash alike.
            return pairing2(self.dim as u64, 0);
        }
        pairing2(
            self.dim as u64,
            pairing_seq(self.data.iter().map(|db| db.raw() as u32 as u64)),
        )
    }
}

impl Display for Zone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = (1..self.dim).map(|i| format!("x{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        write!(f, "{}", self.fmt_conjunctions(&refs))
    }
}
