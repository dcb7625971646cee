use std::fmt::{Display, Formatter};

/// A difference bound `(value, strict|weak)` packed into an `i32`.
///
/// The raw representation is `value << 1 | weak_bit`, with `weak_bit = 1` for
/// a non-strict bound (`x - y <= value`) and `0` for a strict one
/// (`x - y < value`). The packing is chosen so that the derived integer
/// order on the raw value is exactly the bound order: a smaller raw value is
/// a tighter constraint, and for equal values the strict bound sorts below
/// the weak one. `min`/`max` on bounds are therefore plain integer
/// comparisons.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Db(i32);

/// Largest representable bound value; used as the "no constraint" sentinel.
const INF_VALUE: i32 = i32::MAX >> 1;

/// The non-strict zero bound `<= 0`.
pub const LE_ZERO: Db = Db(1);

/// The strict zero bound `< 0`.
pub const LT_ZERO: Db = Db(0);

/// The absence of a constraint: `< inf`.
pub const LT_INFINITY: Db = Db(INF_VALUE << 1);

impl Db {
    /// A non-strict bound `<= value`.
    pub const fn le(value: i32) -> Self {
        Db((value << 1) | 1)
    }

    /// A strict bound `< value`.
    pub const fn lt(value: i32) -> Self {
        Db(value << 1)
    }

    /// The finite bound value. Meaningless for [`LT_INFINITY`].
    pub const fn value(self) -> i32 {
        self.0 >> 1
    }

    pub const fn is_strict(self) -> bool {
        self.0 & 1 == 0
    }

    pub const fn is_inf(self) -> bool {
        self.0 == LT_INFINITY.0
    }

    /// Bound algebra sum: infinity-absorbing, values add, strict if either
    /// operand is strict.
    pub fn add(self, other: Db) -> Db {
        if self.is_inf() || other.is_inf() {
            return LT_INFINITY;
        }
        Db(((self.value() + other.value()) << 1) | (self.0 & other.0 & 1))
    }

    /// Shift a finite bound by a constant, preserving strictness.
    pub fn shift(self, c: i32) -> Db {
        if self.is_inf() {
            return LT_INFINITY;
        }
        Db(((self.value() + c) << 1) | (self.0 & 1))
    }

    /// The packed representation, for hashing and raw-buffer serialization.
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl Display for Db {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_inf() {
            write!(f, "<inf")
        } else if self.is_strict() {
            write!(f, "<{}", self.value())
        } else {
            write!(f, "<={}", self.value())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order() {
        // Tighter bounds sort below weaker ones.
        assert!(Db::lt(0) < Db::le(0));
        assert!(Db::le(0) < Db::lt(1));
        assert!(Db::lt(-1) < Db::le(-1));
        assert!(Db::le(-1) < Db::lt(0));
        assert!(Db::le(1000) < LT_INFINITY);
        assert_eq!(LE_ZERO, Db::le(0));
        assert_eq!(LT_ZERO, Db::lt(0));
    }

    #[test]
    fn test_add() {
        assert_eq!(Db::le(2).add(Db::le(3)), Db::le(5));
        assert_eq!(Db::le(2).add(Db::lt(3)), Db::lt(5));
        assert_eq!(Db::lt(-1).add(Db::lt(1)), Db::lt(0));
        assert_eq!(Db::le(2).add(LT_INFINITY), LT_INFINITY);
        assert_eq!(LT_INFINITY.add(Db::lt(-5)), LT_INFINITY);
    }

    #[test]
    fn test_shift() {
        assert_eq!(Db::le(2).shift(3), Db::le(5));
        assert_eq!(Db::lt(2).shift(-4), Db::lt(-2));
        assert_eq!(LT_INFINITY.shift(7), LT_INFINITY);
    }

    #[test]
    fn test_display() {
        assert_eq!(Db::le(3).to_string(), "<=3");
        assert_eq!(Db::lt(-2).to_string(), "<-2");
        assert_eq!(LT_INFINITY.to_string(), "<inf");
    }
}
