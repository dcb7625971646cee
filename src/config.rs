use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use crate::utils::{pairing2, pairing_seq, MyHash};

/// A discrete configuration of a timed automaton: the location of every
/// process plus the valuation of the bounded integer variables.
///
/// Configurations are immutable; equality and hashing are structural.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Config {
    locations: Vec<u32>,
    intvals: Vec<i32>,
}

impl Config {
    pub fn new(locations: Vec<u32>, intvals: Vec<i32>) -> Self {
        assert!(!locations.is_empty(), "Configuration needs a location");
        Self { locations, intvals }
    }

    pub fn locations(&self) -> &[u32] {
        &self.locations
    }

    pub fn intvals(&self) -> &[i32] {
        &self.intvals
    }

    fn lexical_cmp(&self, other: &Config) -> Ordering {
        self.locations
            .cmp(&other.locations)
            .then_with(|| self.intvals.cmp(&other.intvals))
    }
}

impl MyHash for Config {
    fn hash(&self) -> u64 {
        pairing2(
            pairing_seq(self.locations.iter().map(|&l| l as u64)),
            pairing_seq(self.intvals.iter().map(|&v| v as u32 as u64)),
        )
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<")?;
        for (i, l) in self.locations.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", l)?;
        }
        write!(f, ">")?;
        if !self.intvals.is_empty() {
            write!(f, "[")?;
            for (i, v) in self.intvals.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", v)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// A copyable handle to an interned [`Config`].
///
/// The arena guarantees one entry per distinct configuration, so handle
/// equality is content equality and the handle id is a content-consistent
/// hash. This is what makes it safe to key the covering graph buckets and
/// the simulation cache by handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CfgRef(u32);

impl CfgRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl MyHash for CfgRef {
    fn hash(&self) -> u64 {
        // Interning makes the id a faithful stand-in for the content hash.
        self.0 as u64
    }
}

impl Display for CfgRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Interning arena for configurations: a bucket table with chained entries.
///
/// Entries are append-only; a configuration handle stays valid for the
/// lifetime of the arena. Reaching the same configuration along different
/// exploration paths yields the same handle.
pub struct ConfigArena {
    data: Vec<Config>,
    /// Chain link per entry (1-based bucket encoding, 0 = end of chain).
    next: Vec<u32>,
    buckets: Vec<u32>,
    bitmask: u64,
}

impl ConfigArena {
    /// Create an arena with `2^bits` hash buckets.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Arena bits should be in the range 0..=31");
        let size = 1usize << bits;
        Self {
            data: Vec::new(),
            next: Vec::new(),
            buckets: vec![0; size],
            bitmask: (size - 1) as u64,
        }
    }

    /// Number of distinct configurations seen so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn bucket_index(&self, cfg: &Config) -> usize {
        (cfg.hash() & self.bitmask) as usize
    }

    /// Intern a configuration, returning the handle of the unique entry with
    /// that content.
    pub fn intern(&mut self, cfg: Config) -> CfgRef {
        let bucket = self.bucket_index(&cfg);
        let mut slot = self.buckets[bucket];
        while slot != 0 {
            let entry = (slot - 1) as usize;
            if self.data[entry] == cfg {
                return CfgRef(entry as u32);
            }
            slot = self.next[entry];
        }
        // Not present: append and push to the front of the bucket chain.
        let entry = self.data.len();
        self.data.push(cfg);
        self.next.push(self.buckets[bucket]);
        self.buckets[bucket] = (entry + 1) as u32;
        CfgRef(entry as u32)
    }

    pub fn get(&self, r: CfgRef) -> &Config {
        &self.data[r.index()]
    }

    /// Lexical order on configuration content (deterministic output only).
    pub fn lexical_cmp(&self, a: CfgRef, b: CfgRef) -> Ordering {
        self.get(a).lexical_cmp(self.get(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut arena = ConfigArena::new(4);
        let a = arena.intern(Config::new(vec![0, 1], vec![3]));
        let b = arena.intern(Config::new(vec![0, 1], vec![3]));
        let c = arena.intern(Config::new(vec![0, 2], vec![3]));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a).locations(), &[0, 1]);
    }

    #[test]
    fn test_intern_survives_bucket_collisions() {
        // A tiny bucket table forces every entry through the chain path.
        let mut arena = ConfigArena::new(0);
        let mut refs = Vec::new();
        for l in 0..16 {
            refs.push(arena.intern(Config::new(vec![l], vec![])));
        }
        assert_eq!(arena.len(), 16);
        for (l, r) in refs.iter().enumerate() {
            assert_eq!(arena.intern(Config::new(vec![l as u32], vec![])), *r);
        }
    }

    #[test]
    fn test_lexical_cmp() {
        let mut arena = ConfigArena::new(4);
        let a = arena.intern(Config::new(vec![0], vec![1]));
        let b = arena.intern(Config::new(vec![0], vec![2]));
        let c = arena.intern(Config::new(vec![1], vec![0]));
        assert_eq!(arena.lexical_cmp(a, b), Ordering::Less);
        assert_eq!(arena.lexical_cmp(b, c), Ordering::Less);
        assert_eq!(arena.lexical_cmp(c, c), Ordering::Equal);
    }

    #[test]
    fn test_display() {
        let cfg = Config::new(vec![1, 2], vec![7]);
        assert_eq!(cfg.to_string(), "<1,2>[7]");
        let plain = Config::new(vec![0], vec![]);
        assert_eq!(plain.to_string(), "<0>");
    }
}
