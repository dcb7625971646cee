use std::cmp::Ordering;

use crate::config::{CfgRef, ConfigArena};
use crate::sim::SimCache;
use crate::utils::{pairing2, MyHash};
use crate::zone::Zone;

/// A symbolic state: an interned discrete configuration paired with the zone
/// of clock valuations reachable under it.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    cfg: CfgRef,
    zone: Zone,
}

impl State {
    pub fn new(cfg: CfgRef, zone: Zone) -> Self {
        Self { cfg, zone }
    }

    pub fn cfg(&self) -> CfgRef {
        self.cfg
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    /// Hash of the discrete part only. States with equal configurations but
    /// different zones collide on purpose: candidate lookup during covering
    /// buckets by configuration.
    pub fn discrete_hash(&self) -> u64 {
        MyHash::hash(&self.cfg)
    }

    /// Total order on state content, for deterministic output. Configuration
    /// content first, then the zone.
    pub fn lexical_cmp(&self, other: &State, arena: &ConfigArena) -> Ordering {
        arena
            .lexical_cmp(self.cfg, other.cfg)
            .then_with(|| self.zone.lexical_cmp(&other.zone))
    }
}

impl MyHash for State {
    fn hash(&self) -> u64 {
        pairing2(MyHash::hash(&self.cfg), self.zone.hash())
    }
}

/// The covering test of the graph, selected once at construction.
///
/// `Inclusion` is the exact test; `Relaxed` additionally consults the
/// simulation cache it owns, ignoring zone cells the cache has proven
/// irrelevant for the future of the shared configuration.
pub enum CoverPred {
    Inclusion,
    Relaxed(SimCache),
}

impl CoverPred {
    /// Is every run from `lhs` matched by a run from `rhs`?
    /// Requires equal configurations; distinct ones never cover.
    pub fn covers(&self, lhs: &State, rhs: &State) -> bool {
        if lhs.cfg != rhs.cfg {
            return false;
        }
        match self {
            CoverPred::Inclusion => lhs.zone.le(&rhs.zone),
            CoverPred::Relaxed(cache) => cache.relaxed_covered(lhs.cfg, &lhs.zone, &rhs.zone),
        }
    }

    pub fn cache(&self) -> Option<&SimCache> {
        match self {
            CoverPred::Inclusion => None,
            CoverPred::Relaxed(cache) => Some(cache),
        }
    }

    pub fn cache_mut(&mut self) -> Option<&mut SimCache> {
        match self {
            CoverPred::Inclusion => None,
            CoverPred::Relaxed(cache) => Some(cache),
        }
    }
}
