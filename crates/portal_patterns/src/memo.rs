//! Flat `N³` memoization table keyed by ordered portal triples.
//!
//! Entry `(i, j, k)` lives at `((i · N) + j) · N + k`. Unknown entries hold a
//! caller-chosen sentinel; the engines guard every write with it.

use crate::error::PatternError;
use crate::portal::PortalIndex;

/// Best continuation below an ordered root triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BestSolution {
    pub index: PortalIndex,
    pub length: u16,
}

impl BestSolution {
    pub const INVALID_LENGTH: u16 = u16::MAX;
    /// Sentinel for "not yet computed".
    pub const UNKNOWN: Self = Self {
        index: PortalIndex::INVALID,
        length: Self::INVALID_LENGTH,
    };

    #[inline]
    pub fn new(index: PortalIndex, length: u16) -> Self {
        Self { index, length }
    }

    #[inline]
    pub fn is_known(&self) -> bool {
        self.length != Self::INVALID_LENGTH
    }
}

/// Cubic table of `T` indexed by ordered triples of portal indices.
#[derive(Clone, Debug)]
pub struct TripleTable<T> {
    n: usize,
    entries: Vec<T>,
}

impl<T: Copy> TripleTable<T> {
    /// Allocate an `n³` table filled with `fill`.
    pub fn new(n: usize, fill: T) -> Result<Self, PatternError> {
        let len = n
            .checked_mul(n)
            .and_then(|n2| n2.checked_mul(n))
            .ok_or(PatternError::TableTooLarge { portals: n })?;
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(len)
            .map_err(|_| PatternError::TableTooLarge { portals: n })?;
        entries.resize(len, fill);
        Ok(Self { n, entries })
    }

    #[inline]
    fn offset(&self, i: PortalIndex, j: PortalIndex, k: PortalIndex) -> usize {
        (i.get() * self.n + j.get()) * self.n + k.get()
    }

    #[inline]
    pub fn get(&self, i: PortalIndex, j: PortalIndex, k: PortalIndex) -> T {
        self.entries[self.offset(i, j, k)]
    }

    #[inline]
    pub fn set(&mut self, i: PortalIndex, j: PortalIndex, k: PortalIndex, value: T) {
        let off = self.offset(i, j, k);
        self.entries[off] = value;
    }

    /// Write `value` for all six orderings of the triple.
    pub fn set_permutations(&mut self, i: PortalIndex, j: PortalIndex, k: PortalIndex, value: T) {
        self.set(i, j, k, value);
        self.set(i, k, j, value);
        self.set(j, i, k, value);
        self.set(j, k, i, value);
        self.set(k, i, j, value);
        self.set(k, j, i, value);
    }

    #[inline]
    pub fn num_portals(&self) -> usize {
        self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_independent_per_ordering() {
        let mut t = TripleTable::new(4, BestSolution::UNKNOWN).unwrap();
        let (a, b, c) = (PortalIndex(0), PortalIndex(2), PortalIndex(3));
        assert!(!t.get(a, b, c).is_known());
        t.set(a, b, c, BestSolution::new(PortalIndex(1), 1));
        assert!(t.get(a, b, c).is_known());
        assert!(!t.get(b, a, c).is_known());
        t.set_permutations(a, b, c, BestSolution::new(PortalIndex(1), 2));
        assert_eq!(t.get(c, b, a).length, 2);
        assert_eq!(t.get(b, c, a).index, PortalIndex(1));
        assert_eq!(t.num_portals(), 4);
    }

    #[test]
    fn oversized_tables_are_rejected() {
        let r = TripleTable::new(usize::MAX / 2, 0u8);
        assert!(matches!(r, Err(PatternError::TableTooLarge { .. })));
    }
}
