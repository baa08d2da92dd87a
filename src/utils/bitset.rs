//! A fixed-capacity bit vector used as the set representation of dataflow facts.
//!
//! Dominator and post-dominator sets are stored as one [`BitSet`] per node, indexed
//! by node id. The capacity is fixed at construction time; all binary operations
//! require both operands to have the same capacity.
//!
//! # Example
//!
//! ```rust,ignore
//! use flowscope::utils::BitSet;
//!
//! let mut set = BitSet::new(100);
//! set.insert(0);
//! set.insert(99);
//!
//! assert!(set.contains(99));
//! assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 99]);
//! ```

const WORD_BITS: usize = 64;

/// A dense set of small integers backed by 64-bit words.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Vec<u64>,
    capacity: usize,
}

impl BitSet {
    /// Creates an empty set able to hold the elements `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            capacity,
        }
    }

    /// Creates a set containing every element of `0..capacity` (the lattice universe).
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut set = Self {
            words: vec![u64::MAX; capacity.div_ceil(WORD_BITS)],
            capacity,
        };
        set.trim_tail();
        set
    }

    /// Creates a set with exactly one element.
    #[must_use]
    pub fn singleton(capacity: usize, element: usize) -> Self {
        let mut set = Self::new(capacity);
        set.insert(element);
        set
    }

    /// Returns the capacity (universe size) of this set.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if no element is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Inserts `element`, returning `true` if it was not present before.
    ///
    /// # Panics
    ///
    /// Panics if `element` is outside of the set capacity.
    pub fn insert(&mut self, element: usize) -> bool {
        let (word, mask) = self.locate(element);
        let was_set = self.words[word] & mask != 0;
        self.words[word] |= mask;
        !was_set
    }

    /// Removes `element`, returning `true` if it was present.
    ///
    /// # Panics
    ///
    /// Panics if `element` is outside of the set capacity.
    pub fn remove(&mut self, element: usize) -> bool {
        let (word, mask) = self.locate(element);
        let was_set = self.words[word] & mask != 0;
        self.words[word] &= !mask;
        was_set
    }

    /// Returns `true` if `element` is in the set. Out-of-range elements are never contained.
    #[must_use]
    pub fn contains(&self, element: usize) -> bool {
        if element >= self.capacity {
            return false;
        }
        self.words[element / WORD_BITS] & (1u64 << (element % WORD_BITS)) != 0
    }

    /// Returns the number of elements in the set.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Adds every element of `other` to `self`, returning `true` if `self` changed.
    pub fn union_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a | b)
    }

    /// Keeps only the elements also present in `other`, returning `true` if `self` changed.
    pub fn intersect_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a & b)
    }

    /// Returns `true` if every element of `self` is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        assert_eq!(self.capacity, other.capacity, "bit sets must have same capacity");
        self.words
            .iter()
            .zip(&other.words)
            .all(|(a, b)| a & !b == 0)
    }

    /// Iterates over the elements in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            words: &self.words,
            index: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    fn locate(&self, element: usize) -> (usize, u64) {
        assert!(
            element < self.capacity,
            "element {element} out of bounds for bit set of capacity {}",
            self.capacity
        );
        (element / WORD_BITS, 1u64 << (element % WORD_BITS))
    }

    fn combine(&mut self, other: &Self, op: impl Fn(u64, u64) -> u64) -> bool {
        assert_eq!(self.capacity, other.capacity, "bit sets must have same capacity");
        let mut changed = false;
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            let updated = op(*a, b);
            changed |= updated != *a;
            *a = updated;
        }
        changed
    }

    fn trim_tail(&mut self) {
        let used = self.capacity % WORD_BITS;
        if used != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << used) - 1;
            }
        }
    }
}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the elements of a [`BitSet`], in ascending order.
pub struct BitSetIter<'a> {
    words: &'a [u64],
    index: usize,
    current: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.index * WORD_BITS + bit);
            }
            self.index += 1;
            self.current = *self.words.get(self.index)?;
        }
    }
}
