//! Fixed-width bit set used for visited-node and visited-customer sets.

const WORD_BITS: usize = 64;
const WORD_SHIFT: u32 = 6;

/// A dense set of small integers.
///
/// Two sets compare equal only when they hold the same members and were
/// created with the same width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    /// An empty set able to hold `0..width`.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            words: vec![0; width.div_ceil(WORD_BITS)],
        }
    }

    fn locate(bit: usize) -> (usize, u64) {
        (bit >> WORD_SHIFT, 1_u64 << (bit & (WORD_BITS - 1)))
    }

    /// Add `bit`; bits outside the width are ignored.
    pub fn insert(&mut self, bit: usize) {
        let (word, mask) = Self::locate(bit);
        if let Some(w) = self.words.get_mut(word) {
            *w |= mask;
        } else {
            log::warn!("bit {bit} is outside the set width");
            debug_assert!(false, "bit {bit} is outside the set width");
        }
    }

    /// Remove `bit`.
    pub fn remove(&mut self, bit: usize) {
        let (word, mask) = Self::locate(bit);
        if let Some(w) = self.words.get_mut(word) {
            *w &= !mask;
        }
    }

    /// Whether `bit` is a member.
    #[must_use]
    pub fn contains(&self, bit: usize) -> bool {
        let (word, mask) = Self::locate(bit);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Whether every member of `self` is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.words
            .iter()
            .enumerate()
            .all(|(i, w)| w & !other.words.get(i).copied().unwrap_or(0) == 0)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Members in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1_u64 << bit) != 0)
                .map(move |bit| index * WORD_BITS + bit)
        })
    }
}
