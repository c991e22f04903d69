//! Fixed-width tag bitset

use crate::core::types::TagId;

const WORD_BITS: usize = 64;

/// One bit per registered tag; the width is fixed when the set is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBits {
    words: Box<[u64]>,
}

impl TagBits {
    /// Create an empty set able to hold `capacity` tags
    pub fn with_capacity(capacity: usize) -> Self {
        let words = capacity.div_ceil(WORD_BITS).max(1);
        Self {
            words: vec![0u64; words].into_boxed_slice(),
        }
    }

    #[inline]
    fn locate(tag: TagId) -> (usize, u64) {
        let bit = tag.0 as usize;
        (bit / WORD_BITS, 1u64 << (bit % WORD_BITS))
    }

    #[inline]
    pub fn contains(&self, tag: TagId) -> bool {
        let (word, mask) = Self::locate(tag);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Set the bit, returning true if it was previously clear
    #[inline]
    pub fn insert(&mut self, tag: TagId) -> bool {
        let (word, mask) = Self::locate(tag);
        match self.words.get_mut(word) {
            Some(w) if *w & mask == 0 => {
                *w |= mask;
                true
            }
            _ => false,
        }
    }

    /// Clear the bit, returning true if it was previously set
    #[inline]
    pub fn remove(&mut self, tag: TagId) -> bool {
        let (word, mask) = Self::locate(tag);
        match self.words.get_mut(word) {
            Some(w) if *w & mask != 0 => {
                *w &= !mask;
                true
            }
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Set bits in ascending tag order
    pub fn iter(&self) -> impl Iterator<Item = TagId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(TagId((i * WORD_BITS + bit) as u16))
            })
        })
    }
}
