// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free bitmap of slots whose condition fired since the last drain.
///
/// Signalers set bits from any thread; only the owning task drains.
pub(super) struct FiredSet {
    words: Vec<AtomicUsize>,
    capacity: usize,
}

impl FiredSet {
    const BITS: usize = usize::BITS as usize;

    /// Empty set, or `None` if the word array cannot be allocated.
    pub(super) fn try_new(capacity: usize) -> Option<Self> {
        let word_count = capacity.div_ceil(Self::BITS);
        let mut words = Vec::new();
        words.try_reserve_exact(word_count).ok()?;
        words.resize_with(word_count, || AtomicUsize::new(0));
        Some(Self { words, capacity })
    }

    /// Mark `index` fired. Returns `true` if it was not already marked.
    pub(super) fn mark(&self, index: usize) -> bool {
        if index >= self.capacity {
            return false;
        }
        let bit = 1usize << (index % Self::BITS);
        let prev = self.words[index / Self::BITS].fetch_or(bit, Ordering::AcqRel);
        prev & bit == 0
    }

    /// Take every marked index, ascending, leaving the set empty.
    pub(super) fn drain(&self) -> Vec<usize> {
        let mut indices = Vec::new();

        for (word_idx, word) in self.words.iter().enumerate() {
            let mut value = word.swap(0, Ordering::AcqRel);
            while value != 0 {
                let offset = value.trailing_zeros() as usize;
                value &= value - 1;
                let index = word_idx * Self::BITS + offset;
                if index < self.capacity {
                    indices.push(index);
                }
            }
        }

        indices
    }

    pub(super) fn is_empty(&self) -> bool {
        self.words.iter().all(|w| w.load(Ordering::Acquire) == 0)
    }
}
