// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-width handle bitmap (`fd_set`).
//!
//! Word `i` covers handles `64*i .. 64*i+63`; the byte encoding is the words
//! in order, each little-endian, for exactly [`FD_SET_BYTES`] bytes.

use crate::config::{FD_SET_BYTES, MAX_HANDLES};
use crate::error::{Error, Result};

const WORD_BITS: usize = u64::BITS as usize;
const WORDS: usize = MAX_HANDLES / WORD_BITS;

/// Set of handle indices below [`MAX_HANDLES`].
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct FdSet {
    words: [u64; WORDS],
}

impl FdSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `fd`. Out-of-range handles are rejected.
    pub fn set(&mut self, fd: usize) -> Result<()> {
        let (word, mask) = Self::locate(fd)?;
        self.words[word] |= mask;
        Ok(())
    }

    /// Remove `fd`. Out-of-range handles are ignored.
    pub fn clear(&mut self, fd: usize) {
        if let Ok((word, mask)) = Self::locate(fd) {
            self.words[word] &= !mask;
        }
    }

    #[must_use]
    pub fn is_set(&self, fd: usize) -> bool {
        Self::locate(fd).is_ok_and(|(word, mask)| self.words[word] & mask != 0)
    }

    /// Empty the set.
    pub fn zero(&mut self) {
        self.words = [0; WORDS];
    }

    /// Number of handles in the set.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Handles in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(index * WORD_BITS + bit)
            })
        })
    }

    /// Handles below `nfds`, ascending.
    pub fn iter_below(&self, nfds: usize) -> impl Iterator<Item = usize> + '_ {
        self.iter().take_while(move |&fd| fd < nfds)
    }

    /// Keep only the handles for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize) -> bool,
    {
        let dropped: Vec<usize> = self.iter().filter(|&fd| !keep(fd)).collect();
        for fd in dropped {
            self.clear(fd);
        }
    }

    /// Decode the caller's byte image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != FD_SET_BYTES {
            return Err(Error::Fault("fd_set buffer has the wrong size"));
        }

        let mut set = Self::default();
        for (word, chunk) in set.words.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *word = u64::from_le_bytes(raw);
        }
        Ok(set)
    }

    /// Encode into the caller's byte image.
    pub fn write_bytes(&self, out: &mut [u8]) -> Result<()> {
        if out.len() != FD_SET_BYTES {
            return Err(Error::Fault("fd_set buffer has the wrong size"));
        }

        for (word, chunk) in self.words.iter().zip(out.chunks_exact_mut(8)) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }

    fn locate(fd: usize) -> Result<(usize, u64)> {
        if fd >= MAX_HANDLES {
            return Err(Error::InvalidArgument(format!(
                "handle {} out of range (max {})",
                fd, MAX_HANDLES
            )));
        }
        Ok((fd / WORD_BITS, 1u64 << (fd % WORD_BITS)))
    }
}

impl FromIterator<usize> for FdSet {
    /// Collect handles, silently dropping any at or above `MAX_HANDLES`.
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::default();
        for fd in iter {
            if fd < MAX_HANDLES {
                let _ = set.set(fd);
            }
        }
        set
    }
}

impl std::fmt::Debug for FdSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
