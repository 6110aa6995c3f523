//! # Linear Memory
//!
//! Zero-initialised, page-granular memory shared between engine and host.
//!
//! Backed by 32-bit words so that integer and float views over the same bytes
//! are always aligned. Memory only ever grows.

use crate::error::{EngineError, EngineResult};

/// Size of one memory page in bytes.
pub const PAGE_SIZE: usize = 65_536;

/// Hard limit on the number of pages (4 GiB).
pub const MAX_PAGES: usize = 65_536;

const WORDS_PER_PAGE: usize = PAGE_SIZE / 4;

/// Linear memory owned by an engine module.
#[derive(Debug, Clone, Default)]
pub struct LinearMemory {
    words: Vec<u32>,
}

impl LinearMemory {
    /// Creates a memory with `pages` zeroed pages.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MemoryLimit`] if `pages` exceeds [`MAX_PAGES`].
    pub fn new(pages: usize) -> EngineResult<Self> {
        let mut memory = Self::default();
        memory.grow(pages)?;
        Ok(memory)
    }

    /// Number of pages needed to hold `bytes` bytes.
    #[inline]
    #[must_use]
    pub const fn pages_for(bytes: usize) -> usize {
        bytes.div_ceil(PAGE_SIZE)
    }

    /// Grows memory by `delta` pages, zero-filling the new space.
    ///
    /// # Returns
    ///
    /// The page count before growing.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MemoryLimit`] if the new size exceeds [`MAX_PAGES`].
    pub fn grow(&mut self, delta: usize) -> EngineResult<usize> {
        let previous = self.pages();
        let requested = previous.saturating_add(delta);
        if requested > MAX_PAGES {
            return Err(EngineError::MemoryLimit {
                requested,
                limit: MAX_PAGES,
            });
        }
        self.words.resize(requested * WORDS_PER_PAGE, 0);
        Ok(previous)
    }

    /// Grows memory until it holds at least `bytes` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MemoryLimit`] if that needs more than [`MAX_PAGES`].
    pub fn reserve_bytes(&mut self, bytes: usize) -> EngineResult<()> {
        let needed = Self::pages_for(bytes);
        if needed > self.pages() {
            self.grow(needed - self.pages())?;
        }
        Ok(())
    }

    /// Current size in pages.
    #[inline]
    #[must_use]
    pub fn pages(&self) -> usize {
        self.words.len() / WORDS_PER_PAGE
    }

    /// Current size in bytes.
    #[inline]
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.words.len() * 4
    }

    /// Integer view.
    #[inline]
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Mutable integer view.
    #[inline]
    pub fn words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }

    /// Float view over the same bytes.
    #[inline]
    #[must_use]
    pub fn floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.words)
    }

    /// Mutable float view over the same bytes.
    #[inline]
    pub fn floats_mut(&mut self) -> &mut [f32] {
        bytemuck::cast_slice_mut(&mut self.words)
    }

    /// Reads the word at `index`.
    #[inline]
    #[must_use]
    pub fn word(&self, index: usize) -> u32 {
        self.words[index]
    }

    /// Writes the word at `index`.
    #[inline]
    pub fn set_word(&mut self, index: usize, value: u32) {
        self.words[index] = value;
    }

    /// Reads the word at `index` as a float.
    #[inline]
    #[must_use]
    pub fn float(&self, index: usize) -> f32 {
        bytemuck::cast(self.words[index])
    }

    /// Writes a float into the word at `index`.
    #[inline]
    pub fn set_float(&mut self, index: usize, value: f32) {
        self.words[index] = bytemuck::cast(value);
    }
}
