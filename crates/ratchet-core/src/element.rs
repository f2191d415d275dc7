//! The element contract: pointer-sized values with a reserved zero.

use std::num::{NonZeroU32, NonZeroUsize};

/// A value that can live in one atomic vector slot.
///
/// Elements are plain `Copy` handles (typically a pointer to an
/// externally reference-counted buffer) that encode into a single
/// machine word. Zero is reserved as the empty-slot sentinel, which is
/// why the encoding is a [`NonZeroUsize`]: a slot holding zero has
/// never been claimed, and no element can ever be mistaken for it.
pub trait Element: Copy + Send + Sync + 'static {
    /// Encode this element as a non-zero word.
    fn into_word(self) -> NonZeroUsize;

    /// Rebuild an element from a word produced by [`into_word`](Element::into_word).
    fn from_word(word: NonZeroUsize) -> Self;
}

impl Element for NonZeroUsize {
    fn into_word(self) -> NonZeroUsize {
        self
    }

    fn from_word(word: NonZeroUsize) -> Self {
        word
    }
}

impl Element for NonZeroU32 {
    fn into_word(self) -> NonZeroUsize {
        NonZeroUsize::try_from(self).unwrap_or(NonZeroUsize::MIN)
    }

    fn from_word(word: NonZeroUsize) -> Self {
        // Words wider than 32 bits never come from `into_word`.
        let narrowed = NonZeroU32::try_from(word);
        debug_assert!(narrowed.is_ok(), "word {word} does not fit a NonZeroU32");
        narrowed.unwrap_or(NonZeroU32::MIN)
    }
}
