use slab::Slab;
use std::fmt::{Debug, Formatter};

/// Identifies one entry of a [`Slots`].
///
/// The generation makes a token stale once its entry was removed, even if the
/// slab key is reused by a later insert.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Token {
    key: usize,
    generation: u64,
}

impl Token {
    /// The slab key part of the token.
    #[must_use]
    pub fn key(&self) -> usize {
        self.key
    }

    /// The generation part of the token.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A slab whose entries are addressed by generation-checked [`Token`]s.
pub struct Slots<V> {
    inner: Slab<(u64, V)>,
    next_generation: u64,
}

impl<V> Default for Slots<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Debug for Slots<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slots")
            .field("len", &self.inner.len())
            .field("next_generation", &self.next_generation)
            .finish()
    }
}

impl<V> Slots<V> {
    /// Create an empty `Slots`.
    #[must_use]
    pub fn new() -> Self {
        Slots {
            inner: Slab::new(),
            next_generation: 0,
        }
    }

    /// Store `value`, returning the token that addresses it.
    pub fn insert(&mut self, value: V) -> Token {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let key = self.inner.insert((generation, value));
        Token { key, generation }
    }

    /// Whether `token` still addresses a live entry.
    #[must_use]
    pub fn contains(&self, token: Token) -> bool {
        self.inner
            .get(token.key)
            .is_some_and(|(generation, _)| *generation == token.generation)
    }

    /// Get the entry of `token`, if it is still live.
    pub fn get_mut(&mut self, token: Token) -> Option<&mut V> {
        match self.inner.get_mut(token.key) {
            Some((generation, value)) if *generation == token.generation => Some(value),
            _ => None,
        }
    }

    /// Remove the entry of `token`. Stale tokens remove nothing.
    pub fn remove(&mut self, token: Token) -> Option<V> {
        if !self.contains(token) {
            return None;
        }
        Some(self.inner.remove(token.key).1)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether there is no live entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_token_is_ignored() {
        let mut slots = Slots::new();
        let first = slots.insert("a");
        assert_eq!(Some("a"), slots.remove(first));
        let second = slots.insert("b");
        // the slab key is reused, the generation is not
        assert_eq!(first.key(), second.key());
        assert!(!slots.contains(first));
        assert_eq!(None, slots.remove(first));
        assert_eq!(Some(&mut "b"), slots.get_mut(second));
        assert_eq!(1, slots.len());
    }
}
