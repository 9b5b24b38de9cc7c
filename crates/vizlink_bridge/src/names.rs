//! # Name Interning Cache
//!
//! Converts transient caller strings into shared [`Name`] keys.
//!
//! A cache hit returns a clone of the stored `Arc`, so repeated per-frame
//! lookups of the same subject never allocate. Only the first sighting of a
//! string pays for the allocation.

use crate::error::{BridgeError, BridgeResult};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// An interned, cheaply clonable name.
///
/// Equality and hashing follow the string contents, so equal strings always
/// yield equal keys, even across cache clears.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Arc<str>);

/// Key of a streaming subject.
pub type SubjectKey = Name;

/// Name of a declared property.
pub type PropertyName = Name;

impl Name {
    /// Returns the name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if both keys share the same interned allocation.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

/// Cache of previously interned names.
#[derive(Default)]
pub struct NameCache {
    names: HashSet<Name>,
    hits: u64,
    misses: u64,
}

impl NameCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the interned key for `text`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidArgument`] for an empty string.
    pub fn intern(&mut self, text: &str) -> BridgeResult<Name> {
        if text.is_empty() {
            return Err(BridgeError::InvalidArgument("name must not be empty".into()));
        }
        if let Some(name) = self.names.get(text) {
            self.hits += 1;
            return Ok(name.clone());
        }
        self.misses += 1;
        let name = Name(Arc::from(text));
        self.names.insert(name.clone());
        Ok(name)
    }

    /// Interns every entry of `texts`, in order.
    ///
    /// # Errors
    ///
    /// Fails on the first empty entry; nothing is returned in that case.
    pub fn intern_all(&mut self, texts: &[&str]) -> BridgeResult<Vec<Name>> {
        texts.iter().map(|text| self.intern(text)).collect()
    }

    /// Number of cached names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Cache hits since creation.
    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    /// Cache misses since creation.
    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.misses
    }

    /// Drops every cached name. Outstanding [`Name`] clones stay valid.
    pub fn clear(&mut self) {
        self.names.clear();
    }
}
