//! # Subject Registry
//!
//! Map from [`SubjectKey`] to [`SubjectRecord`].
//!
//! The registry is pure bookkeeping: it never talks to the bus. The bridge
//! holds its exclusive lock while mutating the registry and calling the
//! provider, so the two never disagree.

use crate::error::{BridgeError, BridgeResult};
use crate::names::{PropertyName, SubjectKey};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Role of a subject on the bus. Fixed at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SubjectKind {
    /// Carries a pose (position, rotation, scale) plus optional properties.
    Transform = 0,
    /// Carries only named scalar properties.
    Data = 1,
}

/// Metadata for one registered subject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectRecord {
    /// Interned subject name.
    pub key: SubjectKey,
    /// Transform or data.
    pub kind: SubjectKind,
    /// Declared property names, in frame order.
    pub schema: Vec<PropertyName>,
    /// True once the static schema message reached the current provider.
    pub registered_with_bus: bool,
}

impl SubjectRecord {
    /// Creates a record not yet announced to the bus.
    #[must_use]
    pub fn new(key: SubjectKey, kind: SubjectKind, schema: Vec<PropertyName>) -> Self {
        Self {
            key,
            kind,
            schema,
            registered_with_bus: false,
        }
    }

    /// Number of values every frame must carry.
    #[inline]
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.schema.len()
    }

    /// Checks a frame's value count against the schema.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::SchemaMismatch`] when the counts differ.
    pub fn check_values(&self, values: &[f32]) -> BridgeResult<()> {
        if values.len() == self.schema.len() {
            Ok(())
        } else {
            Err(BridgeError::SchemaMismatch {
                subject: self.key.to_string(),
                expected: self.schema.len(),
                actual: values.len(),
            })
        }
    }

    /// Fails unless the record has the `requested` kind.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::KindMismatch`].
    pub fn check_kind(&self, requested: SubjectKind) -> BridgeResult<()> {
        if self.kind == requested {
            Ok(())
        } else {
            Err(BridgeError::KindMismatch {
                subject: self.key.to_string(),
                registered: self.kind,
                requested,
            })
        }
    }
}

/// Rejects schemas that name the same property twice.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidArgument`] naming the duplicate.
pub fn validate_schema(schema: &[PropertyName]) -> BridgeResult<()> {
    for (i, name) in schema.iter().enumerate() {
        if schema[..i].contains(name) {
            return Err(BridgeError::InvalidArgument(format!(
                "duplicate property name '{name}'"
            )));
        }
    }
    Ok(())
}

/// Rejects property names that are empty or repeated, before any is interned.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidArgument`] naming the offending entry.
pub fn validate_property_names(names: &[&str]) -> BridgeResult<()> {
    for (i, name) in names.iter().enumerate() {
        if name.is_empty() {
            return Err(BridgeError::InvalidArgument("name must not be empty".into()));
        }
        if names[..i].contains(name) {
            return Err(BridgeError::InvalidArgument(format!(
                "duplicate property name '{name}'"
            )));
        }
    }
    Ok(())
}

/// All subjects known to the current session.
#[derive(Default)]
pub struct SubjectRegistry {
    subjects: HashMap<SubjectKey, SubjectRecord>,
}

impl SubjectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or overwrites a record.
    ///
    /// Re-registering with the same kind replaces the schema and clears
    /// `registered_with_bus` so the caller re-announces it.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::KindMismatch`] if the key exists with another kind.
    pub fn upsert(
        &mut self,
        key: SubjectKey,
        kind: SubjectKind,
        schema: Vec<PropertyName>,
    ) -> BridgeResult<&mut SubjectRecord> {
        validate_schema(&schema)?;
        match self.subjects.entry(key) {
            Entry::Occupied(entry) => {
                let record = entry.into_mut();
                record.check_kind(kind)?;
                record.schema = schema;
                record.registered_with_bus = false;
                Ok(record)
            }
            Entry::Vacant(entry) => {
                let record = SubjectRecord::new(entry.key().clone(), kind, schema);
                Ok(entry.insert(record))
            }
        }
    }

    /// Returns the record for `key`, inserting one built from `schema` if absent.
    ///
    /// The boolean is true when the record was created by this call.
    /// `schema` runs only on insertion.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::KindMismatch`] if the key exists with another
    /// kind, or the error produced by `schema`.
    pub fn get_or_insert_with<F>(
        &mut self,
        key: &SubjectKey,
        kind: SubjectKind,
        schema: F,
    ) -> BridgeResult<(&mut SubjectRecord, bool)>
    where
        F: FnOnce() -> BridgeResult<Vec<PropertyName>>,
    {
        // Cloning the key bumps a refcount; it never allocates.
        match self.subjects.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let record = entry.into_mut();
                record.check_kind(kind)?;
                Ok((record, false))
            }
            Entry::Vacant(entry) => {
                let schema = schema()?;
                validate_schema(&schema)?;
                let record = SubjectRecord::new(key.clone(), kind, schema);
                Ok((entry.insert(record), true))
            }
        }
    }

    /// Looks up a subject by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SubjectRecord> {
        self.subjects.get(name)
    }

    /// Removes a subject of the given kind.
    ///
    /// Unknown names yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::KindMismatch`] and keeps the record if it has
    /// another kind.
    pub fn remove(&mut self, name: &str, kind: SubjectKind) -> BridgeResult<Option<SubjectRecord>> {
        match self.subjects.get(name) {
            None => Ok(None),
            Some(record) => {
                record.check_kind(kind)?;
                Ok(self.subjects.remove(name))
            }
        }
    }

    /// Iterates over all records in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &SubjectRecord> {
        self.subjects.values()
    }

    /// Iterates mutably over all records in arbitrary order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SubjectRecord> {
        self.subjects.values_mut()
    }

    /// Number of subjects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    /// True if no subject is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Count of subjects of one kind.
    #[must_use]
    pub fn count_of(&self, kind: SubjectKind) -> usize {
        self.subjects.values().filter(|r| r.kind == kind).count()
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.subjects.clear();
    }
}
