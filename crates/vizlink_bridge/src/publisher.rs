//! # Frame Publisher
//!
//! Validates per-frame updates against the registry and pushes them to the
//! bus provider.
//!
//! ## Hot Path
//!
//! ```text
//! name ──registry lookup──> key ──────────────────> schema check
//!                                                     │
//!                           FrameRef (borrowed) <─────┘
//!                                 │
//!                          provider.push_frame
//! ```
//!
//! Nothing on this path allocates once the subject is known. Names of a new
//! subject are interned only after its update passes validation. Failures
//! never propagate to the caller: they are logged and the single frame is
//! dropped.

use crate::bus::{FrameRef, FrameTime, TransformRecord};
use crate::error::{BridgeError, BridgeResult};
use crate::names::{NameCache, PropertyName};
use crate::registry::{validate_property_names, SubjectKind, SubjectRegistry};
use crate::session::SessionController;
use std::sync::atomic::{AtomicU64, Ordering};
use vizlink_shared::Transform;

/// Emits on the first call and every Nth call after.
pub struct LogThrottle {
    every: u64,
    count: AtomicU64,
}

impl LogThrottle {
    /// Creates a throttle; `every` of zero behaves like one.
    #[must_use]
    pub fn new(every: u32) -> Self {
        Self {
            every: u64::from(every.max(1)),
            count: AtomicU64::new(0),
        }
    }

    /// Counts a call. Returns the running count when this call should log.
    #[inline]
    pub fn hit(&self) -> Option<u64> {
        let n = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        ((n - 1) % self.every == 0).then_some(n)
    }

    /// Calls counted so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Publisher counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishStats {
    /// Frames accepted by the provider.
    pub frames_published: u64,
    /// Frames dropped (validation, no session, transport).
    pub frames_dropped: u64,
    /// Subjects created by an update instead of a register call.
    pub auto_registrations: u64,
}

/// One per-frame update request.
#[derive(Clone, Copy, Debug)]
pub struct Update<'a> {
    /// Kind the caller is updating.
    pub kind: SubjectKind,
    /// Pose, for transform updates.
    pub transform: Option<&'a Transform>,
    /// Property values. `None` skips schema validation (pose-only update).
    pub values: Option<&'a [f32]>,
    /// Names used as the schema if the update auto-registers the subject.
    pub property_names: Option<&'a [&'a str]>,
}

impl<'a> Update<'a> {
    /// Pose-only transform update.
    #[must_use]
    pub const fn transform(transform: &'a Transform) -> Self {
        Self {
            kind: SubjectKind::Transform,
            transform: Some(transform),
            values: None,
            property_names: None,
        }
    }

    /// Transform update carrying property values.
    #[must_use]
    pub const fn transform_with_values(transform: &'a Transform, values: &'a [f32]) -> Self {
        Self {
            kind: SubjectKind::Transform,
            transform: Some(transform),
            values: Some(values),
            property_names: None,
        }
    }

    /// Data-only update.
    #[must_use]
    pub const fn data(values: &'a [f32], property_names: Option<&'a [&'a str]>) -> Self {
        Self {
            kind: SubjectKind::Data,
            transform: None,
            values: Some(values),
            property_names,
        }
    }
}

/// Checks the schema hint of a subject's first update without interning.
fn check_hint(update: &Update<'_>) -> BridgeResult<()> {
    let count = update.values.map_or(0, <[f32]>::len);
    match update.property_names {
        Some(given) if given.len() != count => Err(BridgeError::InvalidArgument(format!(
            "{} property names for {count} values",
            given.len()
        ))),
        Some(given) => validate_property_names(given),
        None => Ok(()),
    }
}

/// Builds the schema of a subject created by its first update.
fn infer_schema(names: &mut NameCache, update: &Update<'_>) -> BridgeResult<Vec<PropertyName>> {
    let count = update.values.map_or(0, <[f32]>::len);
    match update.property_names {
        Some(given) if given.len() == count => names.intern_all(given),
        Some(given) => Err(BridgeError::InvalidArgument(format!(
            "{} property names for {count} values",
            given.len()
        ))),
        None => (0..count)
            .map(|i| names.intern(&format!("Property{i}")))
            .collect(),
    }
}

/// Pushes validated frames to the session's provider.
pub struct FramePublisher {
    stats: PublishStats,
    not_initialized: LogThrottle,
    transport_failures: LogThrottle,
    published: LogThrottle,
}

impl FramePublisher {
    /// Creates a publisher whose throttled logs fire every `log_every` frames.
    #[must_use]
    pub fn new(log_every: u32) -> Self {
        Self {
            stats: PublishStats::default(),
            not_initialized: LogThrottle::new(log_every),
            transport_failures: LogThrottle::new(log_every),
            published: LogThrottle::new(log_every),
        }
    }

    /// Snapshot of the counters.
    #[must_use]
    pub const fn stats(&self) -> PublishStats {
        self.stats
    }

    /// Publishes one update, logging and dropping it on any failure.
    ///
    /// Returns true if the provider accepted the frame.
    pub fn publish(
        &mut self,
        op: &'static str,
        session: &mut SessionController,
        registry: &mut SubjectRegistry,
        names: &mut NameCache,
        name: &str,
        update: &Update<'_>,
    ) -> bool {
        match self.try_publish(session, registry, names, name, update) {
            Ok(()) => {
                self.stats.frames_published += 1;
                if let Some(count) = self.published.hit() {
                    tracing::debug!(op, subject = name, count, "Frame published");
                }
                true
            }
            Err(err) => {
                self.stats.frames_dropped += 1;
                self.log_drop(op, name, &err);
                false
            }
        }
    }

    fn try_publish(
        &mut self,
        session: &mut SessionController,
        registry: &mut SubjectRegistry,
        names: &mut NameCache,
        name: &str,
        update: &Update<'_>,
    ) -> BridgeResult<()> {
        session.require_active()?;
        if let Some(t) = update.transform {
            if !t.is_finite() {
                return Err(BridgeError::InvalidArgument("transform contains NaN or infinity".into()));
            }
        }

        let key = match registry.get(name) {
            Some(existing) => existing.key.clone(),
            None => {
                check_hint(update)?;
                names.intern(name)?
            }
        };
        let (record, created) =
            registry.get_or_insert_with(&key, update.kind, || infer_schema(names, update))?;
        if created {
            self.stats.auto_registrations += 1;
            tracing::info!(
                subject = %record.key,
                kind = ?record.kind,
                properties = record.property_count(),
                "Auto-registering subject"
            );
        }
        if let Some(values) = update.values {
            record.check_values(values)?;
        }

        let provider = session.provider_mut()?;
        if !record.registered_with_bus {
            provider.push_static(&record.key, record.kind, &record.schema)?;
            record.registered_with_bus = true;
        }
        let frame = FrameRef {
            transform: update.transform.map(TransformRecord::from),
            values: update.values.unwrap_or(&[]),
            time: FrameTime::now(),
        };
        provider.push_frame(&record.key, &frame)
    }

    fn log_drop(&self, op: &'static str, name: &str, err: &BridgeError) {
        match err {
            BridgeError::NotInitialized => {
                if let Some(count) = self.not_initialized.hit() {
                    tracing::warn!(op, subject = name, count, "Not initialized, update ignored");
                }
            }
            BridgeError::SchemaMismatch { expected, actual, .. } => {
                tracing::error!(
                    op,
                    subject = name,
                    expected,
                    actual,
                    "Property count mismatch, frame dropped"
                );
            }
            BridgeError::ProviderUnavailable | BridgeError::Transport(_) => {
                if let Some(count) = self.transport_failures.hit() {
                    tracing::warn!(op, subject = name, count, error = %err, "Bus unavailable, frame dropped");
                }
            }
            other => {
                tracing::warn!(op, subject = name, error = %other, "Frame dropped");
            }
        }
    }
}
