//! # Bus Abstraction
//!
//! The bridge talks to the visualization engine through two traits:
//!
//! ```text
//! BusTransport (process-wide)          BusProvider (one per session)
//! ┌──────────────────────────┐         ┌──────────────────────────┐
//! │ bootstrap()   once       │ ──────> │ push_static / push_frame │
//! │ create_provider(name)    │         │ remove_subject / close   │
//! └──────────────────────────┘         └──────────────────────────┘
//! ```
//!
//! The wire encoding behind these traits is opaque to the bridge.
//! [`LoopbackTransport`] is the in-process implementation.

mod loopback;

pub use loopback::{BusMessage, LoopbackTransport, TransportStats};

use crate::error::BridgeResult;
use crate::names::{PropertyName, SubjectKey};
use crate::registry::SubjectKind;
use std::sync::OnceLock;
use std::time::Instant;
use vizlink_shared::Transform;

/// The bus's own transform record.
///
/// Built from a [`Transform`] by field-for-field copy. No unit or axis
/// conversion happens here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformRecord {
    /// X, Y, Z in centimeters.
    pub location: [f64; 3],
    /// Quaternion `[X, Y, Z, W]`.
    pub rotation: [f64; 4],
    /// X, Y, Z scale factors.
    pub scale: [f64; 3],
}

impl From<&Transform> for TransformRecord {
    #[inline]
    fn from(t: &Transform) -> Self {
        Self {
            location: t.position.to_array(),
            rotation: t.rotation.to_array(),
            scale: t.scale.to_array(),
        }
    }
}

/// Monotonic frame timestamp, in seconds since the first frame of the process.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct FrameTime {
    /// Seconds since the process-wide clock epoch.
    pub seconds: f64,
}

static CLOCK_EPOCH: OnceLock<Instant> = OnceLock::new();

impl FrameTime {
    /// Samples the monotonic clock.
    #[inline]
    #[must_use]
    pub fn now() -> Self {
        let epoch = *CLOCK_EPOCH.get_or_init(Instant::now);
        Self {
            seconds: epoch.elapsed().as_secs_f64(),
        }
    }
}

/// Borrowed frame payload handed to the provider.
///
/// Borrowing keeps the publish path allocation-free; a provider that must
/// keep the data copies it.
#[derive(Clone, Copy, Debug)]
pub struct FrameRef<'a> {
    /// Pose, for transform subjects.
    pub transform: Option<TransformRecord>,
    /// Property values in schema order.
    pub values: &'a [f32],
    /// When the frame was built.
    pub time: FrameTime,
}

/// Process-wide transport. Creates per-session providers.
pub trait BusTransport: Send + Sync {
    /// Loads the transport's runtime modules.
    ///
    /// Expensive. The bridge calls it at most once per process.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BridgeError::SubsystemBootstrapFailure`] on failure.
    fn bootstrap(&self) -> BridgeResult<()>;

    /// Opens a provider advertised under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle cannot be created, for example while
    /// a provider with the same name is still live.
    fn create_provider(&self, name: &str) -> BridgeResult<Box<dyn BusProvider>>;
}

/// One live connection to the bus. Exactly one owner at a time.
pub trait BusProvider: Send {
    /// Advertised name.
    fn name(&self) -> &str;

    /// False once the connection has silently dropped or been closed.
    fn is_valid(&self) -> bool;

    /// Announces a subject and its schema. Sent once, not per frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is dead or the message is rejected.
    fn push_static(
        &mut self,
        subject: &SubjectKey,
        kind: SubjectKind,
        schema: &[PropertyName],
    ) -> BridgeResult<()>;

    /// Pushes one frame for a subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is dead or the message is rejected.
    fn push_frame(&mut self, subject: &SubjectKey, frame: &FrameRef<'_>) -> BridgeResult<()>;

    /// Withdraws a subject from the bus.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is dead or the message is rejected.
    fn remove_subject(&mut self, subject: &SubjectKey) -> BridgeResult<()>;

    /// Releases the connection. Idempotent.
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use vizlink_shared::{Quaternion, Vec3};

    #[test]
    fn test_transform_record_is_structural() {
        let t = Transform::new(
            Vec3::new(150.0, -20.0, 0.0),
            Quaternion::new(0.0, 0.0, 0.3826834, 0.9238795),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let record = TransformRecord::from(&t);
        assert_eq!(record.location, [150.0, -20.0, 0.0]);
        assert_eq!(record.rotation, [0.0, 0.0, 0.3826834, 0.9238795]);
        assert_eq!(record.scale, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_frame_time_is_monotonic() {
        let a = FrameTime::now();
        let b = FrameTime::now();
        assert!(b >= a);
        assert!(a.seconds >= 0.0);
    }
}
