//! # VIZLINK Bridge - Lifecycle & Subject Streaming Engine
//!
//! Streams per-frame transforms and scalar properties from a simulation host
//! to a live visualization bus.
//!
//! ## Architecture
//!
//! - **Session**: one-time subsystem bootstrap, repeatable init/shutdown
//!   with a provider cooldown, auto-recovery of dead connections
//! - **Registry**: subjects keyed by interned names, kind fixed at registration
//! - **Publisher**: auto-registration, schema validation, log-and-drop
//! - **Bus**: transport traits plus an in-process loopback implementation
//!
//! ## Guarantees
//!
//! - The host process is never terminated, whatever the bridge state
//! - Per-frame updates never return an error: they log and drop
//! - A known subject's update does not allocate
//!
//! ```text
//! HOST THREADS                      BRIDGE (one lock)                 BUS
//!   |                                     |                            |
//!   |--- initialize("Sim") -------------->| bootstrap (once)           |
//!   |                                     |--- create_provider ------->|
//!   |--- update_transform("Box1") ------->| auto-register              |
//!   |                                     |--- static + frame -------->|
//!   |--- shutdown() --------------------->|--- remove subjects ------->|
//!   |                                     |--- close provider -------->|
//! ```
//!
//! ## Example
//!
//! ```rust
//! use vizlink_bridge::{Bridge, BridgeConfig, ConnectionStatus};
//! use vizlink_shared::Transform;
//!
//! let (bridge, _bus) = Bridge::loopback(BridgeConfig::default());
//! bridge.initialize("Sim").unwrap();
//! bridge.register_transform("Box1").unwrap();
//! bridge.update_transform("Box1", &Transform::IDENTITY);
//! assert_eq!(bridge.connection_status(), ConnectionStatus::Connected);
//! bridge.shutdown();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod api;
pub mod bridge;
pub mod bus;
pub mod config;
pub mod error;
pub mod names;
pub mod publisher;
pub mod registry;
pub mod session;

pub use bridge::{Bridge, BridgeStats};
pub use bus::{BusMessage, BusProvider, BusTransport, FrameRef, FrameTime, LoopbackTransport, TransformRecord, TransportStats};
pub use config::{BridgeConfig, LoopbackConfig};
pub use error::{BridgeError, BridgeResult, ConfigError, InitError};
pub use names::{Name, NameCache, PropertyName, SubjectKey};
pub use publisher::{LogThrottle, PublishStats};
pub use registry::{SubjectKind, SubjectRecord, SubjectRegistry};
pub use session::{ConnectionStatus, SessionState, SubsystemState};
