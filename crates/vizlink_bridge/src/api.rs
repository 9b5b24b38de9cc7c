//! # Result-Code Surface
//!
//! Free functions over one process-wide [`Bridge`], for embedding layers that
//! speak integer result codes.
//!
//! | Function | Returns |
//! |----------|---------|
//! | [`initialize`] | `0` ok, `-1` error, `-4` provider failure |
//! | [`is_connected`] | `0` connected, `-2` not connected, `-3` not initialized |
//! | [`get_version`] | [`API_VERSION`] |
//! | everything else | nothing; failures are logged |
//!
//! Call [`install`] before anything else to choose the transport. Without it
//! the first call creates a loopback bridge with the default configuration.

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use std::sync::OnceLock;
use vizlink_shared::{Transform, API_VERSION, RESULT_OK};

static BRIDGE: OnceLock<Bridge> = OnceLock::new();

/// Installs the process-wide bridge.
///
/// # Errors
///
/// Hands `bridge` back if one is already installed (or was created lazily).
pub fn install(bridge: Bridge) -> Result<(), Bridge> {
    BRIDGE.set(bridge)
}

/// The process-wide bridge, created on first use if none was installed.
pub fn bridge() -> &'static Bridge {
    BRIDGE.get_or_init(|| {
        tracing::debug!("No bridge installed, using loopback transport");
        Bridge::loopback(BridgeConfig::default()).0
    })
}

/// Starts a session. See [`Bridge::initialize`].
#[must_use]
pub fn initialize(provider_name: &str) -> i32 {
    match bridge().initialize(provider_name) {
        Ok(()) => RESULT_OK,
        Err(e) => e.code(),
    }
}

/// Ends the session. Never terminates the process.
pub fn shutdown() {
    bridge().shutdown();
}

/// Interface version.
#[must_use]
pub const fn get_version() -> i32 {
    API_VERSION
}

/// Connection status code, with one auto-recovery attempt.
#[must_use]
pub fn is_connected() -> i32 {
    bridge().connection_status().code()
}

/// Registers a transform subject.
pub fn register_object(name: &str) {
    let _ = bridge().register_transform(name);
}

/// Registers a transform subject with named properties.
pub fn register_object_with_properties(name: &str, property_names: &[&str]) {
    let _ = bridge().register_transform_with_properties(name, property_names);
}

/// Streams a pose.
pub fn update_object(name: &str, transform: &Transform) {
    bridge().update_transform(name, transform);
}

/// Streams a pose with property values.
pub fn update_object_with_properties(name: &str, transform: &Transform, values: &[f32]) {
    bridge().update_transform_with_properties(name, transform, values);
}

/// Withdraws a transform subject.
pub fn remove_object(name: &str) {
    let _ = bridge().remove_transform(name);
}

/// Registers a data subject.
pub fn register_data_subject(name: &str, property_names: &[&str]) {
    let _ = bridge().register_data(name, property_names);
}

/// Streams data values. `property_names` seed the schema on auto-registration.
pub fn update_data_subject(name: &str, property_names: Option<&[&str]>, values: &[f32]) {
    bridge().update_data(name, values, property_names);
}

/// Withdraws a data subject.
pub fn remove_data_subject(name: &str) {
    let _ = bridge().remove_data(name);
}
