//! # VIZLINK Shared
//!
//! Plain data used by both the bridge and the embedding layer.
//!
//! ## CRITICAL RULE
//!
//! Everything in here is already in the visualization engine's convention:
//! centimeters, engine axes, normalized `[X, Y, Z, W]` quaternions.
//! This crate performs no coordinate math.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;

pub use constants::{
    API_VERSION, DEFAULT_COOLDOWN_MS, DEFAULT_LOG_EVERY_N_FRAMES, RESULT_ERROR, RESULT_NOT_CONNECTED,
    RESULT_NOT_INITIALIZED, RESULT_OK, RESULT_PROVIDER_FAILURE,
};
pub use math::{Quaternion, Transform, Vec3};
