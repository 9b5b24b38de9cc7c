//! # Contract Constants
//!
//! Stable values shared with the embedding layer.
//!
//! **CRITICAL:** The result codes are part of the external contract.
//! Changing any of them requires bumping [`API_VERSION`].

// =============================================================================
// API VERSION
// =============================================================================

/// Contract version, incremented on any breaking change to the function surface.
pub const API_VERSION: i32 = 1;

// =============================================================================
// RESULT CODES (negative for errors)
// =============================================================================

/// Operation successful / connected.
pub const RESULT_OK: i32 = 0;

/// General error (invalid argument, subsystem bootstrap failure).
pub const RESULT_ERROR: i32 = -1;

/// Session active but the bus provider is not connected.
pub const RESULT_NOT_CONNECTED: i32 = -2;

/// No session is active.
pub const RESULT_NOT_INITIALIZED: i32 = -3;

/// The bus provider handle could not be created.
pub const RESULT_PROVIDER_FAILURE: i32 = -4;

// =============================================================================
// TIMING DEFAULTS
// =============================================================================

/// Settling time the bus transport needs between releasing a provider and
/// advertising a new one.
pub const DEFAULT_COOLDOWN_MS: u64 = 500;

/// Throttled log lines are emitted on the first call and every Nth call after.
pub const DEFAULT_LOG_EVERY_N_FRAMES: u32 = 60;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_codes_are_distinct() {
        let codes = [
            RESULT_OK,
            RESULT_ERROR,
            RESULT_NOT_CONNECTED,
            RESULT_NOT_INITIALIZED,
            RESULT_PROVIDER_FAILURE,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(codes[1..].iter().all(|c| *c < 0));
    }
}
