//! # Session Controller
//!
//! Owns the one-time subsystem bootstrap, the bus provider handle and the
//! cooldown bookkeeping.
//!
//! ## States
//!
//! ```text
//! NeverInitialized ──Initialize──> SubsystemReady ──provider──> SessionActive
//!                                        ▲                         │
//!                                        │                     Shutdown
//!                                        │                         ▼
//!                                        └────Initialize──── SessionTornDown
//! ```
//!
//! [`SubsystemState`] is sticky: once `Ready` it stays `Ready` for the life
//! of the controller, whatever happens to the session.
//!
//! Nothing in here terminates the host process. Teardown only releases
//! owned resources.

use crate::bus::{BusProvider, BusTransport};
use crate::error::{BridgeError, BridgeResult, InitError};
use std::time::{Duration, Instant};
use vizlink_shared::{RESULT_NOT_CONNECTED, RESULT_NOT_INITIALIZED, RESULT_OK};

/// Process-wide subsystem state. Never reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum SubsystemState {
    /// Bootstrap has not run yet (or failed).
    #[default]
    Unloaded = 0,
    /// Bootstrap succeeded.
    Ready = 1,
}

/// Session lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// No `Initialize` has succeeded in bootstrapping yet.
    #[default]
    NeverInitialized = 0,
    /// Subsystem loaded, no provider (creation failed or in progress).
    SubsystemReady = 1,
    /// Provider handle open; subjects may stream.
    SessionActive = 2,
    /// Shut down; can be re-activated.
    SessionTornDown = 3,
}

/// Result of a connection status check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No active session.
    NotInitialized,
    /// Session active, provider dead and recovery failed.
    NotConnected,
    /// Provider handle valid.
    Connected,
}

impl ConnectionStatus {
    /// Stable numeric result code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::NotInitialized => RESULT_NOT_INITIALIZED,
            Self::NotConnected => RESULT_NOT_CONNECTED,
            Self::Connected => RESULT_OK,
        }
    }
}

/// Session fields guarded by the bridge lock.
#[derive(Default)]
pub struct SessionController {
    subsystem: SubsystemState,
    state: SessionState,
    provider: Option<Box<dyn BusProvider>>,
    provider_name: Option<String>,
    released_at: Option<Instant>,
    sessions_started: u64,
    bootstraps: u32,
}

impl SessionController {
    /// Creates a controller that has never run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Current subsystem state.
    #[inline]
    #[must_use]
    pub const fn subsystem(&self) -> SubsystemState {
        self.subsystem
    }

    /// Name the current (or last) session advertised under.
    #[must_use]
    pub fn provider_name(&self) -> Option<&str> {
        self.provider_name.as_deref()
    }

    /// Sessions successfully activated.
    #[must_use]
    pub const fn sessions_started(&self) -> u64 {
        self.sessions_started
    }

    /// Times the subsystem bootstrap ran. At most one.
    #[must_use]
    pub const fn bootstraps(&self) -> u32 {
        self.bootstraps
    }

    /// True if a provider handle is held, valid or not.
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// True if the session is active under `name` with a valid handle.
    #[must_use]
    pub fn is_active_as(&self, name: &str) -> bool {
        self.state == SessionState::SessionActive
            && self.provider_name.as_deref() == Some(name)
            && self.provider.as_ref().is_some_and(|p| p.is_valid())
    }

    /// Runs the one-time bootstrap if it has not succeeded yet.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::SubsystemBootstrapFailed`] if the transport fails;
    /// the next call retries.
    pub fn ensure_subsystem(&mut self, transport: &dyn BusTransport) -> Result<(), InitError> {
        if self.subsystem == SubsystemState::Ready {
            return Ok(());
        }
        let started = Instant::now();
        transport.bootstrap().map_err(|e| {
            tracing::error!(error = %e, "Subsystem bootstrap failed");
            InitError::SubsystemBootstrapFailed(e.to_string())
        })?;
        self.bootstraps += 1;
        self.subsystem = SubsystemState::Ready;
        if self.state == SessionState::NeverInitialized {
            self.state = SessionState::SubsystemReady;
        }
        tracing::info!(
            elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
            "Subsystem bootstrap complete"
        );
        Ok(())
    }

    /// Time still to wait before a new provider may be created.
    #[must_use]
    pub fn cooldown_remaining(&self, cooldown: Duration) -> Duration {
        self.released_at
            .map_or(Duration::ZERO, |at| cooldown.saturating_sub(at.elapsed()))
    }

    /// Creates the provider and activates the session.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::ProviderCreationFailed`]; the session stays in
    /// its previous state.
    pub fn open_provider(&mut self, transport: &dyn BusTransport, name: &str) -> Result<(), InitError> {
        let provider = transport.create_provider(name).map_err(|e| {
            tracing::error!(provider = name, error = %e, "Provider creation failed");
            InitError::ProviderCreationFailed(e.to_string())
        })?;
        self.provider = Some(provider);
        self.provider_name = Some(name.to_owned());
        self.state = SessionState::SessionActive;
        self.sessions_started += 1;
        Ok(())
    }

    /// Closes and drops the provider, stamping the release time.
    ///
    /// Returns false if no provider was held.
    pub fn release_provider(&mut self) -> bool {
        match self.provider.take() {
            Some(mut provider) => {
                provider.close();
                tracing::debug!(provider = provider.name(), "Provider closed");
                self.released_at = Some(Instant::now());
                true
            }
            None => false,
        }
    }

    /// Marks the session torn down. The subsystem stays ready.
    pub fn mark_torn_down(&mut self) {
        if self.state == SessionState::SessionActive {
            self.state = SessionState::SessionTornDown;
        }
    }

    /// Replaces a dead provider under the same name, ignoring the cooldown.
    ///
    /// On failure the handle is left empty so the next check tries again.
    ///
    /// # Errors
    ///
    /// Returns the transport error, or [`BridgeError::NotInitialized`] if
    /// there is no active session to recover.
    pub fn recreate_provider(&mut self, transport: &dyn BusTransport) -> BridgeResult<()> {
        if self.state != SessionState::SessionActive {
            return Err(BridgeError::NotInitialized);
        }
        let name = self.provider_name.clone().ok_or(BridgeError::NotInitialized)?;
        self.release_provider();
        self.provider = Some(transport.create_provider(&name)?);
        Ok(())
    }

    /// Fails unless a session is active.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotInitialized`].
    #[inline]
    pub fn require_active(&self) -> BridgeResult<()> {
        if self.state == SessionState::SessionActive {
            Ok(())
        } else {
            Err(BridgeError::NotInitialized)
        }
    }

    /// The provider, if it is still valid.
    pub fn valid_provider(&mut self) -> Option<&mut (dyn BusProvider + 'static)> {
        self.provider.as_deref_mut().filter(|p| p.is_valid())
    }

    /// The provider for an active session.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotInitialized`] without a session and
    /// [`BridgeError::ProviderUnavailable`] if the handle is missing or dead.
    pub fn provider_mut(&mut self) -> BridgeResult<&mut (dyn BusProvider + 'static)> {
        self.require_active()?;
        self.valid_provider().ok_or(BridgeError::ProviderUnavailable)
    }
}
