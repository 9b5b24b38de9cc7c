//! # Bridge
//!
//! The engine facade. One [`Bridge`] owns the session controller, the subject
//! registry and the name cache behind a single exclusive lock.
//!
//! ## Locking
//!
//! Every operation takes the lock for its in-memory work plus the call into
//! the bus provider. The only wait, the provider cooldown in
//! [`Bridge::initialize`], happens with the lock released.
//!
//! ## Failure Policy
//!
//! - `initialize` returns an [`InitError`]
//! - register and remove calls log, then hand the error back for Rust hosts
//! - update calls log and drop; they return nothing

use crate::bus::{BusTransport, LoopbackTransport};
use crate::config::{BridgeConfig, LoopbackConfig};
use crate::error::{BridgeError, BridgeResult, InitError};
use crate::names::NameCache;
use crate::publisher::{FramePublisher, Update};
use crate::registry::{validate_property_names, SubjectKind, SubjectRecord, SubjectRegistry};
use crate::session::{ConnectionStatus, SessionController, SessionState, SubsystemState};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vizlink_shared::Transform;

/// Bridge statistics snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Frames accepted by the bus.
    pub frames_published: u64,
    /// Frames logged and dropped.
    pub frames_dropped: u64,
    /// Subjects created by their first update.
    pub auto_registrations: u64,
    /// Successful provider recoveries during status checks.
    pub recoveries: u64,
    /// Sessions activated by `initialize`.
    pub sessions_started: u64,
    /// Subsystem bootstraps. Stays at one for the life of the bridge.
    pub bootstraps: u32,
    /// Live transform subjects.
    pub transform_subjects: usize,
    /// Live data subjects.
    pub data_subjects: usize,
    /// Name lookups served from the cache.
    pub name_cache_hits: u64,
    /// Names allocated by the cache.
    pub name_cache_misses: u64,
}

/// State guarded by the bridge lock.
struct Inner {
    session: SessionController,
    registry: SubjectRegistry,
    names: NameCache,
    publisher: FramePublisher,
    recoveries: u64,
}

impl Inner {
    /// Withdraws subjects, clears bookkeeping and releases the provider.
    ///
    /// Subjects leave the bus before the provider is closed.
    fn teardown(&mut self, reason: &'static str) {
        let mut withdrawn = 0usize;
        if let Some(provider) = self.session.valid_provider() {
            for record in self.registry.iter().filter(|r| r.registered_with_bus) {
                match provider.remove_subject(&record.key) {
                    Ok(()) => withdrawn += 1,
                    Err(e) => tracing::warn!(subject = %record.key, error = %e, "Subject removal failed"),
                }
            }
        }
        let subjects = self.registry.len();
        self.registry.clear();
        self.names.clear();
        let released = self.session.release_provider();
        self.session.mark_torn_down();
        tracing::info!(
            reason,
            subjects,
            withdrawn,
            released,
            provider = self.session.provider_name().unwrap_or_default(),
            "Session torn down"
        );
    }

    /// Replaces a dead provider and re-announces every subject on it.
    fn recover(&mut self, transport: &dyn BusTransport) -> BridgeResult<usize> {
        self.session.recreate_provider(transport)?;
        let provider = self.session.provider_mut()?;
        let mut announced = 0;
        for record in self.registry.iter_mut() {
            record.registered_with_bus = false;
            match provider.push_static(&record.key, record.kind, &record.schema) {
                Ok(()) => {
                    record.registered_with_bus = true;
                    announced += 1;
                }
                Err(e) => tracing::warn!(subject = %record.key, error = %e, "Static data re-push failed"),
            }
        }
        self.recoveries += 1;
        Ok(announced)
    }

    fn register(&mut self, name: &str, kind: SubjectKind, properties: &[&str]) -> BridgeResult<()> {
        self.session.require_active()?;
        if let Some(existing) = self.registry.get(name) {
            existing.check_kind(kind)?;
        }
        validate_property_names(properties)?;
        let key = self.names.intern(name)?;
        let schema = self.names.intern_all(properties)?;
        let record = self.registry.upsert(key, kind, schema)?;
        let provider = self.session.provider_mut()?;
        provider.push_static(&record.key, record.kind, &record.schema)?;
        record.registered_with_bus = true;
        tracing::info!(subject = name, ?kind, properties = properties.len(), "Subject registered");
        Ok(())
    }

    fn remove(&mut self, name: &str, kind: SubjectKind) -> BridgeResult<()> {
        self.session.require_active()?;
        let Some(record) = self.registry.remove(name, kind)? else {
            tracing::debug!(subject = name, "Remove of unknown subject ignored");
            return Ok(());
        };
        if record.registered_with_bus {
            if let Some(provider) = self.session.valid_provider() {
                provider.remove_subject(&record.key)?;
            }
        }
        tracing::info!(subject = name, ?kind, "Subject removed");
        Ok(())
    }
}

/// Bridge between a simulation host and a live visualization bus.
///
/// `Bridge` is `Send + Sync`; every method takes `&self`.
pub struct Bridge {
    transport: Arc<dyn BusTransport>,
    config: BridgeConfig,
    inner: Mutex<Inner>,
}

impl Bridge {
    /// Creates an idle bridge over `transport`. Nothing is bootstrapped yet.
    #[must_use]
    pub fn new(transport: Arc<dyn BusTransport>, config: BridgeConfig) -> Self {
        let publisher = FramePublisher::new(config.log_every_n_frames);
        Self {
            transport,
            config,
            inner: Mutex::new(Inner {
                session: SessionController::new(),
                registry: SubjectRegistry::new(),
                names: NameCache::new(),
                publisher,
                recoveries: 0,
            }),
        }
    }

    /// Creates a bridge over a fresh in-process loopback bus.
    ///
    /// The returned transport handle observes the same bus.
    #[must_use]
    pub fn loopback(config: BridgeConfig) -> (Self, LoopbackTransport) {
        let transport = LoopbackTransport::new(&LoopbackConfig::default());
        let bridge = Self::new(Arc::new(transport.clone()), config);
        (bridge, transport)
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Starts a session advertised under `provider_name`.
    ///
    /// Bootstraps the subsystem on the first call ever. Calling again while
    /// active under the same name is a no-op; any other live session is torn
    /// down first. If the previous provider was released less than the
    /// cooldown ago, the call sleeps out the remainder with the lock released.
    ///
    /// # Errors
    ///
    /// - [`InitError::InvalidArgument`] for an empty name
    /// - [`InitError::SubsystemBootstrapFailed`] if the one-time load fails
    /// - [`InitError::ProviderCreationFailed`] if the bus refuses the handle
    pub fn initialize(&self, provider_name: &str) -> Result<(), InitError> {
        if provider_name.is_empty() {
            tracing::error!("Initialize called with an empty provider name");
            return Err(InitError::InvalidArgument);
        }
        let started = Instant::now();
        let cooldown = self.config.cooldown();

        loop {
            let wait = {
                let mut inner = self.inner.lock();
                inner.session.ensure_subsystem(self.transport.as_ref())?;

                if inner.session.is_active_as(provider_name) {
                    tracing::debug!(provider = provider_name, "Already initialized");
                    return Ok(());
                }
                if inner.session.state() == SessionState::SessionActive || inner.session.has_provider() {
                    inner.teardown("re-initialize");
                }

                let wait = inner.session.cooldown_remaining(cooldown);
                if wait.is_zero() {
                    inner.session.open_provider(self.transport.as_ref(), provider_name)?;
                    tracing::info!(
                        provider = provider_name,
                        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "Session active"
                    );
                    return Ok(());
                }
                wait
            };
            let wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
            tracing::debug!(wait_ms, "Waiting out provider cooldown");
            std::thread::sleep(wait);
        }
    }

    /// Ends the session. Safe before any `initialize` and when repeated.
    ///
    /// The subsystem stays loaded and the host process is never touched.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        if inner.session.state() != SessionState::SessionActive && !inner.session.has_provider() {
            tracing::debug!(state = ?inner.session.state(), "Shutdown with no active session");
            return;
        }
        inner.teardown("shutdown");
    }

    /// Reports whether the bus connection is usable.
    ///
    /// A dead provider is recreated once per call when `auto_recover` is on.
    pub fn connection_status(&self) -> ConnectionStatus {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.session.state() != SessionState::SessionActive {
            return ConnectionStatus::NotInitialized;
        }
        if inner.session.valid_provider().is_some() {
            return ConnectionStatus::Connected;
        }
        if !self.config.auto_recover {
            return ConnectionStatus::NotConnected;
        }
        match inner.recover(self.transport.as_ref()) {
            Ok(subjects) => {
                tracing::info!(
                    provider = inner.session.provider_name().unwrap_or_default(),
                    subjects,
                    "Connection recovered"
                );
                ConnectionStatus::Connected
            }
            Err(e) => {
                tracing::warn!(error = %e, "Connection recovery failed");
                ConnectionStatus::NotConnected
            }
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a transform subject with no properties.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register_transform_with_properties`].
    pub fn register_transform(&self, name: &str) -> BridgeResult<()> {
        self.register("register_transform", name, SubjectKind::Transform, &[])
    }

    /// Registers (or re-registers) a transform subject with named properties.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotInitialized`], [`BridgeError::InvalidArgument`] for
    /// empty or duplicate names, [`BridgeError::KindMismatch`] if the name is
    /// a data subject, or a provider error. All are also logged.
    pub fn register_transform_with_properties(&self, name: &str, properties: &[&str]) -> BridgeResult<()> {
        self.register("register_transform", name, SubjectKind::Transform, properties)
    }

    /// Registers (or re-registers) a data-only subject.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register_transform_with_properties`], with the kinds
    /// swapped.
    pub fn register_data(&self, name: &str, properties: &[&str]) -> BridgeResult<()> {
        self.register("register_data", name, SubjectKind::Data, properties)
    }

    fn register(&self, op: &'static str, name: &str, kind: SubjectKind, properties: &[&str]) -> BridgeResult<()> {
        let result = self.inner.lock().register(name, kind, properties);
        if let Err(e) = &result {
            tracing::warn!(op, subject = name, error = %e, "Registration ignored");
        }
        result
    }

    // =========================================================================
    // Streaming
    // =========================================================================

    /// Streams a pose. Unknown subjects are auto-registered.
    pub fn update_transform(&self, name: &str, transform: &Transform) {
        self.publish("update_transform", name, &Update::transform(transform));
    }

    /// Streams a pose with property values.
    ///
    /// The value count must match the subject's schema or the frame is dropped.
    pub fn update_transform_with_properties(&self, name: &str, transform: &Transform, values: &[f32]) {
        self.publish(
            "update_transform_with_properties",
            name,
            &Update::transform_with_values(transform, values),
        );
    }

    /// Streams property values for a data subject.
    ///
    /// `property_names` become the schema only if this call auto-registers
    /// the subject; otherwise names are inferred as `Property0..N-1`.
    pub fn update_data(&self, name: &str, values: &[f32], property_names: Option<&[&str]>) {
        self.publish("update_data", name, &Update::data(values, property_names));
    }

    fn publish(&self, op: &'static str, name: &str, update: &Update<'_>) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner
            .publisher
            .publish(op, &mut inner.session, &mut inner.registry, &mut inner.names, name, update);
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Withdraws a transform subject. Unknown names are a no-op.
    ///
    /// # Errors
    ///
    /// [`BridgeError::KindMismatch`] if the name is a data subject (the
    /// record is kept), or a provider error. Both are also logged.
    pub fn remove_transform(&self, name: &str) -> BridgeResult<()> {
        self.remove("remove_transform", name, SubjectKind::Transform)
    }

    /// Withdraws a data subject. Unknown names are a no-op.
    ///
    /// # Errors
    ///
    /// Same as [`Self::remove_transform`], with the kinds swapped.
    pub fn remove_data(&self, name: &str) -> BridgeResult<()> {
        self.remove("remove_data", name, SubjectKind::Data)
    }

    fn remove(&self, op: &'static str, name: &str, kind: SubjectKind) -> BridgeResult<()> {
        let result = self.inner.lock().remove(name, kind);
        match &result {
            Ok(()) => {}
            Err(BridgeError::NotInitialized) => {
                tracing::debug!(op, subject = name, "Remove with no active session ignored");
                return Ok(());
            }
            Err(e) => tracing::warn!(op, subject = name, error = %e, "Remove failed"),
        }
        result
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Current session state.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.inner.lock().session.state()
    }

    /// Current subsystem state.
    #[must_use]
    pub fn subsystem_state(&self) -> SubsystemState {
        self.inner.lock().session.subsystem()
    }

    /// Name of the current (or last) session.
    #[must_use]
    pub fn provider_name(&self) -> Option<String> {
        self.inner.lock().session.provider_name().map(str::to_owned)
    }

    /// Registered subjects.
    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.inner.lock().registry.len()
    }

    /// Snapshot of one subject's record.
    #[must_use]
    pub fn subject(&self, name: &str) -> Option<SubjectRecord> {
        self.inner.lock().registry.get(name).cloned()
    }

    /// Names currently interned.
    #[must_use]
    pub fn cached_name_count(&self) -> usize {
        self.inner.lock().names.len()
    }

    /// Time left before a new provider may be created.
    #[must_use]
    pub fn cooldown_remaining(&self) -> Duration {
        self.inner.lock().session.cooldown_remaining(self.config.cooldown())
    }

    /// Counters snapshot.
    #[must_use]
    pub fn stats(&self) -> BridgeStats {
        let inner = self.inner.lock();
        let publish = inner.publisher.stats();
        BridgeStats {
            frames_published: publish.frames_published,
            frames_dropped: publish.frames_dropped,
            auto_registrations: publish.auto_registrations,
            recoveries: inner.recoveries,
            sessions_started: inner.session.sessions_started(),
            bootstraps: inner.session.bootstraps(),
            transform_subjects: inner.registry.count_of(SubjectKind::Transform),
            data_subjects: inner.registry.count_of(SubjectKind::Data),
            name_cache_hits: inner.names.hits(),
            name_cache_misses: inner.names.misses(),
        }
    }
}
