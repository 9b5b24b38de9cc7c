//! # Loopback Transport
//!
//! In-process bus: every provider message lands on one bounded
//! `crossbeam-channel`. A monitor (the visualization side, or a test)
//! drains it with [`LoopbackTransport::monitor`].
//!
//! ## Design
//!
//! - Sends never block: a full channel evicts its oldest message and counts it
//! - A provider name stays reserved until its handle is closed or dropped
//! - Fault injection for connection loss and creation failures

use super::{BusProvider, BusTransport, FrameRef, FrameTime, TransformRecord};
use crate::config::LoopbackConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::names::{PropertyName, SubjectKey};
use crate::registry::SubjectKind;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Message observed on the loopback bus.
#[derive(Clone, Debug, PartialEq)]
pub enum BusMessage {
    /// A provider started advertising.
    ProviderOnline {
        /// Advertised name.
        provider: String,
    },
    /// Subject schema announcement.
    StaticData {
        /// Subject name.
        subject: SubjectKey,
        /// Transform or data role.
        kind: SubjectKind,
        /// Property names in frame order.
        schema: Vec<PropertyName>,
    },
    /// One frame of subject data.
    FrameData {
        /// Subject name.
        subject: SubjectKey,
        /// Pose, for transform subjects.
        transform: Option<TransformRecord>,
        /// Property values in schema order.
        values: Vec<f32>,
        /// Frame timestamp.
        time: FrameTime,
    },
    /// Subject withdrawn.
    SubjectRemoved {
        /// Subject name.
        subject: SubjectKey,
    },
    /// A provider stopped advertising.
    ProviderOffline {
        /// Advertised name.
        provider: String,
    },
}

/// Loopback statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Messages accepted by the channel.
    pub messages_sent: u64,
    /// Queued messages evicted by a full channel.
    pub messages_dropped: u64,
    /// Frames accepted by the channel.
    pub frames_sent: u64,
    /// Providers successfully created.
    pub providers_created: u64,
    /// Provider creations refused.
    pub provider_failures: u64,
}

struct Shared {
    sender: Sender<BusMessage>,
    receiver: Receiver<BusMessage>,
    live_names: Mutex<HashSet<String>>,
    stats: Mutex<TransportStats>,
    bootstraps: AtomicU32,
    /// Providers from an older generation report themselves invalid.
    generation: AtomicU64,
    fail_next_provider: AtomicBool,
    fail_bootstrap: AtomicBool,
}

impl Shared {
    /// Queues a message, evicting the oldest queued one while the channel is full.
    fn send(&self, mut message: BusMessage) -> BridgeResult<()> {
        let is_frame = matches!(message, BusMessage::FrameData { .. });
        loop {
            match self.sender.try_send(message) {
                Ok(()) => {
                    let mut stats = self.stats.lock();
                    stats.messages_sent += 1;
                    if is_frame {
                        stats.frames_sent += 1;
                    }
                    return Ok(());
                }
                Err(TrySendError::Full(rejected)) => {
                    if self.receiver.try_recv().is_ok() {
                        self.stats.lock().messages_dropped += 1;
                    }
                    message = rejected;
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.stats.lock().messages_dropped += 1;
                    return Err(BridgeError::Transport("loopback channel disconnected".into()));
                }
            }
        }
    }
}

/// In-process [`BusTransport`]. Clones share the same bus.
#[derive(Clone)]
pub struct LoopbackTransport {
    shared: Arc<Shared>,
}

impl LoopbackTransport {
    /// Creates a loopback bus with the given channel capacity.
    #[must_use]
    pub fn new(config: &LoopbackConfig) -> Self {
        let (sender, receiver) = bounded(config.capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                sender,
                receiver,
                live_names: Mutex::new(HashSet::new()),
                stats: Mutex::new(TransportStats::default()),
                bootstraps: AtomicU32::new(0),
                generation: AtomicU64::new(0),
                fail_next_provider: AtomicBool::new(false),
                fail_bootstrap: AtomicBool::new(false),
            }),
        }
    }

    /// Receiving end of the bus. Each message is delivered to one receiver.
    #[must_use]
    pub fn monitor(&self) -> Receiver<BusMessage> {
        self.shared.receiver.clone()
    }

    /// Drains every queued message.
    #[must_use]
    pub fn drain(&self) -> Vec<BusMessage> {
        self.shared.receiver.try_iter().collect()
    }

    /// How many times [`BusTransport::bootstrap`] ran.
    #[must_use]
    pub fn bootstrap_count(&self) -> u32 {
        self.shared.bootstraps.load(Ordering::Acquire)
    }

    /// Names currently reserved by open providers.
    #[must_use]
    pub fn live_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.live_names.lock().iter().cloned().collect();
        names.sort();
        names
    }

    /// Silently invalidates every open provider, as a dropped connection would.
    pub fn sever_connections(&self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Makes the next [`BusTransport::create_provider`] call fail.
    pub fn fail_next_provider(&self) {
        self.shared.fail_next_provider.store(true, Ordering::Release);
    }

    /// Makes [`BusTransport::bootstrap`] fail while set.
    pub fn set_fail_bootstrap(&self, fail: bool) {
        self.shared.fail_bootstrap.store(fail, Ordering::Release);
    }

    /// Snapshot of the statistics.
    #[must_use]
    pub fn stats(&self) -> TransportStats {
        *self.shared.stats.lock()
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new(&LoopbackConfig::default())
    }
}

impl BusTransport for LoopbackTransport {
    fn bootstrap(&self) -> BridgeResult<()> {
        if self.shared.fail_bootstrap.load(Ordering::Acquire) {
            return Err(BridgeError::SubsystemBootstrapFailure(
                "loopback bootstrap disabled".into(),
            ));
        }
        self.shared.bootstraps.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn create_provider(&self, name: &str) -> BridgeResult<Box<dyn BusProvider>> {
        if self.shared.fail_next_provider.swap(false, Ordering::AcqRel) {
            self.shared.stats.lock().provider_failures += 1;
            return Err(BridgeError::Transport("provider creation refused".into()));
        }
        {
            let mut live = self.shared.live_names.lock();
            if !live.insert(name.to_owned()) {
                self.shared.stats.lock().provider_failures += 1;
                return Err(BridgeError::Transport(format!(
                    "a provider named '{name}' is still live"
                )));
            }
        }
        self.shared.stats.lock().providers_created += 1;
        // Online notice is best effort; a full channel must not fail creation.
        let _ = self.shared.send(BusMessage::ProviderOnline {
            provider: name.to_owned(),
        });
        Ok(Box::new(LoopbackProvider {
            name: name.to_owned(),
            generation: self.shared.generation.load(Ordering::Acquire),
            shared: Arc::clone(&self.shared),
            open: true,
        }))
    }
}

struct LoopbackProvider {
    name: String,
    generation: u64,
    shared: Arc<Shared>,
    open: bool,
}

impl LoopbackProvider {
    fn ensure_valid(&self) -> BridgeResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(BridgeError::ProviderUnavailable)
        }
    }
}

impl BusProvider for LoopbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        self.open && self.generation == self.shared.generation.load(Ordering::Acquire)
    }

    fn push_static(
        &mut self,
        subject: &SubjectKey,
        kind: SubjectKind,
        schema: &[PropertyName],
    ) -> BridgeResult<()> {
        self.ensure_valid()?;
        self.shared.send(BusMessage::StaticData {
            subject: subject.clone(),
            kind,
            schema: schema.to_vec(),
        })
    }

    fn push_frame(&mut self, subject: &SubjectKey, frame: &FrameRef<'_>) -> BridgeResult<()> {
        self.ensure_valid()?;
        self.shared.send(BusMessage::FrameData {
            subject: subject.clone(),
            transform: frame.transform,
            values: frame.values.to_vec(),
            time: frame.time,
        })
    }

    fn remove_subject(&mut self, subject: &SubjectKey) -> BridgeResult<()> {
        self.ensure_valid()?;
        self.shared.send(BusMessage::SubjectRemoved {
            subject: subject.clone(),
        })
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.shared.live_names.lock().remove(&self.name);
        let _ = self.shared.send(BusMessage::ProviderOffline {
            provider: self.name.clone(),
        });
    }
}

impl Drop for LoopbackProvider {
    fn drop(&mut self) {
        self.close();
    }
}
