//! Integration tests for the session lifecycle: bootstrap once, repeatable
//! init/shutdown, the provider cooldown and connection recovery.
//!
//! Run with: cargo test --test lifecycle_test -- --nocapture

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use vizlink_bridge::{
    Bridge, BridgeConfig, ConnectionStatus, InitError, LoopbackConfig, LoopbackTransport, SessionState,
    SubsystemState,
};
use vizlink_shared::{Transform, RESULT_PROVIDER_FAILURE};

fn bridge_with(config: BridgeConfig) -> (Bridge, LoopbackTransport) {
    let transport = LoopbackTransport::new(&LoopbackConfig { capacity: 1 << 16 });
    (Bridge::new(Arc::new(transport.clone()), config), transport)
}

// ============================================================================
// BOOTSTRAP & REPEATED SESSIONS
// ============================================================================

#[test]
fn test_fifty_cycles_bootstrap_once() {
    let (bridge, transport) = bridge_with(BridgeConfig::without_cooldown());

    for cycle in 0..50 {
        bridge.initialize("Sim").unwrap();
        assert_eq!(bridge.session_state(), SessionState::SessionActive, "cycle {cycle}");
        bridge.register_transform("Box1").unwrap();
        bridge.update_transform("Box1", &Transform::IDENTITY);
        bridge.shutdown();
        assert_eq!(bridge.subject_count(), 0, "cycle {cycle}");
        assert_eq!(bridge.session_state(), SessionState::SessionTornDown);
        assert_eq!(bridge.subsystem_state(), SubsystemState::Ready);
    }

    assert_eq!(transport.bootstrap_count(), 1);
    assert_eq!(bridge.stats().sessions_started, 50);
    assert!(transport.live_providers().is_empty());
}

#[test]
fn test_shutdown_before_initialize_is_noop() {
    let (bridge, transport) = bridge_with(BridgeConfig::default());
    bridge.shutdown();
    bridge.shutdown();
    assert_eq!(bridge.session_state(), SessionState::NeverInitialized);
    assert_eq!(bridge.connection_status(), ConnectionStatus::NotInitialized);
    assert_eq!(transport.bootstrap_count(), 0);
}

#[test]
fn test_concrete_scenario() {
    let (bridge, _transport) = bridge_with(BridgeConfig::default());

    bridge.initialize("Sim").unwrap();
    bridge.register_transform("Box1").unwrap();
    bridge.update_transform("Box1", &Transform::IDENTITY);
    assert_eq!(bridge.connection_status(), ConnectionStatus::Connected);
    bridge.remove_transform("Box1").unwrap();
    assert_eq!(bridge.subject_count(), 0);
    bridge.shutdown();
    assert_eq!(bridge.connection_status(), ConnectionStatus::NotInitialized);
}

#[test]
fn test_double_initialize_without_shutdown() {
    let (bridge, transport) = bridge_with(BridgeConfig::default());
    bridge.initialize("Sim").unwrap();

    let start = Instant::now();
    bridge.initialize("Sim").unwrap();
    assert!(start.elapsed() < Duration::from_millis(100));
    assert_eq!(transport.live_providers(), vec!["Sim".to_string()]);
}

// ============================================================================
// COOLDOWN
// ============================================================================

#[test]
fn test_immediate_reinitialize_waits_out_cooldown() {
    let (bridge, _transport) = bridge_with(BridgeConfig::default());
    bridge.initialize("Sim").unwrap();
    bridge.shutdown();

    let start = Instant::now();
    bridge.initialize("Sim").unwrap();
    let elapsed = start.elapsed();
    println!("re-initialize after immediate shutdown: {elapsed:?}");
    assert!(elapsed >= Duration::from_millis(450), "returned after {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(650), "returned after {elapsed:?}");
}

#[test]
fn test_spaced_reinitialize_does_not_wait() {
    let (bridge, _transport) = bridge_with(BridgeConfig::default());
    bridge.initialize("Sim").unwrap();
    bridge.shutdown();
    thread::sleep(Duration::from_millis(600));

    let start = Instant::now();
    bridge.initialize("Sim").unwrap();
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn test_cooldown_wait_does_not_hold_the_lock() {
    let (bridge, _transport) = bridge_with(BridgeConfig::default());
    let bridge = Arc::new(bridge);
    bridge.initialize("Sim").unwrap();
    bridge.shutdown();

    let initializer = {
        let bridge = Arc::clone(&bridge);
        thread::spawn(move || bridge.initialize("Sim"))
    };
    thread::sleep(Duration::from_millis(50));

    let start = Instant::now();
    let status = bridge.connection_status();
    let waited = start.elapsed();
    assert!(waited < Duration::from_millis(200), "status check blocked for {waited:?}");
    assert_eq!(status, ConnectionStatus::NotInitialized);

    initializer.join().unwrap().unwrap();
    assert_eq!(bridge.connection_status(), ConnectionStatus::Connected);
}

// ============================================================================
// FAILURES & RECOVERY
// ============================================================================

#[test]
fn test_provider_creation_failure() {
    let (bridge, transport) = bridge_with(BridgeConfig::without_cooldown());
    transport.fail_next_provider();

    let err = bridge.initialize("Sim").unwrap_err();
    assert!(matches!(err, InitError::ProviderCreationFailed(_)));
    assert_eq!(err.code(), RESULT_PROVIDER_FAILURE);
    assert_eq!(bridge.session_state(), SessionState::SubsystemReady);
    assert_eq!(bridge.connection_status(), ConnectionStatus::NotInitialized);

    bridge.initialize("Sim").unwrap();
    assert_eq!(transport.bootstrap_count(), 1);
}

#[test]
fn test_bootstrap_failure_reported() {
    let (bridge, transport) = bridge_with(BridgeConfig::without_cooldown());
    transport.set_fail_bootstrap(true);

    let err = bridge.initialize("Sim").unwrap_err();
    assert!(matches!(err, InitError::SubsystemBootstrapFailed(_)));
    assert_eq!(err.code(), -1);
    assert_eq!(bridge.subsystem_state(), SubsystemState::Unloaded);
}

#[test]
fn test_dropped_connection_recovers_and_streams() {
    let (bridge, transport) = bridge_with(BridgeConfig::default());
    bridge.initialize("Sim").unwrap();
    bridge.register_transform("Box1").unwrap();

    transport.sever_connections();
    bridge.update_transform("Box1", &Transform::IDENTITY);
    assert_eq!(bridge.stats().frames_dropped, 1);

    assert_eq!(bridge.connection_status(), ConnectionStatus::Connected);
    bridge.update_transform("Box1", &Transform::IDENTITY);
    let stats = bridge.stats();
    assert_eq!(stats.recoveries, 1);
    assert_eq!(stats.frames_published, 1);
    assert_eq!(bridge.subject_count(), 1);
}

#[test]
fn test_failed_recovery_reports_not_connected() {
    let (bridge, transport) = bridge_with(BridgeConfig::default());
    bridge.initialize("Sim").unwrap();
    transport.sever_connections();
    transport.fail_next_provider();

    assert_eq!(bridge.connection_status(), ConnectionStatus::NotConnected);
    assert_eq!(bridge.connection_status(), ConnectionStatus::Connected);
}

#[test]
fn test_shutdown_after_dropped_connection() {
    let (bridge, transport) = bridge_with(BridgeConfig::without_cooldown());
    bridge.initialize("Sim").unwrap();
    bridge.register_transform("Box1").unwrap();
    transport.sever_connections();

    bridge.shutdown();
    assert_eq!(bridge.subject_count(), 0);
    assert!(transport.live_providers().is_empty());
    bridge.initialize("Sim").unwrap();
    assert_eq!(bridge.connection_status(), ConnectionStatus::Connected);
}
