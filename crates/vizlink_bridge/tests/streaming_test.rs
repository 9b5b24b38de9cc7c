//! Integration tests for subject streaming: auto-registration, schema
//! enforcement, lenient removal and what the bus actually sees.

use std::sync::Arc;
use std::thread;

use vizlink_bridge::{
    Bridge, BridgeConfig, BusMessage, ConnectionStatus, LoopbackConfig, LoopbackTransport, SubjectKind,
};
use vizlink_shared::{Quaternion, Transform, Vec3};

fn active_bridge() -> (Bridge, LoopbackTransport) {
    let transport = LoopbackTransport::new(&LoopbackConfig { capacity: 1 << 16 });
    let bridge = Bridge::new(Arc::new(transport.clone()), BridgeConfig::without_cooldown());
    bridge.initialize("Sim").unwrap();
    let _ = transport.drain();
    (bridge, transport)
}

fn schema_of(bridge: &Bridge, name: &str) -> Vec<String> {
    bridge
        .subject(name)
        .unwrap()
        .schema
        .iter()
        .map(ToString::to_string)
        .collect()
}

// ============================================================================
// AUTO-REGISTRATION
// ============================================================================

#[test]
fn test_update_auto_registers_transform_subject() {
    let (bridge, _transport) = active_bridge();
    assert!(bridge.subject("A").is_none());

    bridge.update_transform("A", &Transform::IDENTITY);
    let record = bridge.subject("A").unwrap();
    assert_eq!(record.kind, SubjectKind::Transform);
    assert_eq!(record.property_count(), 0);
    assert!(record.registered_with_bus);
    assert_eq!(bridge.stats().auto_registrations, 1);
}

#[test]
fn test_update_with_properties_infers_schema() {
    let (bridge, _transport) = active_bridge();
    bridge.update_transform_with_properties("Forklift", &Transform::IDENTITY, &[1.0, 2.0]);
    assert_eq!(schema_of(&bridge, "Forklift"), vec!["Property0", "Property1"]);

    bridge.update_transform_with_properties("Forklift", &Transform::IDENTITY, &[1.0]);
    assert_eq!(bridge.stats().frames_dropped, 1);
}

#[test]
fn test_data_update_seeds_schema_from_names() {
    let (bridge, _transport) = active_bridge();
    bridge.update_data("Stats", &[12.0, 0.8], Some(&["Throughput", "Utilization"][..]));
    assert_eq!(schema_of(&bridge, "Stats"), vec!["Throughput", "Utilization"]);
    assert_eq!(bridge.subject("Stats").unwrap().kind, SubjectKind::Data);

    // Names on later updates do not change the schema.
    bridge.update_data("Stats", &[13.0, 0.7], Some(&["A", "B"][..]));
    assert_eq!(schema_of(&bridge, "Stats"), vec!["Throughput", "Utilization"]);
    assert_eq!(bridge.stats().frames_published, 2);
}

// ============================================================================
// SCHEMA ENFORCEMENT
// ============================================================================

#[test]
fn test_schema_mismatch_dropped_without_side_effects() {
    let (bridge, transport) = active_bridge();
    bridge.register_transform_with_properties("Forklift", &["Speed", "Load"]).unwrap();
    let before = bridge.subject("Forklift").unwrap();
    let _ = transport.drain();

    bridge.update_transform_with_properties("Forklift", &Transform::IDENTITY, &[1.0, 2.0, 3.0]);
    assert_eq!(bridge.subject("Forklift").unwrap(), before);
    assert!(transport.drain().is_empty());

    // Other subjects keep streaming.
    bridge.update_transform("Box1", &Transform::IDENTITY);
    assert_eq!(bridge.stats().frames_published, 1);
    assert_eq!(bridge.stats().frames_dropped, 1);
}

#[test]
fn test_invalid_registrations_rejected() {
    let (bridge, _transport) = active_bridge();
    assert!(bridge.register_transform("").is_err());
    assert!(bridge.register_data("Queue", &["Length", ""]).is_err());
    assert!(bridge.register_data("Queue", &["Length", "Length"]).is_err());
    assert_eq!(bridge.subject_count(), 0);
}

#[test]
fn test_non_finite_pose_dropped() {
    let (bridge, _transport) = active_bridge();
    let pose = Transform::from_position(Vec3::new(f64::INFINITY, 0.0, 0.0));
    bridge.update_transform("Box1", &pose);
    assert_eq!(bridge.subject_count(), 0);
    assert_eq!(bridge.stats().frames_dropped, 1);
}

#[test]
fn test_kind_is_fixed_at_registration() {
    let (bridge, _transport) = active_bridge();
    bridge.register_data("Queue", &["Length"]).unwrap();
    bridge.update_transform("Queue", &Transform::IDENTITY);
    assert_eq!(bridge.subject("Queue").unwrap().kind, SubjectKind::Data);
    assert_eq!(bridge.stats().frames_dropped, 1);
}

// ============================================================================
// REMOVAL
// ============================================================================

#[test]
fn test_remove_unknown_subject_is_noop() {
    let (bridge, transport) = active_bridge();
    assert!(bridge.remove_transform("never-registered").is_ok());
    assert!(bridge.remove_data("never-registered").is_ok());
    assert!(transport.drain().is_empty());
}

#[test]
fn test_remove_then_update_reregisters() {
    let (bridge, _transport) = active_bridge();
    bridge.register_transform_with_properties("Forklift", &["Speed"]).unwrap();
    bridge.remove_transform("Forklift").unwrap();
    assert_eq!(bridge.subject_count(), 0);

    bridge.update_transform("Forklift", &Transform::IDENTITY);
    assert_eq!(bridge.subject("Forklift").unwrap().property_count(), 0);
}

// ============================================================================
// BUS TRAFFIC
// ============================================================================

#[test]
fn test_bus_sees_static_once_then_frames() {
    let (bridge, transport) = active_bridge();
    let pose = Transform::new(
        Vec3::new(150.0, -20.0, 0.0),
        Quaternion::new(0.0, 0.0, 0.382_683_4, 0.923_879_5),
        Vec3::ONE,
    );
    bridge.update_transform_with_properties("Forklift", &pose, &[2.5]);
    bridge.update_transform_with_properties("Forklift", &pose, &[3.0]);

    let messages = transport.drain();
    assert_eq!(messages.len(), 3);
    assert!(matches!(&messages[0], BusMessage::StaticData { kind: SubjectKind::Transform, .. }));
    match &messages[2] {
        BusMessage::FrameData { subject, transform, values, .. } => {
            assert_eq!(subject.as_str(), "Forklift");
            let record = transform.unwrap();
            assert_eq!(record.location, [150.0, -20.0, 0.0]);
            assert_eq!(record.rotation, [0.0, 0.0, 0.382_683_4, 0.923_879_5]);
            assert_eq!(values, &vec![3.0]);
        }
        other => panic!("expected a frame, got {other:?}"),
    }
}

#[test]
fn test_shutdown_withdraws_subjects_before_going_offline() {
    let (bridge, transport) = active_bridge();
    bridge.register_transform("Box1").unwrap();
    bridge.register_data("Stats", &[]).unwrap();
    let _ = transport.drain();

    bridge.shutdown();
    let messages = transport.drain();
    assert_eq!(messages.len(), 3);
    assert!(messages[..2]
        .iter()
        .all(|m| matches!(m, BusMessage::SubjectRemoved { .. })));
    assert_eq!(messages[2], BusMessage::ProviderOffline { provider: "Sim".into() });
}

#[test]
fn test_unmonitored_default_bus_keeps_streaming() {
    let (bridge, transport) = Bridge::loopback(BridgeConfig::default());
    bridge.initialize("Sim").unwrap();

    for _ in 0..5_000 {
        bridge.update_transform("Box1", &Transform::IDENTITY);
    }
    let stats = bridge.stats();
    assert_eq!(stats.frames_published, 5_000);
    assert_eq!(stats.frames_dropped, 0);
    assert_eq!(bridge.connection_status(), ConnectionStatus::Connected);
    assert!(bridge.register_transform("Box2").is_ok());

    let capacity = LoopbackConfig::default().capacity;
    assert!(transport.stats().messages_dropped > 0);
    let messages = transport.drain();
    assert_eq!(messages.len(), capacity);
    assert!(matches!(messages.last(), Some(BusMessage::StaticData { .. })));
}

#[test]
fn test_updates_after_shutdown_are_dropped() {
    let (bridge, transport) = active_bridge();
    bridge.shutdown();
    let _ = transport.drain();

    for _ in 0..200 {
        bridge.update_transform("Box1", &Transform::IDENTITY);
    }
    assert_eq!(bridge.subject_count(), 0);
    assert_eq!(bridge.stats().frames_dropped, 200);
    assert!(transport.drain().is_empty());
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[test]
fn test_concurrent_updates_from_host_threads() {
    let (bridge, transport) = active_bridge();
    let bridge = Arc::new(bridge);
    let threads: u32 = 4;
    let frames: u32 = 1_000;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                let name = format!("Agent_{t}");
                for f in 0..frames {
                    let pose = Transform::from_position(Vec3::new(f64::from(f), 0.0, 0.0));
                    bridge.update_transform(&name, &pose);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = bridge.stats();
    assert_eq!(stats.frames_published, u64::from(threads * frames));
    assert_eq!(stats.auto_registrations, u64::from(threads));
    assert_eq!(bridge.subject_count(), 4);

    let frames_on_bus = transport
        .drain()
        .into_iter()
        .filter(|m| matches!(m, BusMessage::FrameData { .. }))
        .count();
    assert_eq!(frames_on_bus, (threads * frames) as usize);
}
