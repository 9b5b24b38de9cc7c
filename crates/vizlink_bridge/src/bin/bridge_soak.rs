//! # Bridge Soak Test
//!
//! Repeats Initialize → stream → Shutdown against the loopback bus and
//! checks that nothing leaks between sessions.
//!
//! ```bash
//! # 20 cycles, 100 subjects, 60 frames each
//! RUST_LOG=info cargo run --release --features soak --bin bridge_soak
//!
//! # cycles subjects frames [config.toml]
//! cargo run --release --features soak --bin bridge_soak -- 50 500 120 bridge.toml
//! ```

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;
use vizlink_bridge::{Bridge, BridgeConfig, BusMessage, ConnectionStatus, LoopbackConfig, LoopbackTransport};
use vizlink_shared::{Quaternion, Transform, Vec3};

/// Soak parameters from the command line.
struct SoakArgs {
    cycles: u32,
    subjects: u32,
    frames: u32,
    config: BridgeConfig,
}

fn parse_args() -> Result<SoakArgs, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let number = |i: usize, default: u32| -> Result<u32, String> {
        args.get(i)
            .map_or(Ok(default), |s| s.parse().map_err(|e| format!("argument {}: {e}", i + 1)))
    };
    let config = match args.get(3) {
        Some(path) => BridgeConfig::from_file(path).map_err(|e| e.to_string())?,
        None => BridgeConfig::default(),
    };
    Ok(SoakArgs {
        cycles: number(0, 20)?,
        subjects: number(1, 100)?,
        frames: number(2, 60)?,
        config,
    })
}

/// Pose of subject `i` at frame `f`: a slow circle in the XY plane.
fn pose(i: u32, f: u32) -> Transform {
    let angle = f64::from(f) * 0.05 + f64::from(i);
    let radius = 100.0 + f64::from(i % 10) * 50.0;
    let half = angle * 0.5;
    Transform::new(
        Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0),
        Quaternion::new(0.0, 0.0, half.sin(), half.cos()),
        Vec3::ONE,
    )
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("   ✗ {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                    VIZLINK BRIDGE SOAK");
    println!("═══════════════════════════════════════════════════════════════════");
    println!();
    println!("  Cycles:    {}", args.cycles);
    println!("  Subjects:  {}", args.subjects);
    println!("  Frames:    {}", args.frames);
    println!("  Cooldown:  {} ms", args.config.cooldown_ms);
    println!();

    let transport = LoopbackTransport::new(&LoopbackConfig { capacity: 65_536 });
    let bridge = Bridge::new(Arc::new(transport.clone()), args.config.clone());

    // === MONITOR ===
    let running = Arc::new(AtomicBool::new(true));
    let received = Arc::new(AtomicU64::new(0));
    let monitor = {
        let receiver = transport.monitor();
        let running = Arc::clone(&running);
        let received = Arc::clone(&received);
        thread::spawn(move || {
            while running.load(Ordering::Acquire) {
                if let Ok(message) = receiver.recv_timeout(Duration::from_millis(20)) {
                    if matches!(message, BusMessage::FrameData { .. }) {
                        received.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        })
    };

    let names: Vec<String> = (0..args.subjects).map(|i| format!("Subject_{i:04}")).collect();
    let props = [2.5_f32, 0.75];
    let mut failures = 0u32;
    let soak_start = Instant::now();

    for cycle in 0..args.cycles {
        let init_start = Instant::now();
        if let Err(e) = bridge.initialize("Soak") {
            eprintln!("   ✗ cycle {cycle}: initialize failed: {e} (code {})", e.code());
            failures += 1;
            continue;
        }
        let init_ms = init_start.elapsed().as_secs_f64() * 1000.0;

        let stream_start = Instant::now();
        for (i, name) in (0u32..).zip(&names) {
            if i % 2 == 0 {
                let _ = bridge.register_transform_with_properties(name, &["Speed", "Load"]);
            }
        }
        for f in 0..args.frames {
            for (i, name) in (0u32..).zip(&names) {
                if i % 2 == 0 {
                    bridge.update_transform_with_properties(name, &pose(i, f), &props);
                } else {
                    bridge.update_transform(name, &pose(i, f));
                }
            }
        }
        let stream_ms = stream_start.elapsed().as_secs_f64() * 1000.0;

        if bridge.connection_status() != ConnectionStatus::Connected {
            eprintln!("   ✗ cycle {cycle}: not connected after streaming");
            failures += 1;
        }
        let live = bridge.stats();
        bridge.shutdown();
        if bridge.subject_count() != 0 || bridge.cached_name_count() != 0 {
            eprintln!("   ✗ cycle {cycle}: state survived shutdown");
            failures += 1;
        }

        println!(
            "   ✓ cycle {cycle:>3}: init {init_ms:>7.2} ms | {} transform / {} data subjects | stream {stream_ms:>8.2} ms",
            live.transform_subjects, live.data_subjects
        );
    }

    // Let the monitor catch up before stopping it.
    thread::sleep(Duration::from_millis(100));
    running.store(false, Ordering::Release);
    if monitor.join().is_err() {
        eprintln!("   ✗ monitor thread panicked");
        failures += 1;
    }

    let stats = bridge.stats();
    let bus = transport.stats();
    println!();
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  Elapsed:            {:.2} s", soak_start.elapsed().as_secs_f64());
    println!("  Sessions:           {}", stats.sessions_started);
    println!("  Bootstraps:         {}", stats.bootstraps);
    println!("  Frames published:   {}", stats.frames_published);
    println!("  Frames dropped:     {}", stats.frames_dropped);
    println!("  Auto-registrations: {}", stats.auto_registrations);
    println!("  Frames received:    {}", received.load(Ordering::Relaxed));
    println!("  Bus drops:          {}", bus.messages_dropped);
    let lookups = stats.name_cache_hits + stats.name_cache_misses;
    if lookups > 0 {
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = stats.name_cache_hits as f64 / lookups as f64 * 100.0;
        println!(
            "  Name cache:         {} hits / {} misses ({hit_rate:.1}%)",
            stats.name_cache_hits, stats.name_cache_misses
        );
    }
    println!("═══════════════════════════════════════════════════════════════════");

    if stats.bootstraps > 1 || transport.bootstrap_count() > 1 {
        eprintln!("   ✗ subsystem bootstrapped {} times", stats.bootstraps);
        failures += 1;
    }
    if failures == 0 {
        println!("   ✓ SOAK PASSED");
        ExitCode::SUCCESS
    } else {
        println!("   ✗ SOAK FAILED ({failures} failures)");
        ExitCode::FAILURE
    }
}
