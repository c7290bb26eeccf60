//! Scenario tests against in-process echo servers.
//!
//! Each helper spawns a small tokio server on an ephemeral port:
//! - a correct echo server,
//! - a truncating server that stops echoing after a byte budget,
//! - a corrupting server that flips every echoed byte,
//! - a misattributing server that answers with another connection's
//!   payload.
//!
//! The scenarios must pass against the correct server and report
//! failures (as values, not panics) against the broken ones.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use echoprobe::common::HarnessError;
use echoprobe::net::{Conn, Limits};
use echoprobe::payload;
use echoprobe::scenario::lifecycle::LifecycleScenario;
use echoprobe::scenario::many_conn::ManyConnectionScenario;
use echoprobe::scenario::{oracle, run_trials};

async fn spawn_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let (mut r, mut w) = socket.split();
                let _ = tokio::io::copy(&mut r, &mut w).await;
            });
        }
    });
    addr
}

/// Echoes at most `limit` bytes per connection, then closes.
async fn spawn_truncating_server(limit: usize) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut remaining = limit;
                let mut buf = [0u8; 4096];
                loop {
                    let n = match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    let take = n.min(remaining);
                    if socket.write_all(&buf[..take]).await.is_err() {
                        break;
                    }
                    remaining -= take;
                    if remaining == 0 {
                        break;
                    }
                }
            });
        }
    });
    addr
}

/// Echoes every byte bit-flipped, simulating cross-connection data
/// corruption from the verifier's point of view.
async fn spawn_corrupting_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    let n = match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    for b in &mut buf[..n] {
                        *b = !*b;
                    }
                    if socket.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    addr
}

/// Answers each connection with the payload of the connection accepted
/// before it (the first gets its own back), then closes. Models a
/// server that addresses connections by mutable list position.
async fn spawn_misattributing_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let payloads: Arc<Mutex<Vec<Option<Vec<u8>>>>> = Arc::new(Mutex::new(Vec::new()));
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let ordinal = {
                let mut slots = payloads.lock().unwrap();
                slots.push(None);
                slots.len() - 1
            };
            let payloads = payloads.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let n = match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                payloads.lock().unwrap()[ordinal] = Some(buf[..n].to_vec());
                let source = ordinal.saturating_sub(1);
                let reply = loop {
                    let stored = payloads.lock().unwrap()[source].clone();
                    if let Some(p) = stored {
                        break p;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                };
                let _ = socket.write_all(&reply).await;
            });
        }
    });
    addr
}

#[tokio::test]
async fn test_oracle_round_trip_on_fresh_connections() {
    let addr = spawn_echo_server().await;
    let mut rng = StdRng::seed_from_u64(11);

    // Two independent exchanges must both pass (idempotence across
    // fresh connections).
    for _ in 0..2 {
        let mut conn = Conn::connect("127.0.0.1", addr.port(), Limits::default())
            .await
            .unwrap();
        let data = payload::generate(&mut rng, 4096);
        let out = oracle::full_exchange(&mut conn, &data).await;
        assert!(out.passed, "expected clean round trip: {:?}", out.detail);
        assert_eq!(out.bytes_observed, 4096);
    }
}

#[tokio::test]
async fn test_oracle_handles_empty_payload() {
    let addr = spawn_echo_server().await;
    let mut conn = Conn::connect("127.0.0.1", addr.port(), Limits::default())
        .await
        .unwrap();
    let out = oracle::full_exchange(&mut conn, b"").await;
    assert!(out.passed);
    assert_eq!(out.bytes_observed, 0);
}

#[tokio::test]
async fn test_oracle_fails_cleanly_on_truncation() {
    let addr = spawn_truncating_server(500).await;
    let mut rng = StdRng::seed_from_u64(12);
    let mut conn = Conn::connect("127.0.0.1", addr.port(), Limits::default())
        .await
        .unwrap();
    let data = payload::generate(&mut rng, 1000);
    let out = oracle::full_exchange(&mut conn, &data).await;
    assert!(!out.passed);
    assert_eq!(out.bytes_expected, 1000);
    assert!(out.bytes_observed < 1000);
}

#[tokio::test]
async fn test_lifecycle_preserves_subsequent_connections() {
    let addr = spawn_echo_server().await;
    let mut master = StdRng::seed_from_u64(21);

    let summary = run_trials(20, true, |_| {
        let rng = StdRng::seed_from_u64(master.gen());
        LifecycleScenario::new("127.0.0.1", addr.port(), 1000, Limits::default(), rng).run()
    })
    .await
    .unwrap();

    assert_eq!(summary.trials, 20);
    assert!(summary.all_passed(), "{}", summary);
}

#[tokio::test]
async fn test_many_connections_random_close_order() {
    let addr = spawn_echo_server().await;

    // Several seeds exercise different close-order permutations.
    for seed in [1u64, 2, 3] {
        let rng = StdRng::seed_from_u64(seed);
        let out = ManyConnectionScenario::new("127.0.0.1", addr.port(), 5, Limits::default(), rng)
            .run()
            .await
            .unwrap();
        assert!(out.passed, "seed {}: {:?}", seed, out.detail);
    }
}

/// The scenario draws from its RNG only for the close-order shuffle,
/// so the same seed replays the permutation a scenario used.
fn close_order_for(seed: u64, connections: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..connections).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    order
}

#[tokio::test]
async fn test_many_connections_detects_cross_connection_corruption() {
    let addr = spawn_corrupting_server().await;
    let rng = StdRng::seed_from_u64(5);
    let out = ManyConnectionScenario::new("127.0.0.1", addr.port(), 5, Limits::default(), rng)
        .run()
        .await
        .unwrap();
    assert!(!out.passed);

    // Every connection is corrupted, so the very first close must be
    // the one reported.
    let first_closed = close_order_for(5, 5)[0];
    let detail = out.detail.unwrap();
    assert!(
        detail.starts_with(&format!("connection {}:", first_closed)),
        "detail: {}",
        detail
    );
}

#[tokio::test]
async fn test_many_connections_flags_misattributed_identity() {
    let addr = spawn_misattributing_server().await;
    let seed = 7u64;
    let out = ManyConnectionScenario::new(
        "127.0.0.1",
        addr.port(),
        5,
        Limits::default(),
        StdRng::seed_from_u64(seed),
    )
    .run()
    .await
    .unwrap();
    assert!(!out.passed);

    // Connection 0 is the only one answered with its own token; the
    // first other index closed is where the swap must be reported.
    let expected = *close_order_for(seed, 5)
        .iter()
        .find(|&&i| i != 0)
        .unwrap();
    let detail = out.detail.unwrap();
    assert!(
        detail.starts_with(&format!("connection {}:", expected)),
        "detail: {}",
        detail
    );
}

#[tokio::test]
async fn test_many_connections_rejects_zero_connections() {
    let rng = StdRng::seed_from_u64(5);
    // Contract violation must fail fast before any network I/O; the
    // port below is never contacted.
    let res = ManyConnectionScenario::new("127.0.0.1", 1, 0, Limits::default(), rng)
        .run()
        .await;
    assert!(matches!(res, Err(HarnessError::InvalidParameter(_))));
}

#[tokio::test]
async fn test_end_to_end_fifty_trials_all_pass() {
    let addr = spawn_echo_server().await;
    let mut master = StdRng::seed_from_u64(99);

    let summary = run_trials(50, true, |_| {
        let rng = StdRng::seed_from_u64(master.gen());
        LifecycleScenario::new("127.0.0.1", addr.port(), 1000, Limits::default(), rng).run()
    })
    .await
    .unwrap();

    assert_eq!(summary.trials, 50);
    assert_eq!(summary.passed, 50);
    assert_eq!(summary.first_failure, None);
}

#[tokio::test]
async fn test_end_to_end_truncating_server_fails_at_index_zero() {
    let addr = spawn_truncating_server(500).await;
    let mut master = StdRng::seed_from_u64(99);

    let summary = run_trials(50, true, |_| {
        let rng = StdRng::seed_from_u64(master.gen());
        LifecycleScenario::new("127.0.0.1", addr.port(), 1000, Limits::default(), rng).run()
    })
    .await
    .unwrap();

    // Stop-on-first-failure: only the first trial runs and it fails.
    assert_eq!(summary.trials, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.first_failure, Some(0));
}
