//! Relay Flow Test - Registration dan Forwarding end-to-end
//!
//! Router diuji dengan transport rekaman, lalu relay dan session diuji
//! dengan Unix datagram socket sungguhan di temporary directory.
//! Semua berjalan di satu thread; setiap `turn()` adalah satu blocking wait.
//!
//! Usage:
//!   cargo test --test relay_flow_test -- --nocapture

#![cfg(unix)]

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use watchrelay::config::{RelayConfig, SessionConfig};
use watchrelay::core::{Dispatch, Router, Transport};
use watchrelay::network::{Endpoint, Flow, RelayServer, Session, SessionError, SessionState};
use watchrelay::protocol::{
    decode, encode, Message, Origin, Payload, ResourceInfo, ResourceKind, ServiceRole,
    MESSAGE_SIZE,
};
use watchrelay::watcher::{ProbeError, ReportWatcher, ResourceProbe, ResourceWatcher};

const TICK: Duration = Duration::from_millis(50);

/// Transport yang merekam setiap datagram keluar
#[derive(Default)]
struct RecordingTransport {
    sent: Vec<(u32, Vec<u8>)>,
    gone: HashSet<u32>,
}

impl Transport for RecordingTransport {
    fn send_to(&mut self, pid: u32, datagram: &[u8]) -> io::Result<()> {
        if self.gone.contains(&pid) {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }
        self.sent.push((pid, datagram.to_vec()));
        Ok(())
    }
}

struct FixedProbe(ResourceInfo);

impl ResourceProbe for FixedProbe {
    fn measure_disk(&self) -> Result<ResourceInfo, ProbeError> {
        Ok(self.0)
    }

    fn measure_memory(&self) -> Result<ResourceInfo, ProbeError> {
        Ok(self.0)
    }
}

fn always_live(_: u32) -> bool {
    true
}

fn relay_config(dir: &Path) -> RelayConfig {
    RelayConfig::default()
        .with_socket_dir(dir)
        .with_poll_timeout(TICK)
        .with_stats_interval(Duration::ZERO)
}

fn session_config(dir: &Path) -> SessionConfig {
    SessionConfig::default()
        .with_socket_dir(dir)
        .with_wait_timeout(TICK)
        .with_query_interval(Duration::from_secs(60))
}

/// Jalankan relay sampai ada datagram yang diproses
fn pump<L: watchrelay::core::Liveness>(relay: &mut RelayServer<L>) -> usize {
    for _ in 0..20 {
        let n = relay.turn().unwrap();
        if n > 0 {
            return n;
        }
    }
    0
}

fn raw_sender(dir: &Path) -> Endpoint {
    Endpoint::bind(&dir.join("raw.sock")).unwrap()
}

fn send_raw(ep: &Endpoint, dir: &Path, msg: &Message) {
    ep.send_to(&encode(msg), &dir.join("relay.sock")).unwrap();
}

#[test]
fn test_router_disk_scenario() {
    let mut router = Router::new(always_live);
    let mut transport = RecordingTransport::default();

    let rw = Message::announcement(ServiceRole::ResourceProvider, 500, "127.0.0.1");
    let dw = Message::announcement(ServiceRole::DiskQueryClient, 200, "127.0.0.1");
    router.dispatch(&encode(&rw), &mut transport);
    router.dispatch(&encode(&dw), &mut transport);
    assert!(transport.sent.is_empty());

    let query =
        Message::query(Origin::Role(ServiceRole::DiskQueryClient), ResourceKind::Disk).unwrap();
    router.dispatch(&encode(&query), &mut transport);

    assert_eq!(transport.sent.len(), 1);
    let (dst, bytes) = &transport.sent[0];
    assert_eq!(*dst, 500);
    assert_eq!(bytes.len(), MESSAGE_SIZE);
    let forwarded = decode(bytes).unwrap();
    assert_eq!(forwarded.origin, Origin::Relay);
    assert_eq!(forwarded.payload, Payload::Disk(ResourceInfo::default()));

    let reply = Message::new(
        Origin::Role(ServiceRole::ResourceProvider),
        Payload::Disk(ResourceInfo::new(1_000_000, 400_000)),
    );
    router.dispatch(&encode(&reply), &mut transport);

    assert_eq!(transport.sent.len(), 2);
    let (dst, bytes) = &transport.sent[1];
    assert_eq!(*dst, 200);
    let delivered = decode(bytes).unwrap();
    assert_eq!(delivered.origin, Origin::Relay);
    assert_eq!(delivered.flags, 0);
    assert_eq!(
        delivered.payload,
        Payload::Disk(ResourceInfo::new(1_000_000, 400_000))
    );
}

#[test]
fn test_router_memory_report_scenario() {
    let mut router = Router::new(always_live);
    let mut transport = RecordingTransport::default();

    let report = Message::new(
        Origin::Role(ServiceRole::ResourceProvider),
        Payload::Memory(ResourceInfo::new(8, 3)),
    );

    // No memory watcher yet: dropped, nothing sent
    assert!(matches!(
        router.dispatch(&encode(&report), &mut transport),
        Dispatch::NoDestination(ServiceRole::MemoryQueryClient)
    ));
    assert!(transport.sent.is_empty());

    router.dispatch(
        &encode(&Message::announcement(ServiceRole::MemoryQueryClient, 300, "127.0.0.1")),
        &mut transport,
    );
    router.dispatch(&encode(&report), &mut transport);

    assert_eq!(transport.sent.len(), 1);
    let (dst, bytes) = &transport.sent[0];
    assert_eq!(*dst, 300);
    let delivered = decode(bytes).unwrap();
    assert_eq!(delivered.origin, Origin::Relay);
    assert_eq!(delivered.flags, 0);
    assert_eq!(delivered.payload, Payload::Memory(ResourceInfo::new(8, 3)));
}

#[test]
fn test_router_send_failure_evicts() {
    let mut router = Router::new(always_live);
    let mut transport = RecordingTransport::default();
    transport.gone.insert(200);

    router.dispatch(
        &encode(&Message::announcement(ServiceRole::DiskQueryClient, 200, "h")),
        &mut transport,
    );
    let reply = Message::new(
        Origin::Role(ServiceRole::ResourceProvider),
        Payload::Disk(ResourceInfo::new(1, 1)),
    );
    let outcome = router.dispatch(&encode(&reply), &mut transport);

    assert!(matches!(
        outcome,
        Dispatch::SendFailed {
            role: ServiceRole::DiskQueryClient,
            pid: 200,
            ..
        }
    ));
    assert_eq!(router.registry().peek(ServiceRole::DiskQueryClient), None);

    // Process 200 still "exists" per liveness, but the slot is free again
    let again = router.dispatch(
        &encode(&Message::announcement(ServiceRole::DiskQueryClient, 201, "h")),
        &mut transport,
    );
    assert!(matches!(
        again,
        Dispatch::Registered { accepted: true, pid: 201, .. }
    ));
}

#[test]
fn test_router_rejects_malformed() {
    let mut router = Router::new(always_live);
    let mut transport = RecordingTransport::default();

    let mut bad = encode(&Message::announcement(ServiceRole::ResourceProvider, 1, "h"));
    bad[0..4].copy_from_slice(&0x1234_5678u32.to_le_bytes());

    assert!(matches!(
        router.dispatch(&bad, &mut transport),
        Dispatch::Rejected(_)
    ));
    assert!(matches!(
        router.dispatch(&[0u8; 12], &mut transport),
        Dispatch::Rejected(_)
    ));
    assert_eq!(router.registry().peek(ServiceRole::ResourceProvider), None);
    assert!(transport.sent.is_empty());
}

#[test]
fn test_end_to_end_disk_query_over_sockets() {
    let dir = tempfile::tempdir().unwrap();
    let mut relay = RelayServer::with_liveness(relay_config(dir.path()), always_live).unwrap();

    let mut provider = Session::connect_as(session_config(dir.path()), 500).unwrap();
    let mut rw = ResourceWatcher::new(FixedProbe(ResourceInfo::new(1_000_000, 400_000)));
    provider.announce(&rw).unwrap();
    assert_eq!(provider.state(), SessionState::EventLoop);
    assert_eq!(pump(&mut relay), 1);
    assert_eq!(
        relay.router().registry().peek(ServiceRole::ResourceProvider),
        Some(500)
    );

    let mut reports = Vec::new();
    let mut client = Session::connect_as(session_config(dir.path()), 200).unwrap();
    let mut dw = ReportWatcher::disk(|kind: ResourceKind, info: ResourceInfo| {
        reports.push((kind, info))
    });
    client.announce(&dw).unwrap();
    assert_eq!(pump(&mut relay), 1);

    // First turn fires the query immediately
    client.turn(&mut dw).unwrap();
    assert_eq!(pump(&mut relay), 1);
    assert_eq!(relay.stats().forwarded, 1);

    // Provider answers through the relay
    provider.turn(&mut rw).unwrap();
    assert_eq!(rw.answered(), 1);
    assert_eq!(pump(&mut relay), 1);
    assert_eq!(relay.stats().forwarded, 2);

    client.turn(&mut dw).unwrap();
    assert_eq!(dw.last_report(), Some(ResourceInfo::new(1_000_000, 400_000)));
    drop(dw);
    assert_eq!(
        reports,
        vec![(ResourceKind::Disk, ResourceInfo::new(1_000_000, 400_000))]
    );
}

#[test]
fn test_query_without_provider_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let mut relay = RelayServer::with_liveness(relay_config(dir.path()), always_live).unwrap();
    let raw = raw_sender(dir.path());

    send_raw(
        &raw,
        dir.path(),
        &Message::announcement(ServiceRole::DiskQueryClient, 200, "127.0.0.1"),
    );
    send_raw(
        &raw,
        dir.path(),
        &Message::query(Origin::Role(ServiceRole::DiskQueryClient), ResourceKind::Disk).unwrap(),
    );
    while relay.stats().received < 2 {
        assert!(pump(&mut relay) > 0);
    }

    let stats = relay.stats();
    assert_eq!(stats.no_destination, 1);
    assert_eq!(stats.forwarded, 0);
    assert_eq!(relay.router().registry().peek(ServiceRole::DiskQueryClient), Some(200));
    assert_eq!(relay.router().registry().peek(ServiceRole::ResourceProvider), None);
}

#[test]
fn test_vanished_client_is_evicted() {
    let dir = tempfile::tempdir().unwrap();
    let mut relay = RelayServer::with_liveness(relay_config(dir.path()), always_live).unwrap();
    let raw = raw_sender(dir.path());

    // Nobody is bound at 200.sock, so delivery fails
    send_raw(
        &raw,
        dir.path(),
        &Message::announcement(ServiceRole::DiskQueryClient, 200, "127.0.0.1"),
    );
    pump(&mut relay);
    send_raw(
        &raw,
        dir.path(),
        &Message::new(
            Origin::Role(ServiceRole::ResourceProvider),
            Payload::Disk(ResourceInfo::new(10, 5)),
        ),
    );
    pump(&mut relay);

    assert_eq!(relay.stats().send_failures, 1);
    assert_eq!(relay.router().registry().peek(ServiceRole::DiskQueryClient), None);

    send_raw(
        &raw,
        dir.path(),
        &Message::announcement(ServiceRole::DiskQueryClient, 201, "127.0.0.1"),
    );
    pump(&mut relay);
    assert_eq!(relay.router().registry().peek(ServiceRole::DiskQueryClient), Some(201));
}

#[test]
fn test_second_live_announcement_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    // Real process table: our own pid is live
    let mut relay = RelayServer::bind(relay_config(dir.path())).unwrap();
    let raw = raw_sender(dir.path());
    let me = std::process::id();

    send_raw(
        &raw,
        dir.path(),
        &Message::announcement(ServiceRole::MemoryQueryClient, me, "127.0.0.1"),
    );
    pump(&mut relay);
    send_raw(
        &raw,
        dir.path(),
        &Message::announcement(ServiceRole::MemoryQueryClient, me + 1, "127.0.0.1"),
    );
    pump(&mut relay);

    assert_eq!(relay.stats().registered, 1);
    assert_eq!(relay.stats().registrations_ignored, 1);
    assert_eq!(
        relay.router().registry().peek(ServiceRole::MemoryQueryClient),
        Some(me)
    );
}

#[test]
fn test_relay_drops_wrong_size_datagrams() {
    let dir = tempfile::tempdir().unwrap();
    let mut relay = RelayServer::with_liveness(relay_config(dir.path()), always_live).unwrap();
    let raw = raw_sender(dir.path());
    let relay_path = dir.path().join("relay.sock");

    raw.send_to(&[0xA5u8; MESSAGE_SIZE - 1], &relay_path).unwrap();
    raw.send_to(&[0u8; MESSAGE_SIZE + 1], &relay_path).unwrap();
    while relay.stats().received < 2 {
        assert!(pump(&mut relay) > 0);
    }

    assert_eq!(relay.stats().malformed, 2);
    for role in ServiceRole::ALL {
        assert_eq!(relay.router().registry().peek(role), None);
    }
}

#[test]
fn test_session_skips_bad_datagrams() {
    let dir = tempfile::tempdir().unwrap();
    let _relay = RelayServer::with_liveness(relay_config(dir.path()), always_live).unwrap();

    let mut session = Session::connect_as(session_config(dir.path()), 300).unwrap();
    let mut mw = ReportWatcher::memory(|_: ResourceKind, _: ResourceInfo| {});
    session.announce(&mw).unwrap();

    let raw = raw_sender(dir.path());
    let me = dir.path().join("300.sock");
    // Wrong size, then a report not stamped by the relay, then a real one
    raw.send_to(&[1u8; 3], &me).unwrap();
    let forged = Message::new(
        Origin::Role(ServiceRole::ResourceProvider),
        Payload::Memory(ResourceInfo::new(7, 7)),
    );
    raw.send_to(&encode(&forged), &me).unwrap();
    let real = Message::new(Origin::Relay, Payload::Memory(ResourceInfo::new(8, 3)));
    raw.send_to(&encode(&real), &me).unwrap();

    session.turn(&mut mw).unwrap();
    assert_eq!(mw.reports(), 1);
    assert_eq!(mw.last_report(), Some(ResourceInfo::new(8, 3)));
}

#[test]
fn test_announce_fails_without_relay() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::connect_as(session_config(dir.path()), 400).unwrap();
    let rw = ResourceWatcher::new(FixedProbe(ResourceInfo::default()));

    let err = session.announce(&rw).unwrap_err();
    assert!(matches!(err, SessionError::Announce(_)));
    assert_eq!(session.state(), SessionState::Announcing);
}

#[test]
fn test_session_endpoint_removed_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("600.sock");
    {
        let session = Session::connect_as(session_config(dir.path()), 600).unwrap();
        assert_eq!(session.process_id(), 600);
        assert!(path.exists());
    }
    assert!(!path.exists());
}

/// Kumpulkan semua datagram yang menunggu di endpoint
fn collect(ep: &Endpoint) -> Vec<Message> {
    let mut buf = [0u8; 64];
    let mut out = Vec::new();
    while let Some(n) = ep.recv(&mut buf).unwrap() {
        out.push(decode(&buf[..n]).unwrap());
    }
    out
}

#[test]
fn test_query_timer_rearms_every_interval() {
    let dir = tempfile::tempdir().unwrap();
    let relay = Endpoint::bind(&dir.path().join("relay.sock")).unwrap();

    let config = session_config(dir.path()).with_query_interval(Duration::from_millis(100));
    let mut session = Session::connect_as(config, 200).unwrap();
    let mut dw = ReportWatcher::disk(|_: ResourceKind, _: ResourceInfo| {});
    session.announce(&dw).unwrap();

    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(350) {
        assert_eq!(session.turn(&mut dw).unwrap(), Flow::Continue);
    }

    let seen = collect(&relay);
    assert_eq!(seen[0].resource_kind(), ResourceKind::ServiceAnnouncement);
    let queries = &seen[1..];
    // Immediate query plus one per elapsed interval
    assert!(
        (3..=4).contains(&queries.len()),
        "unexpected query count {}",
        queries.len()
    );
    for query in queries {
        assert_eq!(query.origin, Origin::Role(ServiceRole::DiskQueryClient));
        assert_eq!(query.payload, Payload::Disk(ResourceInfo::default()));
    }
}

#[test]
fn test_turn_terminates_when_relay_is_gone() {
    let dir = tempfile::tempdir().unwrap();
    let relay = Endpoint::bind(&dir.path().join("relay.sock")).unwrap();

    let mut session = Session::connect_as(session_config(dir.path()), 300).unwrap();
    let mut mw = ReportWatcher::memory(|_: ResourceKind, _: ResourceInfo| {});
    session.announce(&mw).unwrap();
    drop(relay);

    // First query goes out immediately and finds no relay
    assert_eq!(session.turn(&mut mw).unwrap(), Flow::Terminate);
}

#[test]
fn test_run_ends_in_terminating_when_relay_disappears() {
    let dir = tempfile::tempdir().unwrap();
    let relay = Endpoint::bind(&dir.path().join("relay.sock")).unwrap();

    let config = session_config(dir.path()).with_query_interval(Duration::from_millis(100));
    let mut session = Session::connect_as(config, 200).unwrap();
    let handle = thread::spawn(move || {
        let mut dw = ReportWatcher::disk(|_: ResourceKind, _: ResourceInfo| {});
        let result = session.run(&mut dw);
        (result, session.state())
    });

    // Tunggu announcement, lalu relay "mati"
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut announced = false;
    while !announced && Instant::now() < deadline {
        announced = collect(&relay)
            .iter()
            .any(|m| m.resource_kind() == ResourceKind::ServiceAnnouncement);
        thread::sleep(Duration::from_millis(10));
    }
    assert!(announced);
    drop(relay);

    let (result, state) = handle.join().unwrap();
    assert!(result.is_ok());
    assert_eq!(state, SessionState::Terminating);
}
