// ============================================
// File: crates/shdc-engine/tests/protocol_flows.rs
// ============================================
//! End-to-end protocol scenarios over loopback UDP: discovery, join,
//! event delivery, replay and tamper rejection, and key rotation.
//!
//! The `RawSensor` harness drives the wire format directly with the
//! core primitives, which both exercises interop against the hub
//! engine and gives the tests byte-level control for the replay,
//! stale-clock, and tamper cases.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shdc_common::time::Timestamp;
use shdc_common::types::DeviceId;
use shdc_core::crypto::{open_with_identity, seal, IdentityKeyPair, IdentityPublicKey, SymmetricKey};
use shdc_core::protocol::messages::{
    CommandType, DiscoveryRequest, DiscoveryResponse, EventBody, EventReport, EventType, Header,
    JoinGrant, JoinRequest, JoinResponse, MessageType,
};
use shdc_core::protocol::{Packet, HEADER_SIZE, SIGNATURE_SIZE};
use shdc_engine::{
    EngineConfig, EventHooks, HubEngine, MemoryKeyStore, SensorEngine, SensorState,
};
use shdc_transport::traits::Transport;
use shdc_transport::UdpTransport;

const HUB_ID: DeviceId = DeviceId::new(0x1000_0001);
const FIRST_SENSOR_ID: u32 = 0xAABB_CCDD;

type EventLog = Arc<Mutex<Vec<(DeviceId, u8, Vec<u8>)>>>;
type CommandLog = Arc<Mutex<Vec<(u8, Vec<u8>)>>>;

struct TestHub {
    engine: Arc<HubEngine>,
    addr: SocketAddr,
    events: EventLog,
    joined: Arc<Mutex<Vec<DeviceId>>>,
}

async fn spawn_hub() -> TestHub {
    let transport = Arc::new(UdpTransport::bind("127.0.0.1:0").await.unwrap());
    let addr = transport.local_addr().unwrap();

    let mut config = EngineConfig::default();
    config.limits.first_device_id = FIRST_SENSOR_ID;
    config.timing.rotation_lead_secs = 0;

    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let joined = Arc::new(Mutex::new(Vec::new()));

    let hooks = {
        let events = Arc::clone(&events);
        let joined = Arc::clone(&joined);
        EventHooks::new()
            .on_event(move |device_id, event_type, data| {
                events.lock().unwrap().push((device_id, event_type, data.to_vec()));
            })
            .on_device_joined(move |info| {
                joined.lock().unwrap().push(info.device_id);
            })
    };

    let keystore = Arc::new(MemoryKeyStore::with_identity(IdentityKeyPair::generate()));
    let engine = HubEngine::new_hub(HUB_ID, keystore, transport, config, hooks).unwrap();
    engine.start().unwrap();

    TestHub {
        engine,
        addr,
        events,
        joined,
    }
}

async fn spawn_sensor(hub_addr: SocketAddr, commands: &CommandLog) -> Arc<SensorEngine> {
    let transport = Arc::new(UdpTransport::bind("127.0.0.1:0").await.unwrap());

    let mut config = EngineConfig::default();
    config.network.discovery_addr = hub_addr;

    let hooks = {
        let commands = Arc::clone(commands);
        EventHooks::new().on_command(move |command_type, data| {
            commands.lock().unwrap().push((command_type, data.to_vec()));
        })
    };

    let keystore = Arc::new(MemoryKeyStore::with_identity(IdentityKeyPair::generate()));
    let sensor =
        SensorEngine::new_sensor(None, "integration sensor", keystore, transport, config, hooks)
            .unwrap();
    sensor.start().unwrap();
    sensor
}

async fn wait_for(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ============================================
// RawSensor harness
// ============================================

/// A sensor driven directly through the core wire primitives.
struct RawSensor {
    identity: IdentityKeyPair,
    transport: UdpTransport,
    hub_addr: SocketAddr,
    assigned_id: DeviceId,
    session_key: SymmetricKey,
}

impl RawSensor {
    async fn join(hub_addr: SocketAddr) -> Self {
        let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let identity = IdentityKeyPair::generate();

        // Discovery round trip.
        let request = DiscoveryRequest::new(identity.public_key_bytes(), "raw sensor").unwrap();
        let header = Header::fresh(MessageType::HubDiscoveryReq, DeviceId::UNASSIGNED);
        let packet = Packet::build(header, request.encode(), &identity).unwrap();
        transport.send(&packet.encode(), &hub_addr).await.unwrap();

        let response = recv_packet(&transport).await;
        assert_eq!(response.header.msg_type, MessageType::HubDiscoveryResp);
        let discovery = DiscoveryResponse::decode(&response.payload).unwrap();
        let hub_pk = IdentityPublicKey::from_bytes(&discovery.hub_public_key).unwrap();
        response.verify(&hub_pk).unwrap();
        assert_eq!(discovery.hub_id, HUB_ID);

        // Join round trip.
        let request = JoinRequest::new(identity.public_key_bytes(), "raw sensor").unwrap();
        let header = Header::fresh(MessageType::JoinRequest, DeviceId::UNASSIGNED);
        let packet = Packet::build(header, request.encode(), &identity).unwrap();
        transport.send(&packet.encode(), &hub_addr).await.unwrap();

        let response = recv_packet(&transport).await;
        assert_eq!(response.header.msg_type, MessageType::JoinResponse);
        response.verify(&hub_pk).unwrap();
        let join = JoinResponse::decode(&response.payload).unwrap();
        let plaintext = open_with_identity(
            &identity,
            &response.header,
            &join.ephemeral_public,
            &join.sealed,
        )
        .unwrap();
        let grant = JoinGrant::decode(&plaintext).unwrap();

        Self {
            identity,
            transport,
            hub_addr,
            assigned_id: grant.assigned_id,
            session_key: SymmetricKey::from_bytes(grant.session_key),
        }
    }

    fn event_packet_with(
        &self,
        event_type: u8,
        data: &[u8],
        timestamp: Option<Timestamp>,
        key: &SymmetricKey,
    ) -> Vec<u8> {
        let mut header = Header::fresh(MessageType::EventReport, self.assigned_id);
        if let Some(ts) = timestamp {
            header.timestamp = ts;
        }
        let body = EventBody::new(event_type, data.to_vec()).unwrap();
        let ciphertext = seal(key, &header, &body.encode()).unwrap();
        Packet::build(header, EventReport { ciphertext }.encode(), &self.identity)
            .unwrap()
            .encode()
    }

    fn event_packet(&self, event_type: u8, data: &[u8]) -> Vec<u8> {
        self.event_packet_with(event_type, data, None, &self.session_key)
    }

    async fn send_raw(&self, bytes: &[u8]) {
        self.transport.send(bytes, &self.hub_addr).await.unwrap();
    }
}

async fn recv_packet(transport: &UdpTransport) -> Packet {
    let mut buf = [0u8; 600];
    let (len, _) = tokio::time::timeout(Duration::from_secs(5), transport.recv(&mut buf))
        .await
        .expect("timed out waiting for packet")
        .expect("transport receive failed");
    Packet::decode(&buf[..len]).expect("undecodable packet")
}

// ============================================
// Scenarios
// ============================================

#[tokio::test]
async fn clean_discovery_join_and_event() {
    let hub = spawn_hub().await;
    let commands: CommandLog = Arc::new(Mutex::new(Vec::new()));
    let sensor = spawn_sensor(hub.addr, &commands).await;

    let found = sensor.discover(Duration::from_secs(10)).await.unwrap();
    assert_eq!(found.hub_id, HUB_ID);
    assert_eq!(sensor.state(), SensorState::Joining);

    let assigned = sensor.join(found.addr, Duration::from_secs(10)).await.unwrap();
    assert_eq!(assigned, DeviceId::new(FIRST_SENSOR_ID));
    assert_eq!(sensor.state(), SensorState::Active);
    assert_eq!(sensor.assigned_id(), Some(assigned));

    // Motion event, empty data.
    sensor.send_event(EventType::Motion.as_byte(), b"").await.unwrap();
    assert!(
        wait_for(
            || hub.events.lock().unwrap().len() == 1,
            Duration::from_secs(5)
        )
        .await
    );
    {
        let events = hub.events.lock().unwrap();
        assert_eq!(events[0], (assigned, EventType::Motion.as_byte(), Vec::new()));
    }

    // The first event confirms the join on the hub side.
    assert!(
        wait_for(
            || hub.joined.lock().unwrap().contains(&assigned),
            Duration::from_secs(1)
        )
        .await
    );

    sensor.stop().await;
    hub.engine.stop().await;
}

#[tokio::test]
async fn replayed_event_is_rejected() {
    let hub = spawn_hub().await;
    let raw = RawSensor::join(hub.addr).await;

    let bytes = raw.event_packet(0x01, b"");
    raw.send_raw(&bytes).await;
    assert!(
        wait_for(
            || hub.events.lock().unwrap().len() == 1,
            Duration::from_secs(5)
        )
        .await
    );

    // Identical bytes again within the replay window.
    raw.send_raw(&bytes).await;
    assert!(
        wait_for(
            || hub.engine.stats().dropped_freshness >= 1,
            Duration::from_secs(5)
        )
        .await
    );
    assert_eq!(hub.events.lock().unwrap().len(), 1);

    hub.engine.stop().await;
}

#[tokio::test]
async fn stale_timestamp_is_rejected() {
    let hub = spawn_hub().await;
    let raw = RawSensor::join(hub.addr).await;

    let stale = Timestamp::from_secs(Timestamp::now().as_secs() - 120);
    let bytes = raw.event_packet_with(0x01, b"", Some(stale), &raw.session_key);
    raw.send_raw(&bytes).await;

    assert!(
        wait_for(
            || hub.engine.stats().dropped_freshness >= 1,
            Duration::from_secs(5)
        )
        .await
    );
    assert!(hub.events.lock().unwrap().is_empty());

    hub.engine.stop().await;
}

#[tokio::test]
async fn tampered_packets_are_rejected() {
    let hub = spawn_hub().await;
    let raw = RawSensor::join(hub.addr).await;

    // Flipping ciphertext invalidates the signature, which covers the
    // payload as-on-wire.
    let mut bytes = raw.event_packet(0x01, b"data");
    bytes[HEADER_SIZE] ^= 0x01;
    raw.send_raw(&bytes).await;
    assert!(
        wait_for(
            || hub.engine.stats().dropped_signature >= 1,
            Duration::from_secs(5)
        )
        .await
    );

    // Flipping a signature byte.
    let mut bytes = raw.event_packet(0x01, b"data");
    let sig_offset = bytes.len() - SIGNATURE_SIZE;
    bytes[sig_offset] ^= 0x01;
    raw.send_raw(&bytes).await;
    assert!(
        wait_for(
            || hub.engine.stats().dropped_signature >= 2,
            Duration::from_secs(5)
        )
        .await
    );

    // Correctly signed but sealed under the wrong key fails the AEAD
    // open without touching application state.
    let wrong_key = SymmetricKey::from_bytes([0x5A; 32]);
    let bytes = raw.event_packet_with(0x01, b"data", None, &wrong_key);
    raw.send_raw(&bytes).await;
    assert!(
        wait_for(
            || hub.engine.stats().dropped_aead >= 1,
            Duration::from_secs(5)
        )
        .await
    );

    assert!(hub.events.lock().unwrap().is_empty());
    hub.engine.stop().await;
}

#[tokio::test]
async fn broadcast_rotation_then_command() {
    let hub = spawn_hub().await;
    let commands: CommandLog = Arc::new(Mutex::new(Vec::new()));
    let sensor = spawn_sensor(hub.addr, &commands).await;

    let found = sensor.discover(Duration::from_secs(10)).await.unwrap();
    sensor.join(found.addr, Duration::from_secs(10)).await.unwrap();

    // The first event moves the sensor to ACTIVE on the hub, making
    // it a rotation and broadcast recipient.
    sensor
        .send_event(EventType::Heartbeat.as_byte(), b"")
        .await
        .unwrap();
    assert!(
        wait_for(
            || hub.events.lock().unwrap().len() == 1,
            Duration::from_secs(5)
        )
        .await
    );

    // Rotate to bkid 0x02 (lead 0: valid immediately), then command
    // under the new key.
    hub.engine.rotate_broadcast().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    hub.engine
        .broadcast(CommandType::ArmSystem.as_byte(), &[0x01])
        .await
        .unwrap();
    assert!(
        wait_for(
            || commands.lock().unwrap().len() == 1,
            Duration::from_secs(5)
        )
        .await
    );
    assert_eq!(
        commands.lock().unwrap()[0],
        (CommandType::ArmSystem.as_byte(), vec![0x01])
    );

    sensor.stop().await;
    hub.engine.stop().await;
}

#[tokio::test]
async fn session_rotation_keeps_events_flowing() {
    let hub = spawn_hub().await;
    let commands: CommandLog = Arc::new(Mutex::new(Vec::new()));
    let sensor = spawn_sensor(hub.addr, &commands).await;

    let found = sensor.discover(Duration::from_secs(10)).await.unwrap();
    let assigned = sensor.join(found.addr, Duration::from_secs(10)).await.unwrap();

    sensor.send_event(0x06, b"21.5").await.unwrap();
    assert!(
        wait_for(
            || hub.events.lock().unwrap().len() == 1,
            Duration::from_secs(5)
        )
        .await
    );

    hub.engine.rotate_session(assigned).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The next event seals under the promoted key and still lands.
    sensor.send_event(0x06, b"22.0").await.unwrap();
    assert!(
        wait_for(
            || hub.events.lock().unwrap().len() == 2,
            Duration::from_secs(5)
        )
        .await
    );
    {
        let events = hub.events.lock().unwrap();
        assert_eq!(events[1], (assigned, 0x06, b"22.0".to_vec()));
    }

    sensor.stop().await;
    hub.engine.stop().await;
}

#[tokio::test]
async fn unknown_device_events_are_dropped() {
    let hub = spawn_hub().await;

    // A sensor that never joined seals under an arbitrary key.
    let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();
    let identity = IdentityKeyPair::generate();
    let key = SymmetricKey::generate();

    let header = Header::fresh(MessageType::EventReport, DeviceId::new(0xDEAD_BEEF));
    let body = EventBody::new(0x01, Vec::new()).unwrap();
    let ciphertext = seal(&key, &header, &body.encode()).unwrap();
    let packet = Packet::build(header, EventReport { ciphertext }.encode(), &identity).unwrap();
    transport.send(&packet.encode(), &hub.addr).await.unwrap();

    assert!(
        wait_for(
            || hub.engine.stats().dropped_state >= 1,
            Duration::from_secs(5)
        )
        .await
    );
    assert!(hub.events.lock().unwrap().is_empty());

    hub.engine.stop().await;
}
