// onion_test.rs - onion packet construction and processing tests
// Copyright (C) 2018  David Stainton.

use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;

use lnsphinx::client::new_onion_packet;
use lnsphinx::constants::{ADDRESS_SIZE, MAX_HOPS, ONION_PACKET_SIZE};
use lnsphinx::ecdh::PrivateKey;
use lnsphinx::error::{ConstructionError, ProcessingError};
use lnsphinx::hop_data::HopData;
use lnsphinx::packet::{OnionPacket, ProcessedPacket};
use lnsphinx::replay::{DecayedLog, MemoryStore};
use lnsphinx::router::Router;

const ASSOC_DATA: &[u8] = b"payment hash of the htlc";

fn new_router() -> Router<DecayedLog> {
    Router::new(PrivateKey::generate(&mut OsRng), DecayedLog::new(Arc::new(MemoryStore::new()), None))
}

fn new_address() -> [u8; ADDRESS_SIZE] {
    let mut address = [0u8; ADDRESS_SIZE];
    while address == [0u8; ADDRESS_SIZE] {
        OsRng.fill_bytes(&mut address);
    }
    address
}

/// Build a route of `num_hops` routers, each hop naming the next one and
/// the last one carrying the exit address.
fn new_route(num_hops: usize) -> (Vec<Router<DecayedLog>>, Vec<HopData>) {
    let routers: Vec<_> = (0..num_hops).map(|_| new_router()).collect();
    let hops_data = (0..num_hops)
        .map(|i| {
            let next_address = if i + 1 == num_hops { [0u8; ADDRESS_SIZE] } else { new_address() };
            HopData::new(next_address, 1000 * (num_hops - i) as u64, 100 + i as u32)
        })
        .collect();
    (routers, hops_data)
}

fn build(routers: &[Router<DecayedLog>], hops_data: &[HopData]) -> OnionPacket {
    let route: Vec<_> = routers.iter().map(|r| r.public_key()).collect();
    new_onion_packet(&route, &PrivateKey::generate(&mut OsRng), hops_data, ASSOC_DATA).unwrap()
}

#[test]
fn onion_round_trip_test() {
    for num_hops in 1..=MAX_HOPS {
        let (routers, hops_data) = new_route(num_hops);
        let mut packet = build(&routers, &hops_data);

        for (i, router) in routers.iter().enumerate() {
            // every hop receives the packet off the wire
            let wire = packet.to_bytes();
            assert_eq!(wire.len(), ONION_PACKET_SIZE);
            let received = OnionPacket::from_bytes(&wire).unwrap();

            let processed = router.process_onion_packet(&received, ASSOC_DATA).unwrap();
            let got = processed.hop_data();
            assert_eq!(got.next_address, hops_data[i].next_address);
            assert_eq!(got.forward_amount, hops_data[i].forward_amount);
            assert_eq!(got.outgoing_cltv, hops_data[i].outgoing_cltv);

            match processed {
                ProcessedPacket::MoreHops { next_packet, .. } => {
                    assert!(i + 1 < num_hops, "hop {} of {} did not exit", i, num_hops);
                    assert_ne!(next_packet.ephemeral_key, received.ephemeral_key);
                    packet = *next_packet;
                }
                ProcessedPacket::ExitNode { hop_data } => {
                    assert_eq!(i + 1, num_hops);
                    assert!(hop_data.is_exit());
                }
            }
        }
    }
}

#[test]
fn three_hop_payment_test() {
    let routers: Vec<_> = (0..3).map(|_| new_router()).collect();
    let addresses = [new_address(), new_address(), [0u8; ADDRESS_SIZE]];
    let hops_data = [
        HopData::new(addresses[0], 300, 10),
        HopData::new(addresses[1], 200, 20),
        HopData::new(addresses[2], 100, 30),
    ];
    let packet = build(&routers, &hops_data);

    let first = routers[0].process_onion_packet(&packet, ASSOC_DATA).unwrap();
    assert_eq!(first.hop_data().forward_amount, 300);
    assert_eq!(first.hop_data().outgoing_cltv, 10);
    assert_eq!(first.hop_data().next_address, addresses[0]);

    let second = routers[1].process_onion_packet(first.next_packet().unwrap(), ASSOC_DATA).unwrap();
    assert_eq!(second.hop_data().forward_amount, 200);
    assert_eq!(second.hop_data().outgoing_cltv, 20);

    let third = routers[2].process_onion_packet(second.next_packet().unwrap(), ASSOC_DATA).unwrap();
    assert!(third.is_exit());
    assert!(third.next_packet().is_none());
    assert_eq!(third.hop_data().forward_amount, 100);
    assert_eq!(third.hop_data().outgoing_cltv, 30);
}

#[test]
fn packet_size_is_route_independent_test() {
    let (short_routers, short_hops) = new_route(1);
    let (long_routers, long_hops) = new_route(MAX_HOPS);
    let short = build(&short_routers, &short_hops).to_bytes();
    let long = build(&long_routers, &long_hops).to_bytes();
    assert_eq!(short.len(), long.len());
    assert_eq!(short.len(), ONION_PACKET_SIZE);
}

#[test]
fn tampering_is_detected_test() {
    let (routers, hops_data) = new_route(3);
    let packet = build(&routers, &hops_data);

    let mut flipped = packet.clone();
    flipped.routing_info[700] ^= 0x01;
    assert!(matches!(routers[0].process_onion_packet(&flipped, ASSOC_DATA), Err(ProcessingError::IntegrityFailure)));

    let mut tagged = packet.clone();
    tagged.header_mac[0] ^= 0x80;
    assert!(matches!(routers[0].process_onion_packet(&tagged, ASSOC_DATA), Err(ProcessingError::IntegrityFailure)));

    let mut rekeyed = packet.clone();
    rekeyed.ephemeral_key = PrivateKey::generate(&mut OsRng).public_key();
    assert!(matches!(routers[0].process_onion_packet(&rekeyed, ASSOC_DATA), Err(ProcessingError::IntegrityFailure)));

    assert!(matches!(
        routers[0].process_onion_packet(&packet, b"another payment hash"),
        Err(ProcessingError::IntegrityFailure)
    ));

    // none of the rejected packets were recorded
    assert!(routers[0].process_onion_packet(&packet, ASSOC_DATA).is_ok());
}

#[test]
fn wrong_hop_order_test() {
    let (routers, hops_data) = new_route(2);
    let packet = build(&routers, &hops_data);
    assert!(matches!(routers[1].process_onion_packet(&packet, ASSOC_DATA), Err(ProcessingError::IntegrityFailure)));
}

#[test]
fn construction_errors_test() {
    let session_key = PrivateKey::generate(&mut OsRng);
    assert!(matches!(
        new_onion_packet(&[], &session_key, &[], ASSOC_DATA),
        Err(ConstructionError::InvalidRouteLength(0))
    ));

    let (routers, hops_data) = new_route(MAX_HOPS);
    let mut route: Vec<_> = routers.iter().map(|r| r.public_key()).collect();
    route.push(new_router().public_key());
    let mut too_many = hops_data.clone();
    too_many.push(HopData::default());
    assert!(matches!(
        new_onion_packet(&route, &session_key, &too_many, ASSOC_DATA),
        Err(ConstructionError::InvalidRouteLength(21))
    ));

    assert!(matches!(
        new_onion_packet(&route[..2], &session_key, &hops_data[..1], ASSOC_DATA),
        Err(ConstructionError::PayloadCountMismatch { route: 2, payloads: 1 })
    ));
}
