//! End-to-end behaviour of the reputation filter driven through raw frames.

use std::net::Ipv4Addr;
use std::time::Duration;

use graywall::packet::{ETH_HDR_LEN, IPPROTO_TCP, IPPROTO_UDP, IPV4_HDR_LEN};
use graywall::{
    FilterConfig, ManualClock, ReputationFilter, SourceState, Verdict, build_frame,
};
use proptest::prelude::*;

const MS: u64 = 1_000_000;
const SEC: u64 = 1_000_000_000;

fn filter(threshold: Duration, tracking: usize, enforcement: usize) -> ReputationFilter {
    let config = FilterConfig::builder()
        .threshold(threshold)
        .tracking_capacity(tracking)
        .enforcement_capacity(enforcement)
        .build();
    ReputationFilter::new(config).expect("valid config")
}

fn tcp_from(ip: Ipv4Addr) -> Vec<u8> {
    build_frame(ip, IPPROTO_TCP)
}

#[test]
fn reference_scenario_through_frames() {
    let filter = filter(Duration::from_secs(1), 32, 32);
    let clock = ManualClock::new(0);
    let a = tcp_from(Ipv4Addr::new(10, 0, 0, 1));
    let b = tcp_from(Ipv4Addr::new(10, 0, 0, 2));

    assert_eq!(filter.inspect_with(&a, &clock), Verdict::Pass);
    assert_eq!(filter.inspect_with(&b, &clock), Verdict::Pass);

    clock.set(500 * MS);
    assert_eq!(filter.inspect_with(&a, &clock), Verdict::Drop);

    clock.set(600 * MS);
    assert_eq!(filter.inspect_with(&a, &clock), Verdict::Drop);

    clock.set(2 * SEC);
    assert_eq!(filter.inspect_with(&b, &clock), Verdict::Pass);

    let snapshot = filter.snapshot();
    let tracked_b = snapshot
        .tracked
        .iter()
        .find(|entry| entry.ip == Ipv4Addr::new(10, 0, 0, 2))
        .expect("10.0.0.2 tracked");
    assert_eq!(tracked_b.packet_count, 2);
    assert_eq!(snapshot.blocked.len(), 1);
    assert_eq!(snapshot.blocked[0].ip, Ipv4Addr::new(10, 0, 0, 1));
}

#[test]
fn eviction_readmits_least_recently_used_offender() {
    let capacity = 4;
    let filter = filter(Duration::from_millis(100), 64, capacity);

    // Fill the enforcement table with offenders 1..=4.
    let mut now = 0;
    for last in 1..=capacity as u8 {
        let frame = tcp_from(Ipv4Addr::new(10, 1, 0, last));
        assert_eq!(filter.inspect(&frame, now), Verdict::Pass);
        assert_eq!(filter.inspect(&frame, now + MS), Verdict::Drop);
        now += 10 * MS;
    }
    assert_eq!(filter.enforcement().len(), capacity);

    // One more offender releases 10.1.0.1, the least recently used block.
    let extra = tcp_from(Ipv4Addr::new(10, 1, 0, 200));
    filter.inspect(&extra, now);
    filter.inspect(&extra, now + MS);
    assert_eq!(filter.enforcement().len(), capacity);
    assert_eq!(filter.snapshot().enforcement_evictions, 1);

    // Released straight back to unseen: the next packet passes even though
    // it arrives well inside the threshold of the source's last one.
    let first = Ipv4Addr::new(10, 1, 0, 1);
    assert_eq!(filter.state_of(first), SourceState::Unseen);
    assert_eq!(filter.inspect(&tcp_from(first), now + 2 * MS), Verdict::Pass);
    assert_eq!(filter.state_of(first), SourceState::Tracked);
}

#[test]
fn malformed_frames_never_touch_tables() {
    for verdict in [Verdict::Pass, Verdict::Drop] {
        let config = FilterConfig::builder().malformed_verdict(verdict).build();
        let filter = ReputationFilter::new(config).expect("valid config");
        let full = tcp_from(Ipv4Addr::new(10, 0, 0, 1));

        for len in 0..ETH_HDR_LEN + IPV4_HDR_LEN {
            assert_eq!(filter.inspect(&full[..len], len as u64), verdict);
        }

        // A non-IPv4 EtherType does not exempt a short frame.
        let mut arp = full.clone();
        arp[12..14].copy_from_slice(&[0x08, 0x06]);
        for len in ETH_HDR_LEN..ETH_HDR_LEN + IPV4_HDR_LEN {
            assert_eq!(filter.inspect(&arp[..len], 0), verdict);
        }

        let snapshot = filter.snapshot();
        assert!(snapshot.tracked.is_empty());
        assert!(snapshot.blocked.is_empty());
        assert_eq!(
            snapshot.stats.malformed,
            (ETH_HDR_LEN + 2 * IPV4_HDR_LEN) as u64
        );
        assert_eq!(snapshot.stats.bypassed, 0);
    }
}

#[test]
fn non_tcp_traffic_passes_through() {
    let filter = filter(Duration::from_secs(1), 32, 32);
    let udp = build_frame(Ipv4Addr::new(10, 0, 0, 1), IPPROTO_UDP);

    for t in 0..100 {
        assert_eq!(filter.inspect(&udp, t), Verdict::Pass);
    }
    assert!(filter.tracking().is_empty());
    assert!(filter.enforcement().is_empty());
}

#[test]
fn blocked_source_stays_blocked_until_evicted() {
    let filter = filter(Duration::from_millis(1), 32, 32);
    let src = Ipv4Addr::new(10, 0, 0, 7);

    filter.classify(src, 0);
    assert_eq!(filter.classify(src, 1), Verdict::Drop);

    // Even at a perfectly slow cadence the block holds.
    for i in 1..50 {
        assert_eq!(filter.classify(src, i * SEC), Verdict::Drop);
    }
}

proptest! {
    #[test]
    fn slow_cadence_is_never_blocked(
        threshold_ms in 1_u64..1_000,
        gaps in prop::collection::vec(0_u64..5_000, 1..64),
    ) {
        let threshold = threshold_ms * MS;
        let filter = filter(Duration::from_nanos(threshold), 32, 32);
        let src = Ipv4Addr::new(10, 9, 9, 9);

        let mut now = 0;
        prop_assert_eq!(filter.classify(src, now), Verdict::Pass);
        for gap in gaps {
            now += threshold + gap * 1_000;
            prop_assert_eq!(filter.classify(src, now), Verdict::Pass);
        }
        prop_assert!(filter.enforcement().is_empty());
    }

    #[test]
    fn first_packet_from_fresh_source_passes(octets in any::<[u8; 4]>(), at in any::<u64>()) {
        let filter = ReputationFilter::default();
        let src = Ipv4Addr::from(octets);

        prop_assert_eq!(filter.classify(src, at), Verdict::Pass);
        let tracked = filter.snapshot().tracked;
        prop_assert_eq!(tracked.len(), 1);
        prop_assert_eq!(tracked[0].packet_count, 1);
    }

    #[test]
    fn tables_respect_capacity(
        tracking in 1_usize..8,
        enforcement in 1_usize..8,
        packets in prop::collection::vec((0_u8..32, 0_u64..50), 0..300),
    ) {
        let filter = filter(Duration::from_millis(10), tracking, enforcement);

        let mut now = 0;
        for (last, step_ms) in packets {
            now += step_ms * MS / 4;
            filter.classify(Ipv4Addr::new(172, 16, 0, last), now);
            prop_assert!(filter.tracking().len() <= tracking);
            prop_assert!(filter.enforcement().len() <= enforcement);
        }
    }
}
