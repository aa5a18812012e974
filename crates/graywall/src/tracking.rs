//! Tracking tier: per-source packet counters for sources not yet blocked.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::table::BoundedTable;

/// Arrival history for one source address.
///
/// Every field is updated with atomic read-modify-write operations because
/// packets from the same source may be classified concurrently.
#[derive(Debug)]
pub struct TrackedRecord {
    packet_count: AtomicU64,
    last_seen_ns: AtomicU64,
    fast_packets: AtomicU32,
    promoted: AtomicBool,
}

impl TrackedRecord {
    /// Record for a source first seen at `now_ns`.
    #[must_use]
    pub const fn new(now_ns: u64) -> Self {
        Self {
            packet_count: AtomicU64::new(1),
            last_seen_ns: AtomicU64::new(now_ns),
            fast_packets: AtomicU32::new(0),
            promoted: AtomicBool::new(false),
        }
    }

    /// Packets counted while tracked.
    pub fn packet_count(&self) -> u64 {
        self.packet_count.load(Ordering::Relaxed)
    }

    /// Timestamp of the latest processed packet.
    pub fn last_seen_ns(&self) -> u64 {
        self.last_seen_ns.load(Ordering::Acquire)
    }

    /// Arrivals that fell inside the threshold without triggering a block.
    pub fn fast_packets(&self) -> u32 {
        self.fast_packets.load(Ordering::Relaxed)
    }

    /// Count a packet arriving at `now_ns`.
    ///
    /// `last_seen_ns` only ever moves forward, so a packet stamped earlier
    /// than one processed concurrently cannot rewind it.
    pub fn observe(&self, now_ns: u64) -> u64 {
        self.packet_count.fetch_add(1, Ordering::Relaxed);
        self.last_seen_ns.fetch_max(now_ns, Ordering::AcqRel)
    }

    /// Count an arrival inside the threshold, returning the new total.
    pub fn note_fast_packet(&self) -> u32 {
        self.fast_packets
            .fetch_add(1, Ordering::Relaxed)
            .saturating_add(1)
    }

    /// Whether this source was promoted to the enforcement table.
    ///
    /// Once the block is evicted, a promoted record is stale history: the
    /// source is treated as unseen and its next packet restarts the record.
    pub fn is_promoted(&self) -> bool {
        self.promoted.load(Ordering::Acquire)
    }

    /// Mark the source as promoted.
    pub fn mark_promoted(&self) {
        self.promoted.store(true, Ordering::Release);
    }

    /// Start over as if `now_ns` were the source's first packet.
    pub fn restart(&self, now_ns: u64) {
        self.packet_count.store(1, Ordering::Relaxed);
        self.last_seen_ns.store(now_ns, Ordering::Release);
        self.fast_packets.store(0, Ordering::Relaxed);
        self.promoted.store(false, Ordering::Release);
    }

    /// Forget tolerated fast arrivals.
    pub fn reset_fast_packets(&self) {
        if self.fast_packets.load(Ordering::Relaxed) != 0 {
            self.fast_packets.store(0, Ordering::Relaxed);
        }
    }
}

/// Serializable view of a tracked source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntry {
    /// Source address.
    pub ip: Ipv4Addr,
    /// Packets counted while tracked.
    pub packet_count: u64,
    /// Timestamp of the latest processed packet.
    pub last_seen_ns: u64,
    /// Arrivals inside the threshold that were tolerated.
    pub fast_packets: u32,
}

/// Bounded table of [`TrackedRecord`]s keyed by source address.
#[derive(Debug)]
pub struct TrackingTable {
    records: BoundedTable<Ipv4Addr, TrackedRecord>,
}

impl TrackingTable {
    /// Create a table holding at most `capacity` sources.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            records: BoundedTable::new(capacity),
        }
    }

    /// Fetch the record for `ip`, marking it recently used.
    pub fn lookup(&self, ip: Ipv4Addr) -> Option<Arc<TrackedRecord>> {
        self.records.get(&ip)
    }

    /// Fetch the record for `ip` without touching recency.
    pub fn peek(&self, ip: Ipv4Addr) -> Option<Arc<TrackedRecord>> {
        self.records.peek(&ip)
    }

    /// Start tracking `ip` with one packet seen at `now_ns`.
    ///
    /// Returns `false` if another packet already created the record.
    pub fn insert_if_absent(&self, ip: Ipv4Addr, now_ns: u64) -> bool {
        self.records.insert_if_absent(ip, TrackedRecord::new(now_ns))
    }

    /// Number of tracked sources.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no source is tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of tracked sources.
    pub const fn capacity(&self) -> usize {
        self.records.capacity()
    }

    /// Sources forgotten through capacity eviction.
    pub fn evictions(&self) -> u64 {
        self.records.evictions()
    }

    /// Snapshot of every tracked source, most recently used first.
    pub fn entries(&self) -> Vec<TrackedEntry> {
        self.records
            .entries()
            .into_iter()
            .map(|(ip, record)| TrackedEntry {
                ip,
                packet_count: record.packet_count(),
                last_seen_ns: record.last_seen_ns(),
                fast_packets: record.fast_packets(),
            })
            .collect()
    }

    /// Forget every tracked source.
    pub fn clear(&self) -> usize {
        self.records.clear()
    }
}
