//! Enforcement tier: sources whose traffic is dropped.
//!
//! Presence in the table is the verdict. There is no unblock
//! operation; a block ends only when capacity eviction pushes the entry
//! out, so under a steady stream of new offenders the oldest untouched
//! blocks are released first. How long a block lasts therefore depends on
//! load, not on a fixed duration.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::table::BoundedTable;

/// How a source came to be blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockOrigin {
    /// Promoted by the timing test.
    Escalated,
    /// Loaded from the configured deny list.
    Seeded,
}

/// Diagnostics captured when a source is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    /// Packets the source had sent while tracked.
    pub packet_count: u64,
    /// Timestamp of the promotion.
    pub blocked_at_ns: u64,
    /// Why the entry exists.
    pub origin: BlockOrigin,
}

impl BlockEntry {
    /// Entry for a source promoted by the timing test.
    #[must_use]
    pub const fn escalated(packet_count: u64, blocked_at_ns: u64) -> Self {
        Self {
            packet_count,
            blocked_at_ns,
            origin: BlockOrigin::Escalated,
        }
    }

    /// Entry for a statically denied source.
    #[must_use]
    pub const fn seeded(blocked_at_ns: u64) -> Self {
        Self {
            packet_count: 0,
            blocked_at_ns,
            origin: BlockOrigin::Seeded,
        }
    }
}

/// Serializable view of a blocked source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedEntry {
    /// Source address.
    pub ip: Ipv4Addr,
    /// Packets the source had sent while tracked.
    pub packet_count: u64,
    /// Timestamp of the promotion.
    pub blocked_at_ns: u64,
    /// Why the entry exists.
    pub origin: BlockOrigin,
}

/// Bounded membership table of blocked sources.
#[derive(Debug)]
pub struct EnforcementTable {
    blocked: BoundedTable<Ipv4Addr, BlockEntry>,
}

impl EnforcementTable {
    /// Create a table holding at most `capacity` blocked sources.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            blocked: BoundedTable::new(capacity),
        }
    }

    /// Whether `ip` is blocked. A hit marks the entry recently used, so
    /// sources that keep sending stay resident longer.
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.blocked.contains(&ip)
    }

    /// Block `ip`. Returns `false` if it was already blocked.
    pub fn insert_if_absent(&self, ip: Ipv4Addr, entry: BlockEntry) -> bool {
        self.blocked.insert_if_absent(ip, entry)
    }

    /// Diagnostics for `ip`, without touching recency.
    pub fn get(&self, ip: Ipv4Addr) -> Option<BlockEntry> {
        self.blocked.peek(&ip).map(|entry| *entry)
    }

    /// Number of blocked sources.
    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    /// Whether nothing is blocked.
    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    /// Maximum number of blocked sources.
    pub const fn capacity(&self) -> usize {
        self.blocked.capacity()
    }

    /// Blocks released through capacity eviction.
    pub fn evictions(&self) -> u64 {
        self.blocked.evictions()
    }

    /// Snapshot of every blocked source, most recently used first.
    pub fn entries(&self) -> Vec<BlockedEntry> {
        self.blocked
            .entries()
            .into_iter()
            .map(|(ip, entry)| BlockedEntry {
                ip,
                packet_count: entry.packet_count,
                blocked_at_ns: entry.blocked_at_ns,
                origin: entry.origin,
            })
            .collect()
    }

    /// Release every block.
    pub fn clear(&self) -> usize {
        self.blocked.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(192, 168, 1, last)
    }

    #[test]
    fn test_contains_after_insert() {
        let table = EnforcementTable::new(4);
        assert!(!table.contains(ip(1)));
        assert!(table.insert_if_absent(ip(1), BlockEntry::escalated(3, 500)));
        assert!(table.contains(ip(1)));
    }

    #[test]
    fn test_duplicate_insert_keeps_first_entry() {
        let table = EnforcementTable::new(4);
        table.insert_if_absent(ip(1), BlockEntry::escalated(3, 500));
        assert!(!table.insert_if_absent(ip(1), BlockEntry::escalated(9, 900)));

        assert_eq!(table.get(ip(1)), Some(BlockEntry::escalated(3, 500)));
    }

    #[test]
    fn test_seeded_entry() {
        let entry = BlockEntry::seeded(0);
        assert_eq!(entry.origin, BlockOrigin::Seeded);
        assert_eq!(entry.packet_count, 0);
    }

    #[test]
    fn test_block_released_by_eviction() {
        let table = EnforcementTable::new(2);
        table.insert_if_absent(ip(1), BlockEntry::escalated(1, 0));
        table.insert_if_absent(ip(2), BlockEntry::escalated(1, 0));
        table.insert_if_absent(ip(3), BlockEntry::escalated(1, 0));

        assert!(!table.contains(ip(1)));
        assert!(table.contains(ip(2)));
        assert!(table.contains(ip(3)));
        assert_eq!(table.evictions(), 1);
    }

    #[test]
    fn test_active_offender_outlives_idle_one() {
        let table = EnforcementTable::new(2);
        table.insert_if_absent(ip(1), BlockEntry::escalated(1, 0));
        table.insert_if_absent(ip(2), BlockEntry::escalated(1, 0));

        // ip(1) keeps sending; ip(2) goes quiet.
        assert!(table.contains(ip(1)));
        table.insert_if_absent(ip(3), BlockEntry::escalated(1, 0));

        assert!(table.contains(ip(1)));
        assert!(!table.contains(ip(2)));
    }

    #[test]
    fn test_entries_and_clear() {
        let table = EnforcementTable::new(4);
        table.insert_if_absent(ip(1), BlockEntry::seeded(10));

        let entries = table.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ip, ip(1));
        assert_eq!(entries[0].origin, BlockOrigin::Seeded);

        assert_eq!(table.clear(), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_blocked_entry_serializes_origin_lowercase() {
        let entry = BlockedEntry {
            ip: ip(7),
            packet_count: 2,
            blocked_at_ns: 500,
            origin: BlockOrigin::Escalated,
        };
        let json = serde_json::to_string(&entry).unwrap_or_default();
        assert!(json.contains("\"origin\":\"escalated\""));
        assert!(json.contains("192.168.1.7"));
    }
}
