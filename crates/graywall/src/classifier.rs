//! Per-packet source reputation classifier.
//!
//! A source moves through three states:
//!
//! ```text
//! UNSEEN --first packet--> TRACKED --packet >= threshold apart--> TRACKED
//!                             |
//!                             +--packet < threshold apart--> BLOCKED
//! ```
//!
//! Eviction from either bounded table returns a source to `UNSEEN`; there is
//! no other way out of `BLOCKED`. A released source may still have its old
//! tracking record, which is restarted by the next packet rather than timed
//! against.

use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::clock::Clock;
use crate::config::FilterConfig;
use crate::enforcement::{BlockEntry, BlockedEntry, EnforcementTable};
use crate::error::FilterResult;
use crate::packet::{Frame, parse_frame};
use crate::tracking::{TrackedEntry, TrackingTable};

/// Outcome of classifying one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Continue normal processing.
    Pass,
    /// Discard immediately.
    Drop,
}

impl Verdict {
    /// Whether the packet continues.
    #[must_use]
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Whether the packet is discarded.
    #[must_use]
    pub const fn is_drop(self) -> bool {
        matches!(self, Self::Drop)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("PASS"),
            Self::Drop => f.write_str("DROP"),
        }
    }
}

/// Where a source currently sits in the reputation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    /// Not resident in either table.
    Unseen,
    /// Resident in the tracking table only.
    Tracked,
    /// Resident in the enforcement table.
    Blocked,
}

/// Packet counters, updated with relaxed atomics on the hot path.
#[derive(Debug, Default)]
pub struct FilterStats {
    passed: AtomicU64,
    dropped: AtomicU64,
    promotions: AtomicU64,
    malformed: AtomicU64,
    bypassed: AtomicU64,
    allowlisted: AtomicU64,
}

impl FilterStats {
    /// Copy the current values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            passed: self.passed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            allowlisted: self.allowlisted.load(Ordering::Relaxed),
        }
    }

    fn tally(&self, verdict: Verdict) -> Verdict {
        let counter = match verdict {
            Verdict::Pass => &self.passed,
            Verdict::Drop => &self.dropped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        verdict
    }
}

/// Point-in-time copy of [`FilterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Packets passed.
    pub passed: u64,
    /// Packets dropped.
    pub dropped: u64,
    /// Sources promoted to the enforcement table.
    pub promotions: u64,
    /// Frames that could not be parsed.
    pub malformed: u64,
    /// Frames that were not IPv4/TCP.
    pub bypassed: u64,
    /// Packets from allowlisted sources.
    pub allowlisted: u64,
}

/// Control-plane view of the whole filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSnapshot {
    /// Configured threshold in nanoseconds.
    pub threshold_duration: u64,
    /// Tracking table capacity.
    pub tracking_capacity: usize,
    /// Enforcement table capacity.
    pub enforcement_capacity: usize,
    /// Tracked sources, most recently used first.
    pub tracked: Vec<TrackedEntry>,
    /// Blocked sources, most recently used first.
    pub blocked: Vec<BlockedEntry>,
    /// Sources forgotten by the tracking table.
    pub tracking_evictions: u64,
    /// Blocks released by the enforcement table.
    pub enforcement_evictions: u64,
    /// Packet counters.
    pub stats: StatsSnapshot,
}

/// Inline source reputation filter.
///
/// Safe to share across threads; every method takes `&self` and completes
/// in a bounded number of table operations.
#[derive(Debug)]
pub struct ReputationFilter {
    threshold_ns: u64,
    fast_packet_limit: u32,
    malformed_verdict: Verdict,
    allowlist: BTreeSet<Ipv4Addr>,
    tracking: TrackingTable,
    enforcement: EnforcementTable,
    stats: FilterStats,
}

impl ReputationFilter {
    /// Build a filter from a validated configuration.
    ///
    /// Deny-list entries are loaded into the enforcement table as seeded
    /// blocks stamped at time zero.
    pub fn new(config: FilterConfig) -> FilterResult<Self> {
        config.validate()?;

        let enforcement = EnforcementTable::new(config.enforcement_capacity);
        for ip in &config.denylist {
            enforcement.insert_if_absent(*ip, BlockEntry::seeded(0));
        }

        info!(
            threshold_ns = config.threshold_duration,
            tracking_capacity = config.tracking_capacity,
            enforcement_capacity = config.enforcement_capacity,
            fast_packet_limit = config.fast_packet_limit,
            malformed_verdict = %config.malformed_verdict,
            allowlisted = config.allowlist.len(),
            denylisted = config.denylist.len(),
            "Reputation filter initialised"
        );

        Ok(Self {
            threshold_ns: config.threshold_duration,
            fast_packet_limit: config.fast_packet_limit,
            malformed_verdict: config.malformed_verdict,
            allowlist: config.allowlist,
            tracking: TrackingTable::new(config.tracking_capacity),
            enforcement,
            stats: FilterStats::default(),
        })
    }

    /// Build a filter with the default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            threshold_ns: crate::config::DEFAULT_THRESHOLD_NS,
            fast_packet_limit: 1,
            malformed_verdict: Verdict::Pass,
            allowlist: BTreeSet::new(),
            tracking: TrackingTable::new(crate::config::DEFAULT_TABLE_CAPACITY),
            enforcement: EnforcementTable::new(crate::config::DEFAULT_TABLE_CAPACITY),
            stats: FilterStats::default(),
        }
    }

    // ==================== Dataplane ====================

    /// Classify a raw frame received at `now_ns`.
    ///
    /// Malformed frames get the configured default verdict and non-IPv4/TCP
    /// frames pass; neither touches a table.
    pub fn inspect(&self, frame: &[u8], now_ns: u64) -> Verdict {
        self.inspect_parsed(parse_frame(frame), now_ns)
    }

    /// Classify a frame that has already been through [`parse_frame`].
    pub fn inspect_parsed(&self, frame: Frame, now_ns: u64) -> Verdict {
        match frame {
            Frame::Ipv4Tcp { source } => self.classify(source, now_ns),
            Frame::Other => {
                self.stats.bypassed.fetch_add(1, Ordering::Relaxed);
                self.stats.tally(Verdict::Pass)
            }
            Frame::Malformed(err) => {
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                trace!(error = %err, verdict = %self.malformed_verdict, "Malformed frame");
                self.stats.tally(self.malformed_verdict)
            }
        }
    }

    /// Classify a raw frame, reading the time from `clock`.
    pub fn inspect_with(&self, frame: &[u8], clock: &impl Clock) -> Verdict {
        self.inspect(frame, clock.now_ns())
    }

    /// Classify a packet from `ip` arriving at `now_ns`.
    pub fn classify(&self, ip: Ipv4Addr, now_ns: u64) -> Verdict {
        if self.allowlist.contains(&ip) {
            self.stats.allowlisted.fetch_add(1, Ordering::Relaxed);
            return self.stats.tally(Verdict::Pass);
        }

        if self.enforcement.contains(ip) {
            trace!(ip = %ip, "Blocked source, dropping");
            return self.stats.tally(Verdict::Drop);
        }

        let Some(record) = self.tracking.lookup(ip) else {
            if self.tracking.insert_if_absent(ip, now_ns) {
                debug!(ip = %ip, "Tracking new source");
            }
            return self.stats.tally(Verdict::Pass);
        };

        if record.is_promoted() {
            // Promoted by a concurrent packet after the check above.
            if self.enforcement.contains(ip) {
                return self.stats.tally(Verdict::Drop);
            }
            // The block this record led to has been evicted.
            record.restart(now_ns);
            debug!(ip = %ip, "Block released, tracking source afresh");
            return self.stats.tally(Verdict::Pass);
        }

        let elapsed = now_ns.saturating_sub(record.last_seen_ns());
        if elapsed < self.threshold_ns {
            if record.note_fast_packet() >= self.fast_packet_limit {
                record.reset_fast_packets();
                let entry = BlockEntry::escalated(record.packet_count(), now_ns);
                if self.enforcement.insert_if_absent(ip, entry) {
                    self.stats.promotions.fetch_add(1, Ordering::Relaxed);
                    info!(
                        ip = %ip,
                        elapsed_ns = elapsed,
                        packet_count = entry.packet_count,
                        "Source exceeded packet rate, blocking"
                    );
                }
                // Marked only once the block exists, so a concurrent packet
                // cannot mistake the record for a released one.
                record.mark_promoted();
                return self.stats.tally(Verdict::Drop);
            }
        } else {
            record.reset_fast_packets();
        }

        record.observe(now_ns);
        trace!(ip = %ip, elapsed_ns = elapsed, "Passing tracked source");
        self.stats.tally(Verdict::Pass)
    }

    // ==================== Control plane ====================

    /// Current state of `ip`, without affecting recency.
    #[must_use]
    pub fn state_of(&self, ip: Ipv4Addr) -> SourceState {
        if self.enforcement.get(ip).is_some() {
            SourceState::Blocked
        } else if self
            .tracking
            .peek(ip)
            .is_some_and(|record| !record.is_promoted())
        {
            SourceState::Tracked
        } else {
            SourceState::Unseen
        }
    }

    /// Enumerate both tables and the counters.
    #[must_use]
    pub fn snapshot(&self) -> FilterSnapshot {
        FilterSnapshot {
            threshold_duration: self.threshold_ns,
            tracking_capacity: self.tracking.capacity(),
            enforcement_capacity: self.enforcement.capacity(),
            tracked: self.tracking.entries(),
            blocked: self.enforcement.entries(),
            tracking_evictions: self.tracking.evictions(),
            enforcement_evictions: self.enforcement.evictions(),
            stats: self.stats.snapshot(),
        }
    }

    /// Forget every tracked source.
    pub fn flush_tracking(&self) -> usize {
        let removed = self.tracking.clear();
        info!(removed, "Tracking table flushed");
        removed
    }

    /// Release every block, including seeded ones.
    pub fn flush_enforcement(&self) -> usize {
        let removed = self.enforcement.clear();
        info!(removed, "Enforcement table flushed");
        removed
    }

    // ==================== Accessors ====================

    /// The timing threshold in nanoseconds.
    #[must_use]
    pub const fn threshold_ns(&self) -> u64 {
        self.threshold_ns
    }

    /// The tracking tier.
    #[must_use]
    pub const fn tracking(&self) -> &TrackingTable {
        &self.tracking
    }

    /// The enforcement tier.
    #[must_use]
    pub const fn enforcement(&self) -> &EnforcementTable {
        &self.enforcement
    }

    /// Packet counters.
    #[must_use]
    pub const fn stats(&self) -> &FilterStats {
        &self.stats
    }
}

impl Default for ReputationFilter {
    fn default() -> Self {
        Self::with_defaults()
    }
}
