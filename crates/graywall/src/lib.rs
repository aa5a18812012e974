//! # graywall
//!
//! Inline per-packet source reputation filter.
//!
//! Every inbound IPv4/TCP packet is keyed by its source address. Sources
//! start out tracked; a source whose consecutive packets arrive closer
//! together than the configured threshold is promoted to the enforcement
//! table and its traffic is dropped from then on.
//!
//! ## Storage
//!
//! - [`TrackingTable`] - packet count and last-seen time per source
//! - [`EnforcementTable`] - set of blocked sources
//!
//! Both are fixed-capacity and evict the least recently used entry when a
//! new key arrives at capacity. Eviction is the only expiry mechanism: a
//! block lasts until enough newer offenders push it out, so its duration
//! shrinks as load grows.
//!
//! ## Classification
//!
//! - [`ReputationFilter`] - frame parsing, allow/deny lists, the timing test
//! - [`Verdict`] - `Pass` or `Drop`
//!
//! # Example
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//!
//! use graywall::{FilterConfig, ReputationFilter, Verdict};
//!
//! let config = FilterConfig::builder()
//!     .threshold(Duration::from_secs(1))
//!     .build();
//! let filter = ReputationFilter::new(config).expect("valid config");
//!
//! let src = Ipv4Addr::new(10, 0, 0, 1);
//! assert_eq!(filter.classify(src, 0), Verdict::Pass);
//! assert_eq!(filter.classify(src, 500_000_000), Verdict::Drop);
//! assert_eq!(filter.classify(src, 600_000_000), Verdict::Drop);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
pub mod clock;
pub mod config;
pub mod enforcement;
pub mod error;
pub mod packet;
pub mod table;
pub mod trace;
pub mod tracking;

// Re-export main types
pub use classifier::{
    FilterSnapshot, FilterStats, ReputationFilter, SourceState, StatsSnapshot, Verdict,
};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{FilterConfig, FilterConfigBuilder};
pub use enforcement::{BlockEntry, BlockOrigin, BlockedEntry, EnforcementTable};
pub use error::{FilterError, FilterResult};
pub use packet::{Frame, FrameError, build_frame, parse_frame};
pub use table::BoundedTable;
pub use trace::{TracePacket, load_trace, parse_trace};
pub use tracking::{TrackedEntry, TrackedRecord, TrackingTable};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::classifier::{ReputationFilter, SourceState, Verdict};
    pub use crate::clock::{Clock, ManualClock, MonotonicClock};
    pub use crate::config::FilterConfig;
    pub use crate::error::{FilterError, FilterResult};
}
