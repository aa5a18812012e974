//! Trace replay command implementation.
//!
//! Packets are fed through a [`ReputationFilter`] in trace order, with a
//! [`ManualClock`] set to each packet's timestamp, so a replay is fully
//! deterministic.

use std::io::Write;

use chrono::Utc;
use graywall::{
    Clock, FilterConfig, Frame, ManualClock, ReputationFilter, TracePacket, load_trace,
    parse_frame,
};
use tracing::{debug, info};

use crate::cli::ReplayArgs;
use crate::error::CliError;
use crate::output::{OutputFormat, PacketVerdict, ReplayReport};

/// Replay command executor.
#[derive(Debug, Default)]
pub struct ReplayCommand;

impl ReplayCommand {
    /// Create a new replay command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Execute the replay command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or trace cannot be loaded, or
    /// if output fails.
    pub fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &ReplayArgs,
    ) -> Result<(), CliError> {
        let report = self.replay(args)?;
        format.write(writer, &report)
    }

    /// Load the configuration and trace named by `args` and replay it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or trace cannot be loaded.
    pub fn replay(&self, args: &ReplayArgs) -> Result<ReplayReport, CliError> {
        let config = match &args.config {
            Some(path) => FilterConfig::from_file(path)?,
            None => FilterConfig::default(),
        };
        let threshold_duration = config.threshold_duration;
        let filter = ReputationFilter::new(config)?;
        let trace = load_trace(&args.trace)?;

        info!(
            trace = %args.trace.display(),
            packets = trace.len(),
            "Replaying trace"
        );
        let packets = run_trace(&filter, &trace);

        let snapshot = filter.snapshot();
        let stats = snapshot.stats;
        debug!(
            passed = stats.passed,
            dropped = stats.dropped,
            promotions = stats.promotions,
            "Replay complete"
        );

        Ok(ReplayReport {
            trace: args.trace.display().to_string(),
            captured_at: Utc::now(),
            threshold_duration,
            packets,
            stats,
            tables: args.show_tables.then_some(snapshot),
        })
    }
}

/// Classify every packet of `trace` in order.
#[must_use]
pub fn run_trace(filter: &ReputationFilter, trace: &[TracePacket]) -> Vec<PacketVerdict> {
    let clock = ManualClock::new(0);
    trace
        .iter()
        .map(|packet| {
            clock.set(packet.at_ns);
            let frame = parse_frame(&packet.frame);
            let source = match frame {
                Frame::Ipv4Tcp { source } => Some(source),
                Frame::Other | Frame::Malformed(_) => None,
            };
            let verdict = filter.inspect_parsed(frame, clock.now_ns());
            PacketVerdict {
                line: packet.line,
                at_ns: packet.at_ns,
                source,
                verdict,
            }
        })
        .collect()
}
