//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use graywall::{BlockOrigin, FilterConfig, FilterSnapshot, StatsSnapshot, Verdict};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as human-readable text.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

// Configurations read best as the TOML they are loaded from.
impl TableDisplay for FilterConfig {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        write!(writer, "{}", self.to_toml()?)?;
        Ok(())
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigCheck {
    /// File that was checked.
    pub path: String,
    /// The loaded configuration.
    pub config: FilterConfig,
}

impl TableDisplay for ConfigCheck {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let config = &self.config;
        writeln!(writer, "{}: OK", self.path)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Threshold:        {} ns", config.threshold_duration)?;
        writeln!(writer, "Fast limit:       {}", config.fast_packet_limit)?;
        writeln!(writer, "Malformed frames: {}", config.malformed_verdict)?;
        writeln!(writer)?;
        writeln!(writer, "Tables")?;
        writeln!(writer, "  Tracking:       {}", config.tracking_capacity)?;
        writeln!(writer, "  Enforcement:    {}", config.enforcement_capacity)?;
        writeln!(writer)?;
        writeln!(writer, "Static lists")?;
        writeln!(writer, "  Allowlisted:    {}", config.allowlist.len())?;
        writeln!(writer, "  Denylisted:     {}", config.denylist.len())?;
        Ok(())
    }
}

/// Verdict for one replayed packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacketVerdict {
    /// Line of the trace the packet came from.
    pub line: usize,
    /// Arrival timestamp in nanoseconds.
    pub at_ns: u64,
    /// Source address, when the frame was IPv4/TCP.
    pub source: Option<Ipv4Addr>,
    /// Filter decision.
    pub verdict: Verdict,
}

/// Everything a replay produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// Trace file that was replayed.
    pub trace: String,
    /// Wall-clock time the replay ran.
    pub captured_at: DateTime<Utc>,
    /// Threshold the filter ran with, in nanoseconds.
    pub threshold_duration: u64,
    /// One verdict per packet, in trace order.
    pub packets: Vec<PacketVerdict>,
    /// Final counters.
    pub stats: StatsSnapshot,
    /// Table contents, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<FilterSnapshot>,
}

impl TableDisplay for ReplayReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(
            writer,
            "Replay of {} ({})",
            self.trace,
            self.captured_at.to_rfc3339()
        )?;
        writeln!(writer, "Threshold: {} ns", self.threshold_duration)?;
        writeln!(writer)?;

        if self.packets.is_empty() {
            writeln!(writer, "No packets in trace")?;
        } else {
            writeln!(
                writer,
                "{:>6}  {:>20}  {:<15}  {:<7}",
                "LINE", "TIME (ns)", "SOURCE", "VERDICT"
            )?;
            writeln!(writer, "{}", "─".repeat(54))?;
            for packet in &self.packets {
                writeln!(
                    writer,
                    "{:>6}  {:>20}  {:<15}  {:<7}",
                    packet.line,
                    packet.at_ns,
                    source_label(packet.source),
                    packet.verdict.to_string()
                )?;
            }
        }

        writeln!(writer)?;
        writeln!(writer, "Summary")?;
        writeln!(writer, "  Passed:         {}", self.stats.passed)?;
        writeln!(writer, "  Dropped:        {}", self.stats.dropped)?;
        writeln!(writer, "  Promotions:     {}", self.stats.promotions)?;
        writeln!(writer, "  Allowlisted:    {}", self.stats.allowlisted)?;
        writeln!(writer, "  Non-TCP:        {}", self.stats.bypassed)?;
        writeln!(writer, "  Malformed:      {}", self.stats.malformed)?;

        if let Some(tables) = &self.tables {
            writeln!(writer)?;
            write_tables(writer, tables)?;
        }
        Ok(())
    }
}

fn write_tables<W: Write>(writer: &mut W, tables: &FilterSnapshot) -> Result<(), CliError> {
    writeln!(
        writer,
        "Tracking table ({}/{}, {} evicted)",
        tables.tracked.len(),
        tables.tracking_capacity,
        tables.tracking_evictions
    )?;
    writeln!(
        writer,
        "  {:<15}  {:>8}  {:>20}  {:>4}",
        "SOURCE", "PACKETS", "LAST SEEN (ns)", "FAST"
    )?;
    for entry in &tables.tracked {
        writeln!(
            writer,
            "  {:<15}  {:>8}  {:>20}  {:>4}",
            entry.ip.to_string(),
            entry.packet_count,
            entry.last_seen_ns,
            entry.fast_packets
        )?;
    }

    writeln!(writer)?;
    writeln!(
        writer,
        "Enforcement table ({}/{}, {} released)",
        tables.blocked.len(),
        tables.enforcement_capacity,
        tables.enforcement_evictions
    )?;
    writeln!(
        writer,
        "  {:<15}  {:>8}  {:>20}  {:<9}",
        "SOURCE", "PACKETS", "BLOCKED AT (ns)", "ORIGIN"
    )?;
    for entry in &tables.blocked {
        writeln!(
            writer,
            "  {:<15}  {:>8}  {:>20}  {:<9}",
            entry.ip.to_string(),
            entry.packet_count,
            entry.blocked_at_ns,
            origin_label(entry.origin)
        )?;
    }
    Ok(())
}

fn source_label(source: Option<Ipv4Addr>) -> String {
    source.map_or_else(|| "-".to_string(), |ip| ip.to_string())
}

const fn origin_label(origin: BlockOrigin) -> &'static str {
    match origin {
        BlockOrigin::Escalated => "escalated",
        BlockOrigin::Seeded => "seeded",
    }
}
