//! Record ingestion: raw capture rows in, cleaned samples out.
//!
//! Coerces timestamps to floats, drops rows missing `size` or `timestamp`,
//! and produces an immutable [`Sample`]. Malformed rows are recovered locally
//! (dropped and counted), never escalated; an input whose rows all drop still
//! yields an empty sample for downstream components to reject explicitly.

pub mod csv;

use tracing::debug;

use crate::core::{PacketRecord, RawRecord, Sample, TcpFlags};

pub use self::csv::{read_capture, read_capture_dir};

/// Turns named sequences of raw packet rows into cleaned samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ingestor;

impl Ingestor {
    pub fn new() -> Self {
        Self
    }

    /// Clean one named row sequence into a sample.
    pub fn ingest<I>(&self, name: impl Into<String>, rows: I) -> Sample
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let name = name.into();
        let mut records = Vec::new();
        let mut total = 0usize;

        for row in rows {
            total += 1;
            if let Some(record) = coerce(row) {
                records.push(record);
            }
        }

        let dropped = total - records.len();
        if dropped > 0 {
            debug!(
                sample = %name,
                dropped,
                total,
                "dropped rows with missing or non-numeric size/timestamp"
            );
        }

        Sample::new(name, records)
    }
}

/// Coerce a raw row into a typed record, or drop it.
fn coerce(row: RawRecord) -> Option<PacketRecord> {
    let timestamp = parse_f64(row.timestamp.as_deref())?;
    let size = parse_size(row.size.as_deref())?;

    Some(PacketRecord {
        timestamp,
        size,
        source_ip: non_empty(row.source_ip),
        dest_ip: non_empty(row.dest_ip),
        protocol: non_empty(row.protocol),
        src_port: row.src_port.as_deref().and_then(parse_port),
        dst_port: row.dst_port.as_deref().and_then(parse_port),
        tcp_flags: row.tcp_flags.as_deref().and_then(parse_tcp_flags),
        tls_handshake_type: row
            .tls_handshake_type
            .as_deref()
            .and_then(|s| s.trim().parse::<u8>().ok()),
        tls_version: non_empty(row.tls_version),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_f64(value: Option<&str>) -> Option<f64> {
    let parsed: f64 = value?.trim().parse().ok()?;
    parsed.is_finite().then_some(parsed)
}

fn parse_size(value: Option<&str>) -> Option<u32> {
    let value = value?.trim();
    if let Ok(size) = value.parse::<u32>() {
        return Some(size);
    }
    // Some exports write lengths as floats
    let parsed: f64 = value.parse().ok()?;
    (parsed.is_finite() && parsed >= 0.0).then(|| parsed.round() as u32)
}

fn parse_port(value: &str) -> Option<u16> {
    value.trim().parse().ok()
}

/// Accepts decimal or Wireshark-style hex ("0x0018") flag values.
fn parse_tcp_flags(value: &str) -> Option<TcpFlags> {
    let value = value.trim();
    let bits = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()?
    } else {
        value.parse::<u16>().ok()?
    };
    Some(TcpFlags::from_u8(bits as u8))
}
