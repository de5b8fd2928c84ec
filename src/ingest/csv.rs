//! CSV capture-export reading.
//!
//! Reads one Wireshark-style CSV export per capture. Header names vary
//! between export dialects, so the timestamp column may be `Time` or
//! `Timestamp` and the size column `Length`, `Packet Size` or `Size`;
//! matching is case-insensitive. Sample names come from file stems.

use std::path::Path;

use tracing::{info, warn};

use crate::core::{RawRecord, Sample, SampleBatch};
use crate::error::{FlowprintError, Result};

use super::Ingestor;

const TIMESTAMP_ALIASES: &[&str] = &["time", "timestamp"];
const SIZE_ALIASES: &[&str] = &["length", "packet size", "size"];
const SOURCE_ALIASES: &[&str] = &["source", "source ip", "src"];
const DEST_ALIASES: &[&str] = &["destination", "destination ip", "dst"];
const PROTOCOL_ALIASES: &[&str] = &["protocol"];
const SRC_PORT_ALIASES: &[&str] = &["source port", "src port"];
const DST_PORT_ALIASES: &[&str] = &["destination port", "dst port"];
const TCP_FLAGS_ALIASES: &[&str] = &["tcp flags", "flags"];
const TLS_HS_ALIASES: &[&str] = &["handshake type", "tls handshake type"];
const TLS_VERSION_ALIASES: &[&str] = &["tls version", "record version"];

/// Column indices resolved from a header row.
#[derive(Debug, Clone, Copy, Default)]
struct Columns {
    timestamp: Option<usize>,
    size: Option<usize>,
    source_ip: Option<usize>,
    dest_ip: Option<usize>,
    protocol: Option<usize>,
    src_port: Option<usize>,
    dst_port: Option<usize>,
    tcp_flags: Option<usize>,
    tls_handshake_type: Option<usize>,
    tls_version: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Self {
        let find = |aliases: &[&str]| {
            headers
                .iter()
                .position(|h| aliases.contains(&h.trim().to_lowercase().as_str()))
        };

        Self {
            timestamp: find(TIMESTAMP_ALIASES),
            size: find(SIZE_ALIASES),
            source_ip: find(SOURCE_ALIASES),
            dest_ip: find(DEST_ALIASES),
            protocol: find(PROTOCOL_ALIASES),
            src_port: find(SRC_PORT_ALIASES),
            dst_port: find(DST_PORT_ALIASES),
            tcp_flags: find(TCP_FLAGS_ALIASES),
            tls_handshake_type: find(TLS_HS_ALIASES),
            tls_version: find(TLS_VERSION_ALIASES),
        }
    }

    fn field(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
        idx.and_then(|i| record.get(i))
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
    }

    fn raw_record(&self, record: &csv::StringRecord) -> RawRecord {
        RawRecord {
            timestamp: Self::field(record, self.timestamp),
            size: Self::field(record, self.size),
            source_ip: Self::field(record, self.source_ip),
            dest_ip: Self::field(record, self.dest_ip),
            protocol: Self::field(record, self.protocol),
            src_port: Self::field(record, self.src_port),
            dst_port: Self::field(record, self.dst_port),
            tcp_flags: Self::field(record, self.tcp_flags),
            tls_handshake_type: Self::field(record, self.tls_handshake_type),
            tls_version: Self::field(record, self.tls_version),
        }
    }
}

/// Read one capture export into a sample named after the file stem.
pub fn read_capture(path: &Path) -> Result<Sample> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns = Columns::resolve(reader.headers()?);

    if columns.timestamp.is_none() || columns.size.is_none() {
        warn!(
            file = %path.display(),
            "no timestamp/size column found; every row will drop"
        );
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(columns.raw_record(&record?));
    }

    Ok(Ingestor::new().ingest(name, rows))
}

/// Read every `*.csv` file in a directory into a batch, in sorted file
/// order so runs over the same directory are deterministic.
pub fn read_capture_dir(dir: &Path) -> Result<SampleBatch> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(FlowprintError::EmptyBatch);
    }

    let mut batch = SampleBatch::new();
    for path in &paths {
        let sample = read_capture(path)?;
        info!(
            sample = %sample.name(),
            packets = sample.len(),
            "ingested capture"
        );
        batch.push(sample);
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_read_capture_wireshark_headers() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "zoom_call.csv",
            "No.,Time,Source,Destination,Protocol,Length\n\
             1,0.000,10.0.0.1,10.0.0.2,TLSv1.2,517\n\
             2,0.104,10.0.0.2,10.0.0.1,TLSv1.2,1384\n",
        );

        let sample = read_capture(&dir.path().join("zoom_call.csv")).unwrap();
        assert_eq!(sample.name(), "zoom_call");
        assert_eq!(sample.len(), 2);
        assert_eq!(sample.records()[1].size, 1384);
        assert_eq!(sample.records()[0].protocol.as_deref(), Some("TLSv1.2"));
    }

    #[test]
    fn test_read_capture_renamed_headers() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "spotify.csv",
            "Timestamp,Packet Size\n0.0,120\nbad,140\n1.0,160\n",
        );

        let sample = read_capture(&dir.path().join("spotify.csv")).unwrap();
        // The malformed middle row drops, the rest survive
        assert_eq!(sample.len(), 2);
    }

    #[test]
    fn test_read_capture_dir_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "b.csv", "Time,Length\n0.0,10\n");
        write_file(dir.path(), "a.csv", "Time,Length\n0.0,10\n");
        write_file(dir.path(), "notes.txt", "ignored");

        let batch = read_capture_dir(dir.path()).unwrap();
        let names: Vec<&str> = batch.names().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_read_capture_dir_empty_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_capture_dir(dir.path()),
            Err(FlowprintError::EmptyBatch)
        ));
    }
}
