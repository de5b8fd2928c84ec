//! Named capture samples and the per-run batch.
//!
//! A [`Sample`] is one capture's worth of cleaned packet records, identified
//! by name. A [`SampleBatch`] is the explicit batch object a run operates on:
//! built once, passed by reference through extraction, normalization and
//! classification, never global.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::record::PacketRecord;

/// One capture's worth of packets. Immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    name: String,
    records: Vec<PacketRecord>,
}

impl Sample {
    pub fn new(name: impl Into<String>, records: Vec<PacketRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[PacketRecord] {
        &self.records
    }

    /// Number of valid packet records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Packet sizes in record order.
    pub fn sizes(&self) -> impl Iterator<Item = u32> + '_ {
        self.records.iter().map(|r| r.size)
    }

    /// Forward differences of timestamps in record order (n-1 values).
    pub fn intervals(&self) -> Vec<f64> {
        self.records
            .windows(2)
            .map(|w| w[1].timestamp - w[0].timestamp)
            .collect()
    }

    /// Protocol label counts, most frequent first.
    pub fn protocol_counts(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for rec in &self.records {
            if let Some(proto) = rec.protocol.as_deref() {
                *counts.entry(proto).or_insert(0) += 1;
            }
        }
        sorted_counts(counts)
    }

    /// Most frequent TCP source ports, up to `limit`.
    pub fn top_source_ports(&self, limit: usize) -> Vec<(u16, usize)> {
        let mut counts: HashMap<u16, usize> = HashMap::new();
        for rec in &self.records {
            if let Some(port) = rec.src_port {
                *counts.entry(port).or_insert(0) += 1;
            }
        }
        let mut out: Vec<(u16, usize)> = counts.into_iter().collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        out.truncate(limit);
        out
    }

    /// TLS handshake type counts, most frequent first.
    pub fn tls_handshake_counts(&self) -> Vec<(u8, usize)> {
        let mut counts: HashMap<u8, usize> = HashMap::new();
        for rec in &self.records {
            if let Some(hs) = rec.tls_handshake_type {
                *counts.entry(hs).or_insert(0) += 1;
            }
        }
        let mut out: Vec<(u8, usize)> = counts.into_iter().collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        out
    }
}

fn sorted_counts(counts: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    out
}

/// Ordered collection of samples for one run. Order is the ingestion order
/// and is the order every downstream table preserves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleBatch {
    samples: Vec<Sample>,
}

impl SampleBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.samples.iter().map(|s| s.name())
    }

    pub fn get(&self, name: &str) -> Option<&Sample> {
        self.samples.iter().find(|s| s.name() == name)
    }
}

impl FromIterator<Sample> for SampleBatch {
    fn from_iter<T: IntoIterator<Item = Sample>>(iter: T) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_sample() -> Sample {
        let mut records = Vec::new();
        for i in 0..4u32 {
            let mut rec = PacketRecord::new(i as f64 * 0.5, 100 * (i + 1));
            rec.protocol = Some(if i % 2 == 0 { "TCP" } else { "TLS" }.to_string());
            rec.src_port = Some(443);
            records.push(rec);
        }
        Sample::new("test", records)
    }

    #[test]
    fn test_intervals() {
        let sample = make_sample();
        let intervals = sample.intervals();
        assert_eq!(intervals.len(), 3);
        for iv in intervals {
            assert!((iv - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_protocol_counts_ordered() {
        let sample = make_sample();
        let counts = sample.protocol_counts();
        assert_eq!(counts.len(), 2);
        // Equal counts fall back to name order
        assert_eq!(counts[0], ("TCP".to_string(), 2));
        assert_eq!(counts[1], ("TLS".to_string(), 2));
    }

    #[test]
    fn test_top_source_ports() {
        let sample = make_sample();
        let ports = sample.top_source_ports(10);
        assert_eq!(ports, vec![(443, 4)]);
    }

    #[test]
    fn test_batch_preserves_order() {
        let mut batch = SampleBatch::new();
        batch.push(Sample::new("b", vec![]));
        batch.push(Sample::new("a", vec![]));
        let names: Vec<&str> = batch.names().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(batch.get("a").is_some());
        assert!(batch.get("c").is_none());
    }
}
