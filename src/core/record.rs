//! Per-packet record types.
//!
//! A capture export yields one [`RawRecord`] per packet row; ingestion
//! coerces it into a [`PacketRecord`] or drops it. A layer that was not
//! present in the packet is `None`, never a sentinel value.

use serde::{Deserialize, Serialize};

/// TCP flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TcpFlags {
    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub psh: bool,
    pub ack: bool,
    pub urg: bool,
    pub ece: bool,
    pub cwr: bool,
}

impl TcpFlags {
    pub fn from_u8(flags: u8) -> Self {
        Self {
            fin: flags & 0x01 != 0,
            syn: flags & 0x02 != 0,
            rst: flags & 0x04 != 0,
            psh: flags & 0x08 != 0,
            ack: flags & 0x10 != 0,
            urg: flags & 0x20 != 0,
            ece: flags & 0x40 != 0,
            cwr: flags & 0x80 != 0,
        }
    }

    pub fn to_u8(&self) -> u8 {
        let mut flags = 0u8;
        if self.fin {
            flags |= 0x01;
        }
        if self.syn {
            flags |= 0x02;
        }
        if self.rst {
            flags |= 0x04;
        }
        if self.psh {
            flags |= 0x08;
        }
        if self.ack {
            flags |= 0x10;
        }
        if self.urg {
            flags |= 0x20;
        }
        if self.ece {
            flags |= 0x40;
        }
        if self.cwr {
            flags |= 0x80;
        }
        flags
    }
}

/// One packet row as read from a capture export, before coercion.
///
/// All fields are optional strings; the ingestor decides what survives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    pub timestamp: Option<String>,
    pub size: Option<String>,
    pub source_ip: Option<String>,
    pub dest_ip: Option<String>,
    pub protocol: Option<String>,
    pub src_port: Option<String>,
    pub dst_port: Option<String>,
    pub tcp_flags: Option<String>,
    pub tls_handshake_type: Option<String>,
    pub tls_version: Option<String>,
}

/// A cleaned, typed packet record.
///
/// `timestamp` and `size` are always present; every other field reflects
/// whether the packet carried that layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketRecord {
    /// Capture-relative time in seconds, monotonic within a sample.
    pub timestamp: f64,
    /// Packet length in bytes.
    pub size: u32,
    pub source_ip: Option<String>,
    pub dest_ip: Option<String>,
    pub protocol: Option<String>,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub tcp_flags: Option<TcpFlags>,
    pub tls_handshake_type: Option<u8>,
    pub tls_version: Option<String>,
}

impl PacketRecord {
    /// Minimal record carrying only the fields the feature extractor uses.
    pub fn new(timestamp: f64, size: u32) -> Self {
        Self {
            timestamp,
            size,
            source_ip: None,
            dest_ip: None,
            protocol: None,
            src_port: None,
            dst_port: None,
            tcp_flags: None,
            tls_handshake_type: None,
            tls_version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_flags_roundtrip() {
        let flags = TcpFlags::from_u8(0x12); // SYN+ACK
        assert!(flags.syn);
        assert!(flags.ack);
        assert!(!flags.fin);
        assert_eq!(flags.to_u8(), 0x12);
    }

    #[test]
    fn test_record_optional_layers() {
        let rec = PacketRecord::new(0.5, 1500);
        assert_eq!(rec.size, 1500);
        assert!(rec.src_port.is_none());
        assert!(rec.tls_version.is_none());
    }
}
