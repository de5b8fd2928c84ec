//! Core data model: packet records and named capture samples.

pub mod record;
pub mod sample;

pub use record::{PacketRecord, RawRecord, TcpFlags};
pub use sample::{Sample, SampleBatch};
