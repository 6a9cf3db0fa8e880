//! Adapters behind the domain ports: in-memory stores, the optional RocksDB
//! decision archive and the simulation scorers.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod scoring;
