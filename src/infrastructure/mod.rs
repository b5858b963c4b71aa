//! Adapters implementing the domain ports: pending request stores, configuration sources and
//! the HTTP tokenize client.

pub mod configuration;
pub mod file;
pub mod gateway;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
