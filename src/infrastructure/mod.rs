//! Adapters behind the domain ports: payment stores and the Pi Platform API client.

pub mod in_memory;
pub mod pi_api;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
