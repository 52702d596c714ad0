//! Infrastructure adapters: session persistence backends and the HTTP
//! clients for the downstream connector and its restart control surface.

pub mod http;
pub mod in_memory;
pub mod rocksdb;
