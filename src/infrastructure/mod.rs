//! Adapters implementing the domain ports.

pub mod http_client;
pub mod in_memory;
pub mod openai;
pub mod resend;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod stripe;
pub mod supabase;
