//! watchrelay - Resource Status Relay
//!
//! Arsitektur:
//! - Relay: satu process perantara, memegang registry satu-slot-per-role
//! - Watchers: disk (DW), memory (MW), resource provider (RW)
//! - Binary Protocol: record 40 byte, ukuran tetap
//! - Transport: Unix datagram, process id sebagai alamat

pub mod cli;
pub mod config;
pub mod core;
#[cfg(unix)]
pub mod network;
pub mod protocol;
pub mod watcher;
