//! Core module: Role Registry dan Router
//!
//! Prinsip desain:
//! - Single owner: registry dimiliki router, router dimiliki relay loop
//! - No locking: satu pesan diproses sampai selesai sebelum pesan berikutnya
//! - Check-and-evict: setiap lookup memverifikasi liveness tujuan

mod liveness;
mod registry;
mod router;

#[cfg(unix)]
pub use liveness::ProcessTable;
pub use liveness::Liveness;
pub use registry::RoleRegistry;
pub use router::{Dispatch, Forward, Route, Router, Transport};
