//! Relay Router
//!
//! State machine per pesan masuk, di-key oleh role pengirim lalu kind:
//!
//! | Sender | Kind         | Action                                   |
//! |--------|--------------|------------------------------------------|
//! | DW     | Announcement | register DW                              |
//! | DW     | Disk         | empty Disk query -> live RW              |
//! | MW     | Announcement | register MW                              |
//! | MW     | Memory       | empty Memory query -> live RW            |
//! | RW     | Announcement | register RW                              |
//! | RW     | Disk         | received values -> live DW               |
//! | RW     | Memory       | received values -> live MW               |
//! | other  | other        | discard                                  |
//!
//! Paling banyak satu tujuan per pesan masuk.

use std::io;

use super::liveness::Liveness;
use super::registry::RoleRegistry;
use crate::protocol::{
    decode, encode, DecodeError, Message, Origin, Payload, ResourceKind, ServiceRole,
};

/// Pengiriman datagram ke process berdasarkan id-nya
pub trait Transport {
    /// Single attempt, no retry. An error means the destination is gone.
    fn send_to(&mut self, pid: u32, datagram: &[u8]) -> io::Result<()>;
}

/// Pesan keluar beserta tujuannya
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Forward {
    /// Role that owns the destination slot
    pub role: ServiceRole,
    pub pid: u32,
    pub message: Message,
}

/// Hasil keputusan routing untuk satu pesan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Registered {
        role: ServiceRole,
        pid: u32,
        accepted: bool,
    },
    Forward(Forward),
    /// Destination role has no live holder; request dropped
    NoDestination(ServiceRole),
    Ignored,
}

/// Hasil lengkap pemrosesan satu datagram
#[derive(Debug)]
pub enum Dispatch {
    Rejected(DecodeError),
    Registered {
        role: ServiceRole,
        pid: u32,
        accepted: bool,
    },
    Forwarded(Forward),
    NoDestination(ServiceRole),
    /// Send failed and the destination slot was evicted
    SendFailed {
        role: ServiceRole,
        pid: u32,
        error: io::Error,
    },
    Ignored,
}

/// Router milik relay; memegang registry secara eksklusif
#[derive(Debug)]
pub struct Router<L> {
    registry: RoleRegistry<L>,
}

impl<L: Liveness> Router<L> {
    /// Router dengan registry kosong
    pub fn new(liveness: L) -> Self {
        Self {
            registry: RoleRegistry::new(liveness),
        }
    }

    pub fn registry(&self) -> &RoleRegistry<L> {
        &self.registry
    }

    /// Decide what to do with one decoded message.
    ///
    /// Mutates the registry (registration, check-and-evict lookup) but sends
    /// nothing.
    pub fn route(&mut self, msg: &Message) -> Route {
        let sender = match msg.origin {
            Origin::Role(role) => role,
            Origin::Relay => return Route::Ignored,
        };

        match (sender, msg.payload) {
            (role, Payload::Service(info)) => Route::Registered {
                role,
                pid: info.process_id,
                accepted: self.registry.register(role, info.process_id),
            },
            (ServiceRole::DiskQueryClient, Payload::Disk(_)) => {
                self.forward_query(ResourceKind::Disk)
            }
            (ServiceRole::MemoryQueryClient, Payload::Memory(_)) => {
                self.forward_query(ResourceKind::Memory)
            }
            (ServiceRole::ResourceProvider, Payload::Disk(info)) => self.forward_to(
                ServiceRole::DiskQueryClient,
                Message::new(Origin::Relay, Payload::Disk(info)),
            ),
            (ServiceRole::ResourceProvider, Payload::Memory(info)) => self.forward_to(
                ServiceRole::MemoryQueryClient,
                Message::new(Origin::Relay, Payload::Memory(info)),
            ),
            _ => Route::Ignored,
        }
    }

    /// Decode, route, send; evict the destination if the send fails
    pub fn dispatch<T: Transport>(&mut self, datagram: &[u8], transport: &mut T) -> Dispatch {
        let msg = match decode(datagram) {
            Ok(msg) => msg,
            Err(e) => return Dispatch::Rejected(e),
        };

        match self.route(&msg) {
            Route::Registered {
                role,
                pid,
                accepted,
            } => Dispatch::Registered {
                role,
                pid,
                accepted,
            },
            Route::Forward(fwd) => match transport.send_to(fwd.pid, &encode(&fwd.message)) {
                Ok(()) => Dispatch::Forwarded(fwd),
                Err(error) => {
                    self.registry.evict(fwd.role);
                    Dispatch::SendFailed {
                        role: fwd.role,
                        pid: fwd.pid,
                        error,
                    }
                }
            },
            Route::NoDestination(role) => Dispatch::NoDestination(role),
            Route::Ignored => Dispatch::Ignored,
        }
    }

    /// Query ke provider tidak membawa data; hanya trigger
    fn forward_query(&mut self, kind: ResourceKind) -> Route {
        match Message::query(Origin::Relay, kind) {
            Some(query) => self.forward_to(ServiceRole::ResourceProvider, query),
            None => Route::Ignored,
        }
    }

    fn forward_to(&mut self, role: ServiceRole, message: Message) -> Route {
        match self.registry.lookup_live(role) {
            Some(pid) => Route::Forward(Forward { role, pid, message }),
            None => Route::NoDestination(role),
        }
    }
}
