//! Watcher roles
//!
//! - [`ReportWatcher`]: DW/MW, kirim query periodik dan terima laporan
//! - [`ResourceWatcher`]: RW, jawab query relay dengan data probe

mod probe;

#[cfg(unix)]
pub use probe::SystemProbe;
pub use probe::{ProbeError, ResourceProbe};

use log::warn;

use crate::protocol::{Message, Origin, Payload, ResourceInfo, ResourceKind, ServiceRole};

/// Query client for one resource kind
///
/// Setiap laporan yang cocok diteruskan ke `sink`.
pub struct ReportWatcher<F> {
    role: ServiceRole,
    kind: ResourceKind,
    sink: F,
    last_report: Option<ResourceInfo>,
    reports: u64,
}

impl<F: FnMut(ResourceKind, ResourceInfo)> ReportWatcher<F> {
    /// Disk watcher (DW)
    pub fn disk(sink: F) -> Self {
        Self::new(ServiceRole::DiskQueryClient, ResourceKind::Disk, sink)
    }

    /// Memory watcher (MW)
    pub fn memory(sink: F) -> Self {
        Self::new(ServiceRole::MemoryQueryClient, ResourceKind::Memory, sink)
    }

    fn new(role: ServiceRole, kind: ResourceKind, sink: F) -> Self {
        Self {
            role,
            kind,
            sink,
            last_report: None,
            reports: 0,
        }
    }

    pub fn last_report(&self) -> Option<ResourceInfo> {
        self.last_report
    }

    pub fn reports(&self) -> u64 {
        self.reports
    }
}

#[cfg(unix)]
impl<F: FnMut(ResourceKind, ResourceInfo)> crate::network::SessionHandler for ReportWatcher<F> {
    fn role(&self) -> ServiceRole {
        self.role
    }

    fn periodic_query(&self) -> Option<ResourceKind> {
        Some(self.kind)
    }

    fn on_message(&mut self, msg: &Message) -> Option<Message> {
        let info = match (self.kind, msg.payload) {
            (ResourceKind::Disk, Payload::Disk(info)) => info,
            (ResourceKind::Memory, Payload::Memory(info)) => info,
            (_, other) => {
                warn!("{} ignoring unexpected {:?} message", self.role, other.kind());
                return None;
            }
        };

        self.last_report = Some(info);
        self.reports += 1;
        (self.sink)(self.kind, info);
        None
    }
}

/// Resource provider (RW)
///
/// Probe error menekan jawaban untuk putaran itu; tidak mengirim nol.
pub struct ResourceWatcher<P> {
    probe: P,
    answered: u64,
    suppressed: u64,
}

impl<P: ResourceProbe> ResourceWatcher<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            answered: 0,
            suppressed: 0,
        }
    }

    pub fn answered(&self) -> u64 {
        self.answered
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Measure the resource a query asks for
    pub fn answer(&mut self, kind: ResourceKind) -> Option<Message> {
        let measured = match kind {
            ResourceKind::Disk => self.probe.measure_disk().map(Payload::Disk),
            ResourceKind::Memory => self.probe.measure_memory().map(Payload::Memory),
            _ => return None,
        };

        match measured {
            Ok(payload) => {
                self.answered += 1;
                Some(Message::new(
                    Origin::Role(ServiceRole::ResourceProvider),
                    payload,
                ))
            }
            Err(e) => {
                self.suppressed += 1;
                warn!("{:?} probe failed, no response this round: {}", kind, e);
                None
            }
        }
    }
}

#[cfg(unix)]
impl<P: ResourceProbe> crate::network::SessionHandler for ResourceWatcher<P> {
    fn role(&self) -> ServiceRole {
        ServiceRole::ResourceProvider
    }

    fn on_message(&mut self, msg: &Message) -> Option<Message> {
        use log::info;

        let reply = self.answer(msg.resource_kind());
        if let Some(Message {
            payload: Payload::Disk(info) | Payload::Memory(info),
            ..
        }) = reply
        {
            info!(
                "answered {:?} query: total={} free={}",
                msg.resource_kind(),
                info.total_bytes,
                info.free_bytes
            );
        }
        reply
    }
}
