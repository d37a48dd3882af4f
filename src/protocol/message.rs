//! Fixed-Size Message Format
//!
//! Layout (40 bytes, little-endian):
//! ┌──────────────────────────────────────────────────────┐
//! │ origin signature (4) │ resource kind (4)             │
//! │ flags (4)            │ reserved, zero (4)            │
//! ├──────────────────────────────────────────────────────┤
//! │ Payload (24 bytes, zero-padded)                      │
//! │   Disk/Memory: total (8) │ free (8) │ zero (8)       │
//! │   Service:     pid (4)   │ host text (16) │ zero (4) │
//! └──────────────────────────────────────────────────────┘
//!
//! Setiap pesan selalu berukuran sama; tidak ada field variable-length.

use std::fmt;

/// Total ukuran satu pesan di wire
pub const MESSAGE_SIZE: usize = 40;
/// Ukuran header (signature, kind, flags, reserved)
pub const HEADER_SIZE: usize = 16;
/// Ukuran area payload
pub const PAYLOAD_SIZE: usize = MESSAGE_SIZE - HEADER_SIZE;
/// Panjang maksimum teks host address
pub const HOST_ADDRESS_LEN: usize = 16;

/// Host text announced by every watcher
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Signature pesan yang dibuat oleh relay sendiri
pub const RELAY_SIGNATURE: u32 = 0x0000_0000;
/// Signature resource watcher (RW)
pub const PROVIDER_SIGNATURE: u32 = 0xA5A5_A5A5;
/// Signature disk watcher (DW)
pub const DISK_CLIENT_SIGNATURE: u32 = 0x1010_1010;
/// Signature memory watcher (MW)
pub const MEMORY_CLIENT_SIGNATURE: u32 = 0x1100_1100;

/// Jenis resource yang dibawa pesan
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Invalid = 0,
    Disk = 1,
    Memory = 2,
    ServiceAnnouncement = 3,
}

impl ResourceKind {
    #[inline(always)]
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Invalid),
            1 => Some(Self::Disk),
            2 => Some(Self::Memory),
            3 => Some(Self::ServiceAnnouncement),
            _ => None,
        }
    }
}

/// One of the three fixed watcher roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceRole {
    /// DW: asks for disk usage
    DiskQueryClient,
    /// MW: asks for memory usage
    MemoryQueryClient,
    /// RW: measures and answers
    ResourceProvider,
}

impl ServiceRole {
    pub const ALL: [ServiceRole; 3] = [
        ServiceRole::DiskQueryClient,
        ServiceRole::MemoryQueryClient,
        ServiceRole::ResourceProvider,
    ];

    #[inline(always)]
    pub fn signature(self) -> u32 {
        match self {
            Self::DiskQueryClient => DISK_CLIENT_SIGNATURE,
            Self::MemoryQueryClient => MEMORY_CLIENT_SIGNATURE,
            Self::ResourceProvider => PROVIDER_SIGNATURE,
        }
    }

    /// Slot index inside the role registry
    #[inline(always)]
    pub(crate) fn index(self) -> usize {
        match self {
            Self::DiskQueryClient => 0,
            Self::MemoryQueryClient => 1,
            Self::ResourceProvider => 2,
        }
    }

    /// Short tag used in logs
    pub fn tag(self) -> &'static str {
        match self {
            Self::DiskQueryClient => "DW",
            Self::MemoryQueryClient => "MW",
            Self::ResourceProvider => "RW",
        }
    }
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Pengirim pesan: salah satu role, atau relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Relay,
    Role(ServiceRole),
}

impl Origin {
    #[inline(always)]
    pub fn signature(self) -> u32 {
        match self {
            Self::Relay => RELAY_SIGNATURE,
            Self::Role(role) => role.signature(),
        }
    }

    #[inline(always)]
    pub fn from_signature(sig: u32) -> Option<Self> {
        match sig {
            RELAY_SIGNATURE => Some(Self::Relay),
            PROVIDER_SIGNATURE => Some(Self::Role(ServiceRole::ResourceProvider)),
            DISK_CLIENT_SIGNATURE => Some(Self::Role(ServiceRole::DiskQueryClient)),
            MEMORY_CLIENT_SIGNATURE => Some(Self::Role(ServiceRole::MemoryQueryClient)),
            _ => None,
        }
    }
}

/// Total and free bytes of one resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceInfo {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

impl ResourceInfo {
    pub fn new(total_bytes: u64, free_bytes: u64) -> Self {
        Self {
            total_bytes,
            free_bytes,
        }
    }
}

/// Host address text, selalu 16 byte dan zero-padded
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HostAddress([u8; HOST_ADDRESS_LEN]);

impl HostAddress {
    /// Text longer than 16 bytes is cut at the last char boundary that fits.
    pub fn new(text: &str) -> Self {
        let mut end = text.len().min(HOST_ADDRESS_LEN);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let mut raw = [0u8; HOST_ADDRESS_LEN];
        raw[..end].copy_from_slice(&text.as_bytes()[..end]);
        Self(raw)
    }

    #[inline(always)]
    pub fn from_raw(raw: [u8; HOST_ADDRESS_LEN]) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub fn as_raw(&self) -> &[u8; HOST_ADDRESS_LEN] {
        &self.0
    }

    /// Text up to the first NUL. Invalid UTF-8 yields the valid prefix.
    pub fn as_str(&self) -> &str {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(HOST_ADDRESS_LEN);
        match std::str::from_utf8(&self.0[..len]) {
            Ok(s) => s,
            Err(e) => std::str::from_utf8(&self.0[..e.valid_up_to()]).unwrap_or_default(),
        }
    }
}

impl fmt::Debug for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostAddress({:?})", self.as_str())
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service announcement payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceInfo {
    pub process_id: u32,
    pub host_address: HostAddress,
}

/// Payload pesan. Kind ditentukan oleh variant, jadi kind dan payload
/// tidak mungkin berbeda.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    Disk(ResourceInfo),
    Memory(ResourceInfo),
    Service(ServiceInfo),
}

impl Payload {
    #[inline(always)]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Disk(_) => ResourceKind::Disk,
            Self::Memory(_) => ResourceKind::Memory,
            Self::Service(_) => ResourceKind::ServiceAnnouncement,
        }
    }
}

/// Satu-satunya unit komunikasi antara watcher dan relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub origin: Origin,
    /// Reserved, selalu nol untuk pesan yang dibuat crate ini
    pub flags: u32,
    pub payload: Payload,
}

impl Message {
    #[inline(always)]
    pub fn new(origin: Origin, payload: Payload) -> Self {
        Self {
            origin,
            flags: 0,
            payload,
        }
    }

    /// Registration message carrying the sender's process id
    pub fn announcement(role: ServiceRole, process_id: u32, host: &str) -> Self {
        Self::new(
            Origin::Role(role),
            Payload::Service(ServiceInfo {
                process_id,
                host_address: HostAddress::new(host),
            }),
        )
    }

    /// Query with an empty payload. Hanya Disk dan Memory yang punya query.
    pub fn query(origin: Origin, kind: ResourceKind) -> Option<Self> {
        let payload = match kind {
            ResourceKind::Disk => Payload::Disk(ResourceInfo::default()),
            ResourceKind::Memory => Payload::Memory(ResourceInfo::default()),
            _ => return None,
        };
        Some(Self::new(origin, payload))
    }

    #[inline(always)]
    pub fn resource_kind(&self) -> ResourceKind {
        self.payload.kind()
    }
}
