//! Fixed-Size Encoder/Decoder
//!
//! Encode selalu menulis tepat `MESSAGE_SIZE` byte ke array di stack.
//! Decode memvalidasi panjang, signature dan kind sebelum menyentuh payload.

use thiserror::Error;

use super::message::{
    HostAddress, Message, Origin, Payload, ResourceInfo, ResourceKind, ServiceInfo,
    HEADER_SIZE, HOST_ADDRESS_LEN, MESSAGE_SIZE,
};

/// Alasan sebuah datagram ditolak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("datagram is {actual} bytes, expected {expected}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("unknown origin signature {0:#010x}")]
    UnknownOrigin(u32),
    #[error("resource kind {0} has no valid payload")]
    PayloadKindMismatch(u32),
}

/// Encode message ke blok berukuran tetap
///
/// Byte payload yang tidak dipakai selalu nol.
#[inline(always)]
pub fn encode(msg: &Message) -> [u8; MESSAGE_SIZE] {
    let mut buf = [0u8; MESSAGE_SIZE];

    buf[0..4].copy_from_slice(&msg.origin.signature().to_le_bytes());
    buf[4..8].copy_from_slice(&(msg.resource_kind() as u32).to_le_bytes());
    buf[8..12].copy_from_slice(&msg.flags.to_le_bytes());
    // 12..16 reserved

    let p = HEADER_SIZE;
    match msg.payload {
        Payload::Disk(info) | Payload::Memory(info) => {
            buf[p..p + 8].copy_from_slice(&info.total_bytes.to_le_bytes());
            buf[p + 8..p + 16].copy_from_slice(&info.free_bytes.to_le_bytes());
        }
        Payload::Service(info) => {
            buf[p..p + 4].copy_from_slice(&info.process_id.to_le_bytes());
            buf[p + 4..p + 4 + HOST_ADDRESS_LEN].copy_from_slice(info.host_address.as_raw());
        }
    }

    buf
}

/// Decode satu datagram
///
/// Payload hanya dibaca setelah origin dan kind valid.
pub fn decode(buf: &[u8]) -> Result<Message, DecodeError> {
    let buf: &[u8; MESSAGE_SIZE] = buf.try_into().map_err(|_| DecodeError::InvalidLength {
        expected: MESSAGE_SIZE,
        actual: buf.len(),
    })?;

    let sig = read_u32(buf, 0);
    let origin = Origin::from_signature(sig).ok_or(DecodeError::UnknownOrigin(sig))?;

    let raw_kind = read_u32(buf, 4);
    let flags = read_u32(buf, 8);

    let p = HEADER_SIZE;
    let payload = match ResourceKind::from_u32(raw_kind) {
        Some(ResourceKind::Disk) => Payload::Disk(read_resource(buf, p)),
        Some(ResourceKind::Memory) => Payload::Memory(read_resource(buf, p)),
        Some(ResourceKind::ServiceAnnouncement) => {
            let mut host = [0u8; HOST_ADDRESS_LEN];
            host.copy_from_slice(&buf[p + 4..p + 4 + HOST_ADDRESS_LEN]);
            Payload::Service(ServiceInfo {
                process_id: read_u32(buf, p),
                host_address: HostAddress::from_raw(host),
            })
        }
        Some(ResourceKind::Invalid) | None => {
            return Err(DecodeError::PayloadKindMismatch(raw_kind))
        }
    };

    Ok(Message {
        origin,
        flags,
        payload,
    })
}

#[inline(always)]
fn read_u32(buf: &[u8; MESSAGE_SIZE], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(raw)
}

#[inline(always)]
fn read_u64(buf: &[u8; MESSAGE_SIZE], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(raw)
}

#[inline(always)]
fn read_resource(buf: &[u8; MESSAGE_SIZE], at: usize) -> ResourceInfo {
    ResourceInfo::new(read_u64(buf, at), read_u64(buf, at + 8))
}
