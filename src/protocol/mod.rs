//! Protocol Layer: Fixed-Size Binary Records
//!
//! Prinsip desain:
//! - Fixed size: setiap pesan tepat 40 byte
//! - Tagged payload: kind diturunkan dari variant payload
//! - No allocation: encode/decode langsung ke/dari array di stack

mod encoder;
mod message;

pub use encoder::{decode, encode, DecodeError};
pub use message::{
    HostAddress, Message, Origin, Payload, ResourceInfo, ResourceKind, ServiceInfo, ServiceRole,
    DISK_CLIENT_SIGNATURE, HEADER_SIZE, HOST_ADDRESS_LEN, LOOPBACK_HOST, MEMORY_CLIENT_SIGNATURE,
    MESSAGE_SIZE, PAYLOAD_SIZE, PROVIDER_SIGNATURE, RELAY_SIGNATURE,
};
