//! The status record the device serves while a call is in flight.
//!
//! Two framings exist on the wire. The current one leads with a magic word
//! and protects itself with a CRC; the legacy one is just the raw status
//! and reply length. Both share their leading bytes, so a single datagram
//! read is interpreted by looking for the magic.

use derive_more::IsVariant;
use thiserror::Error as TError;

use crate::crc16::crc16;

pub const TRANSPORT_STATUS_MAGIC: u32 = 0xcafe_d00d;
pub const TRANSPORT_V1: u16 = 1;

/// Wire size of the current status record; always requested, even from
/// legacy devices, which only fill the front of it.
pub const STATUS_WIRE_SIZE: usize = 16;

#[derive(Debug, TError, Clone, Copy, PartialEq, Eq)]
pub enum StatusError {
    /// Bit error in transit; worth re-reading
    #[error("status CRC mismatch: theirs={theirs:04x} ours={ours:04x}")]
    Crc { theirs: u16, ours: u16 },

    /// The device speaks a framing we don't
    #[error("don't recognise transport version: {0}")]
    Version(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
pub enum TransportVersion {
    Legacy,
    V1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportStatus {
    pub version: TransportVersion,
    pub status: u32,
    pub reply_len: u16,
    /// CRC-16 of the reply bytes; only meaningful for [`TransportVersion::V1`]
    pub reply_crc: u16,
}

impl TransportStatus {
    /// Interpret a raw status datagram, deciding the framing by magic.
    pub fn parse(raw: &[u8; STATUS_WIRE_SIZE]) -> Result<Self, StatusError> {
        let magic = u32::from_le_bytes(raw[0..4].try_into().unwrap());
        if magic != TRANSPORT_STATUS_MAGIC {
            return Ok(Self {
                version: TransportVersion::Legacy,
                status: u32::from_le_bytes(raw[0..4].try_into().unwrap()),
                reply_len: u16::from_le_bytes(raw[4..6].try_into().unwrap()),
                reply_crc: 0,
            });
        }

        let version = u16::from_le_bytes(raw[4..6].try_into().unwrap());
        let theirs = u16::from_le_bytes(raw[6..8].try_into().unwrap());
        let mut zeroed = *raw;
        zeroed[6..8].fill(0);
        let ours = crc16(&zeroed);
        if theirs != ours {
            return Err(StatusError::Crc { theirs, ours });
        }

        if version != TRANSPORT_V1 {
            return Err(StatusError::Version(version));
        }

        Ok(Self {
            version: TransportVersion::V1,
            status: u32::from_le_bytes(raw[8..12].try_into().unwrap()),
            reply_len: u16::from_le_bytes(raw[12..14].try_into().unwrap()),
            reply_crc: u16::from_le_bytes(raw[14..16].try_into().unwrap()),
        })
    }

    /// The device side of [`parse`](Self::parse). The driver never sends a
    /// status record; the chip emulators in this workspace's tests do.
    pub fn to_wire(&self) -> [u8; STATUS_WIRE_SIZE] {
        let mut raw = [0u8; STATUS_WIRE_SIZE];
        match self.version {
            TransportVersion::Legacy => {
                raw[0..4].copy_from_slice(&self.status.to_le_bytes());
                raw[4..6].copy_from_slice(&self.reply_len.to_le_bytes());
            }
            TransportVersion::V1 => {
                raw[0..4].copy_from_slice(&TRANSPORT_STATUS_MAGIC.to_le_bytes());
                raw[4..6].copy_from_slice(&TRANSPORT_V1.to_le_bytes());
                raw[8..12].copy_from_slice(&self.status.to_le_bytes());
                raw[12..14].copy_from_slice(&self.reply_len.to_le_bytes());
                raw[14..16].copy_from_slice(&self.reply_crc.to_le_bytes());
                let crc = crc16(&raw);
                raw[6..8].copy_from_slice(&crc.to_le_bytes());
            }
        }
        raw
    }
}
