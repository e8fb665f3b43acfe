use thiserror::Error as TError;

use crate::status::StatusError;

/// Internal failure modes of a call. All of them collapse to
/// `APP_ERROR_IO` at the public boundary; the distinctions only steer
/// recovery inside the state machine.
#[derive(Debug, TError)]
pub enum Error {
    /// Bus failure underneath the transport
    #[error(transparent)]
    Datagram(#[from] nos_datagram::err::Error),

    /// Unusable status record (persistent CRC mismatch or alien version)
    #[error(transparent)]
    Status(#[from] StatusError),

    /// Reply CRC stayed wrong through every re-read
    #[error("unable to get valid checksum on reply data")]
    ReplyCrc,

    /// The device ignored a clear and never went idle
    #[error("device is not responding")]
    NotIdle,

    /// bincode crate error
    #[error("Bincode encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),
}
