use thiserror::Error as TError;

use crate::MAX_DEVICE_TRANSFER;

#[derive(Debug, TError)]
pub enum Error {
    /// The chip is asleep and the driver refused the transfer
    #[error("device is asleep")]
    Asleep,

    /// The chip slept through every wake-up attempt
    #[error("device did not wake up")]
    TimedOut,

    /// More bytes than one datagram can carry
    #[error("datagram of {0} bytes exceeds the {MAX_DEVICE_TRANSFER} byte limit")]
    TooLong(usize),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
