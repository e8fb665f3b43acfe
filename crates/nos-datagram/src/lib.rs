use std::{thread::sleep, time::Duration};

use log::error;

use crate::err::Error;

pub mod dev;
pub mod err;

pub use dev::CharDevice;

pub type Result<T> = core::result::Result<T, Error>;

/// Most bytes a single datagram can carry in either direction
pub const MAX_DEVICE_TRANSFER: usize = 2044;

/// The chip may take up to ~100ms to wake up
pub const RETRY_COUNT: u32 = 25;
pub const RETRY_WAIT_TIME: Duration = Duration::from_micros(5000);

/// One atomic bus transfer: a 32-bit command word plus a payload of up to
/// [`MAX_DEVICE_TRANSFER`] bytes.
///
/// Implementations sit directly on the bus driver. They report
/// [`Error::Asleep`] when the chip refused the transfer because it is
/// sleeping; everything else is a hard driver failure.
pub trait Datagram {
    /// Read one datagram, filling `buf` completely.
    fn read(&mut self, command: u32, buf: &mut [u8]) -> Result<()>;

    /// Write `buf` as one datagram.
    fn write(&mut self, command: u32, buf: &[u8]) -> Result<()>;
}

/// Retrying wrappers over [`Datagram`], available on every implementation.
///
/// A sleeping chip is given [`RETRY_COUNT`] chances to wake up, with a
/// [`RETRY_WAIT_TIME`] pause after each refusal. Any other driver error
/// surfaces immediately.
pub trait DatagramExt: Datagram {
    fn read_retry(&mut self, command: u32, buf: &mut [u8]) -> Result<()> {
        let mut retries = RETRY_COUNT;
        loop {
            match self.read(command, buf) {
                Err(Error::Asleep) => {
                    retries -= 1;
                    if retries == 0 {
                        return Err(Error::TimedOut);
                    }
                    sleep(RETRY_WAIT_TIME);
                }
                Err(e) => {
                    error!("Failed to read: {e}");
                    return Err(e);
                }
                Ok(()) => return Ok(()),
            }
        }
    }

    fn write_retry(&mut self, command: u32, buf: &[u8]) -> Result<()> {
        let mut retries = RETRY_COUNT;
        loop {
            match self.write(command, buf) {
                Err(Error::Asleep) => {
                    retries -= 1;
                    if retries == 0 {
                        return Err(Error::TimedOut);
                    }
                    sleep(RETRY_WAIT_TIME);
                }
                Err(e) => {
                    error!("Failed to write: {e}");
                    return Err(e);
                }
                Ok(()) => return Ok(()),
            }
        }
    }
}

impl<D: Datagram + ?Sized> DatagramExt for D {}
