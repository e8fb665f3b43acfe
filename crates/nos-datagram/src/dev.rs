use std::{
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use log::debug;

use crate::{Datagram, MAX_DEVICE_TRANSFER, Result, err::Error};

/// Default citadel character device node
pub const DEFAULT_DEVICE: &str = "/dev/citadel0";

/// Direct connection through the kernel citadel driver.
///
/// A write syscall carries the little-endian command word followed by the
/// payload as one datagram. A read posts the bare command word first and
/// then collects the device's datagram. The driver answers `EAGAIN` while
/// the chip is asleep, which maps to [`Error::Asleep`] here so the retry
/// layer can wait it out.
pub struct CharDevice {
    file: File,
    path: PathBuf,
}

impl CharDevice {
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or(Path::new(DEFAULT_DEVICE)).to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        debug!("Opened {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn from_driver(e: std::io::Error) -> Error {
    if e.kind() == ErrorKind::WouldBlock {
        Error::Asleep
    } else {
        Error::Io(e)
    }
}

impl Datagram for CharDevice {
    fn read(&mut self, command: u32, buf: &mut [u8]) -> Result<()> {
        if buf.len() > MAX_DEVICE_TRANSFER {
            return Err(Error::TooLong(buf.len()));
        }

        self.file
            .write_all(&command.to_le_bytes())
            .map_err(from_driver)?;
        self.file.read_exact(buf).map_err(from_driver)
    }

    fn write(&mut self, command: u32, buf: &[u8]) -> Result<()> {
        if buf.len() > MAX_DEVICE_TRANSFER {
            return Err(Error::TooLong(buf.len()));
        }

        let mut datagram = Vec::with_capacity(4 + buf.len());
        datagram.extend_from_slice(&command.to_le_bytes());
        datagram.extend_from_slice(buf);
        self.file.write_all(&datagram).map_err(from_driver)
    }
}
