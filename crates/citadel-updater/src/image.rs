//! The whole-flash image file and what little we read out of it.

use std::{fs, path::Path};

use crate::{Result, err::Error};

/* Citadel flash geometry. The flash is two 256 KiB halves; each half
 * starts with a 16 KiB RO bootloader slot followed by its RW slot. */
pub const CHIP_FLASH_BASE: u32 = 0x40000;
pub const CHIP_FLASH_SIZE: usize = 512 * 1024;
pub const CHIP_FLASH_BANK_SIZE: usize = 2048;

pub const CHIP_RO_A_MEM_OFF: u32 = 0x00000;
pub const CHIP_RW_A_MEM_OFF: u32 = 0x04000;
pub const CHIP_RO_B_MEM_OFF: u32 = 0x40000;
pub const CHIP_RW_B_MEM_OFF: u32 = 0x44000;

/* Each slot begins with a signed header; the only field the updater
 * needs is image_size, which sits after the magic, the signature, the
 * image checksum, the tag and the public key. */
pub const HEADER_IMAGE_SIZE_OFF: usize = 808;

/// A full flash image: all four firmware components at their final
/// offsets. The only validation on load is the exact length.
pub struct Image {
    data: Vec<u8>,
}

impl Image {
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::try_from(fs::read(path)?)
    }

    /// The span the signed header at `region` says its slot occupies,
    /// checked against the region bounds so a garbage header can't send
    /// the updater off the end of the image.
    pub fn image_size_at(&self, region: u32) -> Result<u32> {
        let at = region as usize + HEADER_IMAGE_SIZE_OFF;
        let size = u32::from_le_bytes(self.data[at..at + 4].try_into().unwrap());
        if size as usize > CHIP_FLASH_SIZE - region as usize {
            return Err(Error::BadHeader {
                offset: region,
                size,
            });
        }
        Ok(size)
    }

    /// One flash bank's worth of image data.
    pub fn bank_at(&self, offset: u32) -> [u8; CHIP_FLASH_BANK_SIZE] {
        let at = offset as usize;
        self.data[at..at + CHIP_FLASH_BANK_SIZE].try_into().unwrap()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl TryFrom<Vec<u8>> for Image {
    type Error = Error;

    fn try_from(data: Vec<u8>) -> Result<Self> {
        if data.len() != CHIP_FLASH_SIZE {
            return Err(Error::ImageSize(data.len()));
        }
        Ok(Self { data })
    }
}
