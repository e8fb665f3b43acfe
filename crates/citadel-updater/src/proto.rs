//! Wire records and call parameters of the chip's management app.

use bincode::Encode;
use sha1::{Digest, Sha1};

use nos_transport::APP_SPECIFIC_ERROR;

use crate::image::CHIP_FLASH_BANK_SIZE;

/* Call parameters */
pub const NUGGET_PARAM_VERSION: u16 = 0x0000;
pub const NUGGET_PARAM_FLASH_BLOCK: u16 = 0x0001;
pub const NUGGET_PARAM_REBOOT: u16 = 0x0002;
pub const NUGGET_PARAM_ENABLE_UPDATE: u16 = 0x0003;
pub const NUGGET_PARAM_CHANGE_UPDATE_PASSWORD: u16 = 0x0004;
pub const NUGGET_PARAM_NUKE_FROM_ORBIT: u16 = 0x0005;

/* App-specific errors */
pub const NUGGET_ERROR_LOCKED: u32 = APP_SPECIFIC_ERROR;
pub const NUGGET_ERROR_RETRY: u32 = APP_SPECIFIC_ERROR + 1;

/* Which headers an enable call applies to */
pub const NUGGET_UPDATE_HEADER_RO: u8 = 0x01;
pub const NUGGET_UPDATE_HEADER_RW: u8 = 0x02;

pub const NUGGET_UPDATE_PASSWORD_LEN: usize = 32;

/// First 4 bytes of a SHA-1, the way the chip consumes them.
fn digest32(hasher: Sha1) -> u32 {
    let digest = hasher.finalize();
    u32::from_le_bytes(digest[..4].try_into().unwrap())
}

/// One bank's worth of flash, integrity-tagged. The digest covers the
/// record from `offset` on.
#[derive(Encode)]
pub struct FlashBlock {
    pub block_digest: u32,
    pub offset: u32,
    pub payload: [u8; CHIP_FLASH_BANK_SIZE],
}

impl FlashBlock {
    pub fn new(offset: u32, payload: [u8; CHIP_FLASH_BANK_SIZE]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(offset.to_le_bytes());
        hasher.update(payload);
        Self {
            block_digest: digest32(hasher),
            offset,
            payload,
        }
    }
}

/// The update password as the chip stores it: a fixed buffer padded with
/// `0xff`, tagged with the digest of the padded buffer. No password at
/// all is the all-`0xff` buffer, digested the same way.
#[derive(Encode, Clone, Copy)]
pub struct Password {
    pub password: [u8; NUGGET_UPDATE_PASSWORD_LEN],
    pub digest: u32,
}

impl Password {
    pub fn new(clear: Option<&str>) -> Self {
        let mut password = [0xffu8; NUGGET_UPDATE_PASSWORD_LEN];
        if let Some(clear) = clear {
            let bytes = clear.as_bytes();
            let n = bytes.len().min(NUGGET_UPDATE_PASSWORD_LEN);
            password[..n].copy_from_slice(&bytes[..n]);
        }

        let mut hasher = Sha1::new();
        hasher.update(password);
        Self {
            password,
            digest: digest32(hasher),
        }
    }
}

#[derive(Encode)]
pub struct ChangePassword {
    pub old_password: Password,
    pub new_password: Password,
}

#[derive(Encode)]
pub struct EnableUpdate {
    pub password: Password,
    pub which_headers: u8,
}
