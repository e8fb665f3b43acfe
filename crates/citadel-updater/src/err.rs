use thiserror::Error as TError;

use nos_client::status_code_string;

use crate::image::CHIP_FLASH_SIZE;

#[derive(Debug, TError)]
pub enum Error {
    /// The bus handle could not be opened
    #[error("unable to connect: {0}")]
    Connect(#[from] nos_client::err::Error),

    /// The image file is not a whole-flash image
    #[error("the firmware image must be exactly {CHIP_FLASH_SIZE} bytes, not {0}")]
    ImageSize(usize),

    /// The signed header claims an image that overruns its region
    #[error("the header at 0x{offset:05x} claims an impossible image size 0x{size:x}")]
    BadHeader { offset: u32, size: u32 },

    /// The app rejected the call
    #[error("error code 0x{code:x}: {}", status_code_string(*code))]
    App { code: u32 },

    /// The slot holds the active image and is write-protected
    #[error("the slot is locked")]
    Locked,

    /// An image file is required with --ro and --rw
    #[error("an image file is required with --ro and --rw")]
    MissingImage,

    /// Passwords are required with --change_pw and --enable_*
    #[error("a password is required with --change_pw and --enable_ro/--enable_rw")]
    MissingPassword,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// bincode crate error
    #[error("Bincode encode error: {0}")]
    BincodeEncode(#[from] bincode::error::EncodeError),
}
