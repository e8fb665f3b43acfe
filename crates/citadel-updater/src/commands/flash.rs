use colored::Colorize;

use nos_client::AppClient;
use nos_transport::APP_SUCCESS;

use crate::{
    Result, err::Error,
    image::{CHIP_FLASH_BANK_SIZE, CHIP_FLASH_BASE, Image},
    log,
    proto::{FlashBlock, NUGGET_ERROR_LOCKED, NUGGET_ERROR_RETRY, NUGGET_PARAM_FLASH_BLOCK},
    wire_config,
};

/// Extra attempts to grant a block when the chip asks for patience
const BLOCK_RETRIES: u32 = 3;

/// Write one slot's span of banks, bailing out on the first block the
/// chip refuses.
fn try_update(app: &mut AppClient<'_>, image: &Image, region: u32) -> Result<()> {
    let image_size = image.image_size_at(region)?;
    let stop = region + image_size;

    println!(
        "Updating image from 0x{:05x} to 0x{:05x}, size 0x{:05x}",
        CHIP_FLASH_BASE + region,
        CHIP_FLASH_BASE + stop,
        image_size
    );

    let mut offset = region;
    while offset < stop {
        let block = FlashBlock::new(offset, image.bank_at(offset));
        let request = bincode::encode_to_vec(&block, wire_config())?;

        log!(
            "writing 0x{:05x} / 0x{:05x}",
            CHIP_FLASH_BASE + offset,
            CHIP_FLASH_BASE + stop
        );

        let mut retries = BLOCK_RETRIES;
        let code = loop {
            let (code, _) = app.call(NUGGET_PARAM_FLASH_BLOCK, &request, 0);
            if code == NUGGET_ERROR_RETRY && retries > 0 {
                retries -= 1;
                log!(" retrying");
                continue;
            }
            break code;
        };

        if code != APP_SUCCESS {
            println!(" {}", "fail".red());
            return Err(if code == NUGGET_ERROR_LOCKED {
                Error::Locked
            } else {
                Error::App { code }
            });
        }
        println!(" {}", "ok".green());

        offset += CHIP_FLASH_BANK_SIZE as u32;
    }

    Ok(())
}

/// Update one stage of firmware. The chip write-protects whichever slot
/// is running, so try A and fall back to B; the updater never needs to
/// know which one is active. If both refuse, the B failure is the one
/// reported.
pub fn do_update(
    app: &mut AppClient<'_>,
    image: &Image,
    offset_a: u32,
    offset_b: u32,
) -> Result<()> {
    match try_update(app, image, offset_a) {
        Ok(()) => Ok(()),
        Err(e) => {
            println!("Slot A not updated ({e}); trying slot B");
            try_update(app, image, offset_b)
        }
    }
}
