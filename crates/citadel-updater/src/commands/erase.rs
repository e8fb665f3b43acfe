use nos_client::AppClient;
use nos_transport::APP_SUCCESS;

use crate::{Result, err::Error, proto::NUGGET_PARAM_NUKE_FROM_ORBIT};

/// Ask the chip to wipe every user secret and reboot. The chip judges
/// the confirmation code; we just deliver it.
pub fn do_erase(app: &mut AppClient<'_>, code: u32) -> Result<()> {
    let (status, _) = app.call(NUGGET_PARAM_NUKE_FROM_ORBIT, &code.to_le_bytes(), 0);
    if status != APP_SUCCESS {
        return Err(Error::App { code: status });
    }

    println!("Citadel secrets erased");
    Ok(())
}
