use nos_client::AppClient;
use nos_transport::APP_SUCCESS;

use crate::{Result, cli::RebootMode, err::Error, proto::NUGGET_PARAM_REBOOT};

pub fn do_reboot(app: &mut AppClient<'_>, mode: RebootMode) -> Result<()> {
    let (code, _) = app.call(NUGGET_PARAM_REBOOT, &[mode as u8], 0);
    if code != APP_SUCCESS {
        return Err(Error::App { code });
    }

    println!(
        "Citadel {} reboot requested",
        if mode.is_hard() { "hard" } else { "soft" }
    );
    Ok(())
}
