use nos_client::AppClient;
use nos_transport::APP_SUCCESS;

use crate::{Result, err::Error, proto::NUGGET_PARAM_VERSION};

/// Ask the chip for its build string and print it.
pub fn do_version(app: &mut AppClient<'_>) -> Result<()> {
    let (code, reply) = app.call(NUGGET_PARAM_VERSION, &[], 512);
    if code != APP_SUCCESS {
        return Err(Error::App { code });
    }

    println!("{}", String::from_utf8_lossy(&reply).trim_end_matches('\0'));
    Ok(())
}
