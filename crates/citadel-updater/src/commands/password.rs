use nos_client::AppClient;
use nos_transport::APP_SUCCESS;

use crate::{
    Result, err::Error,
    proto::{
        ChangePassword, EnableUpdate, NUGGET_PARAM_CHANGE_UPDATE_PASSWORD,
        NUGGET_PARAM_ENABLE_UPDATE, Password,
    },
    wire_config,
};

pub fn do_change_pw(app: &mut AppClient<'_>, old: Option<&str>, new: Option<&str>) -> Result<()> {
    let record = ChangePassword {
        old_password: Password::new(old),
        new_password: Password::new(new),
    };
    let request = bincode::encode_to_vec(&record, wire_config())?;

    let (code, _) = app.call(NUGGET_PARAM_CHANGE_UPDATE_PASSWORD, &request, 0);
    if code != APP_SUCCESS {
        return Err(Error::App { code });
    }

    println!("Update password changed");
    Ok(())
}

/// Bless previously written headers so the chip will boot them.
pub fn do_enable(app: &mut AppClient<'_>, password: Option<&str>, which_headers: u8) -> Result<()> {
    let record = EnableUpdate {
        password: Password::new(password),
        which_headers,
    };
    let request = bincode::encode_to_vec(&record, wire_config())?;

    let (code, _) = app.call(NUGGET_PARAM_ENABLE_UPDATE, &request, 0);
    if code != APP_SUCCESS {
        return Err(Error::App { code });
    }

    println!("Update enabled");
    Ok(())
}
