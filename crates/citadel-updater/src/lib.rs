//! Citadel firmware updater.
//!
//! Loads a whole-flash image, connects to the chip over the datagram bus
//! and drives the management app: version queries, RO/RW slot updates
//! with per-block integrity digests, password changes, update enabling,
//! reboots and the last-resort secret erase.

use std::process::ExitCode;

use colored::Colorize;

use nos_client::{AppClient, NuggetClient};
use nos_transport::APP_ID_NUGGET;

use crate::{cli::Cli, err::Error, image::Image};

pub mod cli;
pub mod commands;
pub mod err;
pub mod image;
pub mod logging;
pub mod proto;

pub use nos_transport::wire_config;

pub type Result<T> = core::result::Result<T, Error>;

/// An action's failure, paired with the exit code it maps to.
pub type Failure = (u8, Error);

pub fn run(cli: Cli) -> ExitCode {
    if !cli.has_action() {
        use clap::CommandFactory;
        let _ = Cli::command().print_long_help();
        return ExitCode::SUCCESS;
    }

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err((code, e)) => {
            eprintln!("ERROR: {e}");
            ExitCode::from(code)
        }
    }
}

fn execute(cli: Cli) -> core::result::Result<(), Failure> {
    let image = match (cli.ro || cli.rw, &cli.image) {
        (false, _) => None,
        (true, None) => return Err((1, Error::MissingImage)),
        (true, Some(path)) => Some(Image::from_file(path).map_err(|e| (1, e))?),
    };

    if cli.change_pw && (cli.old_pw.is_none() || cli.new_pw.is_none()) {
        return Err((1, Error::MissingPassword));
    }
    if (cli.enable_ro || cli.enable_rw) && cli.newest_password().is_none() {
        return Err((1, Error::MissingPassword));
    }

    let mut client = NuggetClient::new(cli.device.clone());
    crate::log!("Connecting to Citadel... ");
    crate::status!(client.open()).map_err(|e| (1, Error::from(e)))?;

    update_to_image(&mut client, &cli, image.as_ref())
}

/// Run the requested actions in a sensible order, stopping at the first
/// failure. Each action owns a distinct exit code so scripts can tell
/// them apart.
pub fn update_to_image(
    client: &mut NuggetClient,
    cli: &Cli,
    image: Option<&Image>,
) -> core::result::Result<(), Failure> {
    let mut app = AppClient::new(client, APP_ID_NUGGET);

    /* A requested erase preempts every other action */
    if let Some(code) = cli.erase {
        return commands::do_erase(&mut app, code).map_err(|e| (1, e));
    }

    if cli.version {
        commands::do_version(&mut app).map_err(|e| (2, e))?;
    }

    if cli.rw {
        let image = image.ok_or((1, Error::MissingImage))?;
        commands::do_update(
            &mut app,
            image,
            image::CHIP_RW_A_MEM_OFF,
            image::CHIP_RW_B_MEM_OFF,
        )
        .map_err(|e| (3, e))?;
    }

    if cli.ro {
        let image = image.ok_or((1, Error::MissingImage))?;
        commands::do_update(
            &mut app,
            image,
            image::CHIP_RO_A_MEM_OFF,
            image::CHIP_RO_B_MEM_OFF,
        )
        .map_err(|e| (4, e))?;
    }

    if cli.change_pw {
        commands::do_change_pw(&mut app, cli.old_pw.as_deref(), cli.new_pw.as_deref())
            .map_err(|e| (5, e))?;
    }

    if cli.enable_ro || cli.enable_rw {
        let mut which = 0u8;
        if cli.enable_ro {
            which |= proto::NUGGET_UPDATE_HEADER_RO;
        }
        if cli.enable_rw {
            which |= proto::NUGGET_UPDATE_HEADER_RW;
        }
        commands::do_enable(&mut app, cli.newest_password(), which).map_err(|e| (6, e))?;
    }

    if let Some(mode) = cli.reboot {
        commands::do_reboot(&mut app, mode).map_err(|e| (7, e))?;
    }

    Ok(())
}
