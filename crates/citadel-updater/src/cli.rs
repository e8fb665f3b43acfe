use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use clap_num::maybe_hex;
use derive_more::IsVariant;

const LONG_ABOUT: &str = "\
Citadel firmware boots in two stages. The first stage bootloader (\"RO\")
is provided by the SoC hardware team and seldom changes. The application
image (\"RW\") is invoked by the RO image. There are two copies (A/B) of
each stage, so that the active copy can be protected while the unused
copy is updated. At boot, the newer valid copy of each stage is selected.

The image file is the same size as the internal flash and contains all
four firmware components (RO_A, RW_A, RO_B, RW_B) at their final
offsets. Only the inactive copy (A/B) of each stage (RO/RW) can be
modified; the tool updates the correct copies automatically.

You must specify the actions to perform. With no actions, this help
message is displayed.";

#[derive(Debug, Clone, Copy, Default, ValueEnum, IsVariant)]
#[clap(rename_all = "kebab_case")]
#[repr(u8)]
pub enum RebootMode {
    #[default]
    Soft = 0,
    Hard = 1,
}

#[derive(Parser, Default)]
#[command(about = "Citadel firmware updater", long_about = LONG_ABOUT)]
pub struct Cli {
    /// Display the Citadel version info
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Update RW firmware from the image file
    #[arg(long)]
    pub rw: bool,

    /// Update RO firmware from the image file
    #[arg(long)]
    pub ro: bool,

    /// Tell Citadel to reboot, optionally hard (--reboot=hard)
    #[arg(
        long,
        value_enum,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "soft",
        value_name = "MODE"
    )]
    pub reboot: Option<RebootMode>,

    /// Enable the RO image written by a previous --ro
    #[arg(long = "enable_ro")]
    pub enable_ro: bool,

    /// Enable the RW image written by a previous --rw
    #[arg(long = "enable_rw")]
    pub enable_rw: bool,

    /// Change the update password
    #[arg(long = "change_pw")]
    pub change_pw: bool,

    /// Erase all user secrets and reboot, confirmed by a 32-bit code
    #[arg(long, value_name = "CODE", value_parser = maybe_hex::<u32>)]
    pub erase: Option<u32>,

    /// Device node to talk through
    #[arg(long, value_name = "PATH")]
    pub device: Option<PathBuf>,

    /// Whole-flash image file (required with --ro and --rw)
    pub image: Option<PathBuf>,

    /// Current update password (required with --change_pw and --enable_*)
    pub old_pw: Option<String>,

    /// New update password (required with --change_pw)
    pub new_pw: Option<String>,
}

impl Cli {
    pub fn has_action(&self) -> bool {
        self.version
            || self.rw
            || self.ro
            || self.reboot.is_some()
            || self.enable_ro
            || self.enable_rw
            || self.change_pw
            || self.erase.is_some()
    }

    /// The password to enable images with: the one just set, if any.
    pub fn newest_password(&self) -> Option<&str> {
        self.new_pw.as_deref().or(self.old_pw.as_deref())
    }
}
