pub mod erase;
pub mod flash;
pub mod password;
pub mod reboot;
pub mod version;

pub use erase::do_erase;
pub use flash::do_update;
pub use password::{do_change_pw, do_enable};
pub use reboot::do_reboot;
pub use version::do_version;
