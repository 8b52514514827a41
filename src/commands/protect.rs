//! Protect command

use c3flash_core::flash::SerialFlash;
use c3flash_core::protect::{Persistence, ProtectionProfile};
use c3flash_core::transport::Transport;

use crate::cli::ProfileArg;

impl From<ProfileArg> for ProtectionProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::All => ProtectionProfile::All,
            ProfileArg::None => ProtectionProfile::None,
            ProfileArg::NotPrefs => ProtectionProfile::NotPrefs,
        }
    }
}

/// Apply a protection profile
pub fn run_protect<T: Transport>(
    flash: &mut SerialFlash<T>,
    profile: ProfileArg,
    permanent: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = ProtectionProfile::from(profile);
    let persistence = if permanent {
        Persistence::Permanent
    } else {
        Persistence::Temporary
    };

    if !permanent {
        log::warn!("Temporary protection only lasts until the chip loses power");
    }

    flash.set_protection(profile, persistence)?;
    let regs = flash.status_registers()?;
    println!(
        "Protection set to {} ({}), protected: {}",
        profile,
        persistence,
        regs.protected_range()
    );
    Ok(())
}
