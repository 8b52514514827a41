//! Flash write protection
//!
//! The W25Q80BV guards address ranges through the block protect bits of its
//! status registers. Three fixed profiles cover everything the oven needs:
//!
//! - [`ProtectionProfile::All`] during normal operation
//! - [`ProtectionProfile::NotPrefs`] while preferences or profiles are
//!   being erased or written
//! - [`ProtectionProfile::None`] after a chip erase, for provisioning
//!
//! A profile can be applied to the volatile registers only
//! ([`Persistence::Temporary`], instant, lost at power off) or to both
//! copies ([`Persistence::Permanent`], about 15 ms). Applying them is the
//! job of [`SerialFlash::set_protection`](crate::flash::SerialFlash::set_protection).

mod ranges;
mod types;

pub use ranges::*;
pub use types::*;
