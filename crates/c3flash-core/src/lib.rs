//! c3flash-core - Storage engine for the Controleo3 serial NOR flash
//!
//! This crate drives the W25Q80BV flash that holds the oven controller's
//! preferences, reflow/bake profiles and UI bitmaps. It is `no_std` and
//! hardware agnostic: everything goes through the [`transport::Transport`]
//! trait, so the same engine runs on the board, on a Linux GPIO bench rig,
//! or against the pin-level simulator in `c3flash-sim`.
//!
//! # Features
//!
//! - `std` - Enable `std::error::Error` and serde derives for host tools
//!
//! # Example
//!
//! ```ignore
//! use c3flash_core::{flash::SerialFlash, protect::{Persistence, ProtectionProfile}};
//!
//! let mut flash = SerialFlash::new(transport);
//! flash.begin()?;
//! flash.verify_chip_identity()?;
//!
//! flash.erase_prefs_block(0)?;
//! flash.allow_writing_to_prefs(true)?;
//! flash.program_page(0, &prefs_page)?;
//! flash.allow_writing_to_prefs(false)?;
//!
//! let mut session = flash.start_read(0, &mut header)?;
//! session.continue_read(&mut body)?;
//! session.end_read();
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod bitmap;
pub mod error;
pub mod flash;
pub mod layout;
pub mod protect;
pub mod protocol;
pub mod spi;
pub mod transport;

pub use error::{Error, Result};
