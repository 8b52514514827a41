//! SPI command vocabulary
//!
//! Opcodes, status register bits and the page address encodings used on
//! the wire.

mod address;
pub mod opcodes;

pub use address::{AddressWidth, PageAddress};
pub use opcodes::*;
