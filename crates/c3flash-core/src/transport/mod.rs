//! Bit-serial transport
//!
//! The flash sits on six GPIOs: CS, SCK and four data lines IO0-IO3. In
//! single lane mode IO0 is MOSI and IO1 is MISO, and IO2/IO3 are held high
//! as WP#/HOLD#. In the quad modes all four data lines switch direction
//! together, either driven by the host (`QuadWrite`) or by the chip
//! (`QuadRead`).
//!
//! ## Layers
//!
//! - [`Transport`] is the raw pin capability a board, bench rig or simulator
//!   implements. It has no error signalling; timing is the caller's job.
//! - [`bitbang`] turns pin wiggles into MSB-first bytes and nibbles.
//! - [`Bus`] owns the transport, tracks the lane mode, and hands out
//!   [`Transaction`] guards that always deselect on drop.

pub mod bitbang;
mod bus;

pub use bus::{Bus, Transaction};

/// Direction and width of the data lines
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LaneMode {
    /// IO0 output (MOSI), IO1 input (MISO), IO2/IO3 driven high
    #[default]
    Single,
    /// IO0-IO3 are outputs; one nibble per clock towards the chip
    QuadWrite,
    /// IO0-IO3 are inputs; one nibble per clock from the chip
    QuadRead,
}

/// Low-level pin access to the flash bus
///
/// Implementations only move pins; they never fail. Sampling a line the
/// host is currently driving returns whatever the pin reads back, which is
/// why [`Bus`] refuses to do it.
pub trait Transport {
    /// Set chip select (CS is active low, so `active=true` means CS=0)
    fn set_cs(&mut self, active: bool);

    /// Set clock line value
    fn set_sck(&mut self, high: bool);

    /// Set IO0/MOSI (single lane output)
    fn set_mosi(&mut self, high: bool);

    /// Get IO1/MISO (single lane input)
    fn get_miso(&self) -> bool;

    /// Reconfigure data line directions
    fn set_lane_mode(&mut self, mode: LaneMode);

    /// Drive IO0-IO3: bit 0 goes to IO0, bit 3 to IO3
    fn set_quad_io(&mut self, nibble: u8);

    /// Read IO0-IO3: bit 0 from IO0, bit 3 from IO3
    fn get_quad_io(&self) -> u8;

    /// Delay for half a clock period
    fn half_period_delay(&self) {}

    /// Block for the specified number of microseconds
    fn delay_us(&mut self, us: u32);

    /// Optional: Set SCK and MOSI together
    ///
    /// Default implementation calls `set_sck` then `set_mosi`.
    fn set_sck_set_mosi(&mut self, sck: bool, mosi: bool) {
        self.set_sck(sck);
        self.set_mosi(mosi);
    }

    /// Optional: Set SCK and sample MISO
    ///
    /// Default implementation calls `set_sck` then `get_miso`.
    fn set_sck_get_miso(&mut self, sck: bool) -> bool {
        self.set_sck(sck);
        self.get_miso()
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn set_cs(&mut self, active: bool) {
        (**self).set_cs(active)
    }

    fn set_sck(&mut self, high: bool) {
        (**self).set_sck(high)
    }

    fn set_mosi(&mut self, high: bool) {
        (**self).set_mosi(high)
    }

    fn get_miso(&self) -> bool {
        (**self).get_miso()
    }

    fn set_lane_mode(&mut self, mode: LaneMode) {
        (**self).set_lane_mode(mode)
    }

    fn set_quad_io(&mut self, nibble: u8) {
        (**self).set_quad_io(nibble)
    }

    fn get_quad_io(&self) -> u8 {
        (**self).get_quad_io()
    }

    fn half_period_delay(&self) {
        (**self).half_period_delay()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn set_sck_set_mosi(&mut self, sck: bool, mosi: bool) {
        (**self).set_sck_set_mosi(sck, mosi)
    }

    fn set_sck_get_miso(&mut self, sck: bool) -> bool {
        (**self).set_sck_get_miso(sck)
    }
}
