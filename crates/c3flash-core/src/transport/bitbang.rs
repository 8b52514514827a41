//! Bitbang helpers
//!
//! Standalone functions that clock bytes over any [`Transport`]. The bus
//! idles with SCK high; every pulse drives SCK low, lets the lines settle,
//! then raises it again. The chip latches input and presents output on the
//! rising edge, so outputs are set while SCK is low and inputs are sampled
//! after it goes high.
//!
//! These do not check the lane mode. [`super::Transaction`] wraps them with
//! the checks.

use super::Transport;

/// Single-lane helpers, one bit per clock, MSB first
pub mod single {
    use super::Transport;

    /// Write a byte on IO0
    pub fn write_byte<T: Transport + ?Sized>(bus: &mut T, byte: u8) {
        for i in (0..8).rev() {
            let bit = (byte >> i) & 1 != 0;
            bus.set_sck_set_mosi(false, bit);
            bus.half_period_delay();
            bus.set_sck(true);
            bus.half_period_delay();
        }
    }

    /// Read a byte from IO1
    pub fn read_byte<T: Transport + ?Sized>(bus: &mut T) -> u8 {
        let mut byte = 0u8;
        for _ in 0..8 {
            bus.set_sck(false);
            bus.half_period_delay();
            byte <<= 1;
            if bus.set_sck_get_miso(true) {
                byte |= 1;
            }
            bus.half_period_delay();
        }
        byte
    }

    /// Write multiple bytes
    pub fn write_bytes<T: Transport + ?Sized>(bus: &mut T, bytes: &[u8]) {
        for &byte in bytes {
            write_byte(bus, byte);
        }
    }

    /// Read multiple bytes
    pub fn read_bytes<T: Transport + ?Sized>(bus: &mut T, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = read_byte(bus);
        }
    }
}

/// Quad-lane helpers, one nibble per clock, high nibble first
pub mod quad {
    use super::Transport;

    /// Drive one nibble and clock it
    pub fn write_nibble<T: Transport + ?Sized>(bus: &mut T, nibble: u8) {
        bus.set_sck(false);
        bus.set_quad_io(nibble & 0xF);
        bus.half_period_delay();
        bus.set_sck(true);
        bus.half_period_delay();
    }

    /// Clock one nibble in
    pub fn read_nibble<T: Transport + ?Sized>(bus: &mut T) -> u8 {
        bus.set_sck(false);
        bus.half_period_delay();
        bus.set_sck(true);
        let nibble = bus.get_quad_io() & 0xF;
        bus.half_period_delay();
        nibble
    }

    /// Write a byte in two clocks
    pub fn write_byte<T: Transport + ?Sized>(bus: &mut T, byte: u8) {
        write_nibble(bus, byte >> 4);
        write_nibble(bus, byte & 0xF);
    }

    /// Read a byte in two clocks
    pub fn read_byte<T: Transport + ?Sized>(bus: &mut T) -> u8 {
        let high = read_nibble(bus);
        let low = read_nibble(bus);
        (high << 4) | low
    }

    /// Write multiple bytes
    pub fn write_bytes<T: Transport + ?Sized>(bus: &mut T, bytes: &[u8]) {
        for &byte in bytes {
            write_byte(bus, byte);
        }
    }

    /// Read multiple bytes
    pub fn read_bytes<T: Transport + ?Sized>(bus: &mut T, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = read_byte(bus);
        }
    }
}
