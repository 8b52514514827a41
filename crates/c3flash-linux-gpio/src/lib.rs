//! c3flash-linux-gpio - Linux GPIO transport for the Controleo3 flash
//!
//! Bitbangs the W25Q80BV from a Linux board through the GPIO character
//! device interface (gpiocdev), so the engine in `c3flash-core` can be run
//! against a real chip on a bench rig.
//!
//! # Example
//!
//! ```no_run
//! use c3flash_core::flash::SerialFlash;
//! use c3flash_linux_gpio::{LinuxGpioConfig, LinuxGpioTransport};
//!
//! let config = LinuxGpioConfig::new("/dev/gpiochip0", 8, 11, [10, 9, 24, 25]);
//! //                                 device           CS SCK  IO0 IO1 IO2 IO3
//! let mut flash = SerialFlash::new(LinuxGpioTransport::open(&config)?);
//! flash.begin()?;
//! flash.verify_chip_identity()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with the c3flash CLI
//!
//! ```bash
//! c3flash -p linux_gpio:dev=/dev/gpiochip0,cs=8,sck=11,io0=10,io1=9,io2=24,io3=25 probe
//! c3flash -p linux_gpio:gpiochip=0,cs=8,sck=11,mosi=10,miso=9,wp=24,hold=25,spispeed=500 status
//! ```
//!
//! # Wiring
//!
//! | Flash Pin   | Line | Notes                                  |
//! |-------------|------|----------------------------------------|
//! | CS#         | cs   | active low                             |
//! | CLK         | sck  | idles high                             |
//! | DI / IO0    | io0  |                                        |
//! | DO / IO1    | io1  |                                        |
//! | WP# / IO2   | io2  | held high outside quad phases          |
//! | HOLD# / IO3 | io3  | held high outside quad phases          |
//!
//! Requires access to `/dev/gpiochipN` (root or a udev rule).

pub mod device;
pub mod error;

pub use device::{parse_options, LinuxGpioConfig, LinuxGpioTransport};
pub use error::{LinuxGpioError, Result};

/// Parse backend options and open the transport
pub fn open_linux_gpio(options: &[(&str, &str)]) -> Result<LinuxGpioTransport> {
    let config = parse_options(options)?;
    LinuxGpioTransport::open(&config)
}
