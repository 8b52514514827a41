//! c3flash - Controleo3 serial flash tool
//!
//! Drives the W25Q80BV that stores the oven controller's preferences,
//! reflow profiles and UI bitmaps, either on a bench rig over Linux GPIO
//! lines or against the pin-level simulator with an image file.
//!
//! ```bash
//! c3flash -p sim:image=flash.bin provision bitmaps.toml --erase
//! c3flash -p sim:image=flash.bin catalog
//! c3flash -p linux_gpio:gpiochip=0,cs=8,sck=11,io0=10,io1=9,io2=24,io3=25 probe
//! ```

mod backend;
mod cli;
mod commands;
mod manifest;

use backend::Backend;
use clap::Parser;
use cli::Cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let mut backend = Backend::open(&cli.programmer)?;

    let result = match &mut backend {
        Backend::Sim { flash, .. } => commands::run(flash, cli.command),
        #[cfg(feature = "linux-gpio")]
        Backend::LinuxGpio(flash) => commands::run(flash, cli.command),
    };

    // Keep whatever the command managed to write, even if it failed
    backend.finish()?;
    result
}
