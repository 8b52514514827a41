//! CLI command implementations
//!
//! Every command is generic over the transport, so the simulator and a real
//! chip on GPIO lines share one implementation. The engine has already been
//! started (and the chip protected) by the time a command runs.

mod bitmaps;
mod erase;
mod probe;
mod protect;
mod read;

use c3flash_core::flash::SerialFlash;
use c3flash_core::transport::Transport;

use crate::cli::Commands;

pub use bitmaps::{run_catalog, run_dump_bitmap, run_provision};
pub use erase::run_erase;
pub use probe::{run_probe, run_status};
pub use protect::run_protect;
pub use read::run_read;

/// Run one parsed command against a started engine
pub fn run<T: Transport>(
    flash: &mut SerialFlash<T>,
    command: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Probe => run_probe(flash),
        Commands::Status => run_status(flash),
        Commands::Protect { profile, permanent } => run_protect(flash, profile, permanent),
        Commands::Erase(what) => run_erase(flash, what),
        Commands::Catalog => run_catalog(flash),
        Commands::Provision { manifest, erase } => run_provision(flash, &manifest, erase),
        Commands::DumpBitmap { index, output } => run_dump_bitmap(flash, index, &output),
        Commands::Read {
            page,
            length,
            output,
        } => run_read(flash, page, length, &output),
    }
}
