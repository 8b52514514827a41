//! Erase command implementation

use std::time::Duration;

use c3flash_core::flash::SerialFlash;
use c3flash_core::transport::Transport;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::EraseCommands;

/// Run one of the erase subcommands
pub fn run_erase<T: Transport>(
    flash: &mut SerialFlash<T>,
    what: EraseCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match what {
        EraseCommands::Chip => {
            chip_erase_with_progress(flash)?;
            println!("Chip erased, protection is now none");
        }
        EraseCommands::Prefs { slot } => {
            flash.erase_prefs_block(slot)?;
            println!("Erased preferences slot {}", slot);
        }
        EraseCommands::Profile { page } => {
            flash.erase_profile_block(page)?;
            println!("Erased profile sector at page {}", page);
        }
        EraseCommands::FactoryReset => {
            with_spinner("Erasing preferences and profiles...", || flash.factory_reset())?;
            println!("Preferences and profiles erased");
        }
    }
    Ok(())
}

/// Erase entire chip with progress spinner
pub fn chip_erase_with_progress<T: Transport>(
    flash: &mut SerialFlash<T>,
) -> Result<(), Box<dyn std::error::Error>> {
    with_spinner("Erasing chip (this may take a few seconds)...", || {
        flash.erase_chip()
    })
}

fn with_spinner<F>(message: &'static str, op: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce() -> c3flash_core::Result<()>,
{
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = op();
    match &result {
        Ok(()) => pb.finish_with_message("Done"),
        Err(e) => pb.abandon_with_message(format!("Failed: {}", e)),
    }
    result.map_err(Into::into)
}
