//! Probe and status commands

use c3flash_core::flash::{SerialFlash, EXPECTED_IDENTITY};
use c3flash_core::transport::Transport;

/// Check the chip is a W25Q80BV and print its unique ID
pub fn run_probe<T: Transport>(
    flash: &mut SerialFlash<T>,
) -> Result<(), Box<dyn std::error::Error>> {
    let identity = flash.read_identity()?;

    println!("Flash chip:");
    println!("  JEDEC ID:           {:06X}", identity.jedec_id());
    println!(
        "  Manufacturer/device: {:02X}/{:02X}",
        identity.rems_manufacturer, identity.rems_device
    );

    if let Some(field) = identity.mismatch(&EXPECTED_IDENTITY) {
        eprintln!("Not a W25Q80BV: unexpected {} (expected {})", field, EXPECTED_IDENTITY);
        return Err(Box::new(c3flash_core::Error::IdentityMismatch));
    }

    let unique_id = flash.read_unique_id()?;
    println!("  Part:               Winbond W25Q80BV (1 MiB)");
    println!("  Unique ID:          {:08X}", unique_id);
    Ok(())
}

/// Print status registers and what they protect
pub fn run_status<T: Transport>(
    flash: &mut SerialFlash<T>,
) -> Result<(), Box<dyn std::error::Error>> {
    let regs = flash.status_registers()?;

    println!("Status Registers");
    println!("================");
    println!("SR1: 0x{:02X} {:?}", regs.sr1.bits(), regs.sr1);
    println!("SR2: 0x{:02X} {:?}", regs.sr2.bits(), regs.sr2);
    println!();

    match regs.profile() {
        Some(profile) => println!("Profile:         {}", profile),
        None => println!("Profile:         (custom)"),
    }
    println!("Protected range: {}", regs.protected_range());
    if let Some(state) = flash.protection() {
        println!(
            "Last applied:    {} ({})",
            state.profile, state.persistence
        );
    }
    Ok(())
}
