//! Bitmap table commands: catalog, provision and dump

use std::fs::File;
use std::io::Write;
use std::path::Path;

use c3flash_core::flash::SerialFlash;
use c3flash_core::layout::{FIRST_BITMAP_PAGE, INVALID_PAGE, MAX_BITMAPS, PAGE_COUNT, PAGE_SIZE};
use c3flash_core::protect::{Persistence, ProtectionProfile};
use c3flash_core::transport::Transport;
use indicatif::{ProgressBar, ProgressStyle};

use super::erase::chip_erase_with_progress;
use super::read::stream_with_progress;
use crate::manifest::Manifest;

/// List every provisioned bitmap
pub fn run_catalog<T: Transport>(
    flash: &mut SerialFlash<T>,
) -> Result<(), Box<dyn std::error::Error>> {
    let count = flash.bitmap_count()?;
    if count == 0 {
        println!("No bitmaps provisioned");
        return Ok(());
    }

    println!("{:>5}  {:>6}  {:>9}  {:>8}  {:>5}", "Index", "Page", "Size", "Bytes", "Pages");
    for index in 0..count {
        let entry = flash.get_bitmap_info(index)?;
        println!(
            "{:>5}  {:>6}  {:>9}  {:>8}  {:>5}",
            index,
            entry.start_page(),
            format!("{}x{}", entry.width(), entry.height()),
            entry.byte_len(),
            entry.pages()
        );
    }
    println!("{} of {} table entries used", count, MAX_BITMAPS);
    Ok(())
}

/// Page the next bitmap after the first `count` would start at
fn next_free_page<T: Transport>(
    flash: &mut SerialFlash<T>,
    count: u16,
) -> Result<u64, Box<dyn std::error::Error>> {
    if count == 0 {
        return Ok(FIRST_BITMAP_PAGE as u64);
    }
    let last = flash.get_bitmap_info(count - 1)?;
    Ok(last.start_page() as u64 + last.pages())
}

/// Append the bitmaps in `manifest_path` to the table and program their pixels
///
/// The allocator needs protection `None`. With `erase` the whole chip is
/// erased first, which leaves it that way; otherwise `None` is applied
/// temporarily. Once writing starts, `All` is restored whether it
/// succeeds or not.
pub fn run_provision<T: Transport>(
    flash: &mut SerialFlash<T>,
    manifest_path: &Path,
    erase: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = Manifest::from_toml_file(manifest_path)?;
    let pixels = manifest
        .bitmaps
        .iter()
        .map(|bitmap| bitmap.load_pixels())
        .collect::<Result<Vec<_>, _>>()?;

    // An erased chip starts the table again at index 0
    let first = if erase { 0 } else { flash.bitmap_count()? };
    if first as usize + manifest.bitmaps.len() > MAX_BITMAPS as usize {
        return Err(format!(
            "{} bitmaps already provisioned, {} more would overflow the {}-entry table",
            first,
            manifest.bitmaps.len(),
            MAX_BITMAPS
        )
        .into());
    }
    let end_page = next_free_page(flash, first)? + manifest.total_pages();
    if end_page > PAGE_COUNT as u64 {
        return Err(format!(
            "Bitmaps need pages up to {}, the chip has {}",
            end_page, PAGE_COUNT
        )
        .into());
    }

    if erase {
        chip_erase_with_progress(flash)?;
    }

    let total_bytes: usize = pixels.iter().map(Vec::len).sum();
    let pb = ProgressBar::new(total_bytes as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?
            .progress_chars("#>-"),
    );

    let unlocked = if erase {
        Ok(())
    } else {
        flash.set_protection(ProtectionProfile::None, Persistence::Temporary)
    };
    let written = match unlocked {
        Ok(()) => write_bitmaps(flash, &manifest, &pixels, first, &pb),
        Err(e) => Err(e.into()),
    };
    let restored = flash.set_protection(ProtectionProfile::All, Persistence::Temporary);
    if let Err(e) = &written {
        pb.abandon_with_message(format!("Failed: {}", e));
    }
    written?;
    restored?;

    pb.finish_with_message("Provisioning complete");
    println!(
        "Provisioned {} bitmaps ({} bytes) starting at index {}",
        manifest.bitmaps.len(),
        total_bytes,
        first
    );
    Ok(())
}

/// Allocate and program each bitmap, starting at table index `first`
fn write_bitmaps<T: Transport>(
    flash: &mut SerialFlash<T>,
    manifest: &Manifest,
    pixels: &[Vec<u8>],
    first: u16,
    pb: &ProgressBar,
) -> Result<(), Box<dyn std::error::Error>> {
    for (offset, (bitmap, data)) in manifest.bitmaps.iter().zip(pixels).enumerate() {
        let index = first + offset as u16;
        pb.set_message(bitmap.label());

        let start = flash.get_bitmap_page(index, bitmap.width, bitmap.height)?;
        if start == INVALID_PAGE {
            return Err(format!("Bitmap index {} is outside the table", index).into());
        }
        log::debug!("{} -> bitmap {} at page {}", bitmap.label(), index, start);

        for (n, chunk) in data.chunks(PAGE_SIZE).enumerate() {
            flash.program_page(start + n as u16, chunk)?;
            pb.inc(chunk.len() as u64);
        }
    }
    Ok(())
}

/// Stream one bitmap's pixel data into a file
pub fn run_dump_bitmap<T: Transport>(
    flash: &mut SerialFlash<T>,
    index: u16,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let entry = flash.get_bitmap_info(index)?;
    if entry.is_erased() {
        return Err(format!("Bitmap {} has not been provisioned", index).into());
    }
    println!(
        "Bitmap {}: {}x{} at page {}",
        index,
        entry.width(),
        entry.height(),
        entry.start_page()
    );

    let data = stream_with_progress(flash, entry.start_page(), entry.byte_len() as usize)?;

    let mut file = File::create(output)?;
    file.write_all(&data)?;
    println!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use c3flash_sim::{SimConfig, SimFlash, SimTiming};
    use std::fs;

    fn started_sim() -> SerialFlash<SimFlash> {
        let mut flash = SerialFlash::new(SimFlash::new(SimConfig {
            timing: SimTiming::instant(),
            ..SimConfig::default()
        }));
        flash.begin().unwrap();
        flash
    }

    fn write_manifest(dir: &Path, bitmaps: &[(&str, u16, u16, u8)]) -> std::path::PathBuf {
        let mut toml = String::new();
        for &(file, width, height, fill) in bitmaps {
            let len = width as usize * height as usize * 2;
            fs::write(dir.join(file), vec![fill; len]).unwrap();
            toml.push_str(&format!(
                "[[bitmap]]\nfile = \"{}\"\nwidth = {}\nheight = {}\n\n",
                file, width, height
            ));
        }
        let path = dir.join("bitmaps.toml");
        fs::write(&path, toml).unwrap();
        path
    }

    #[test]
    fn test_provision_then_dump() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path(), &[("a.raw", 100, 50, 0x11), ("b.raw", 10, 10, 0x22)]);
        let mut flash = started_sim();

        run_provision(&mut flash, &manifest, true).unwrap();

        assert_eq!(flash.bitmap_count().unwrap(), 2);
        assert_eq!(flash.get_bitmap_info(1).unwrap().start_page(), 568);
        let sim = flash.transport();
        assert!(sim.page(528).iter().all(|&b| b == 0x11));
        assert_eq!(&sim.page(568)[..200], &[0x22; 200][..]);
        assert_eq!(sim.page(568)[200], 0xFF);
        assert_eq!(
            sim.status().profile(),
            Some(ProtectionProfile::All)
        );

        let out = dir.path().join("b.out");
        run_dump_bitmap(&mut flash, 1, &out).unwrap();
        assert_eq!(fs::read(&out).unwrap(), vec![0x22; 200]);
    }

    #[test]
    fn test_provision_appends_after_existing() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_manifest(dir.path(), &[("a.raw", 16, 8, 0x01)]);
        let mut flash = started_sim();
        run_provision(&mut flash, &first, true).unwrap();

        let second = write_manifest(dir.path(), &[("c.raw", 16, 16, 0x03)]);
        run_provision(&mut flash, &second, false).unwrap();

        assert_eq!(flash.bitmap_count().unwrap(), 2);
        let entry = flash.get_bitmap_info(1).unwrap();
        assert_eq!((entry.start_page(), entry.width()), (FIRST_BITMAP_PAGE + 1, 16));
        assert!(flash.transport().page(529).iter().all(|&b| b == 0x03));
    }

    #[test]
    fn test_failed_provision_restores_protection() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path(), &[("slow.raw", 16, 16, 0x44)]);
        // Programming the table entry outlasts the busy wait before the pixels
        let timing = SimTiming {
            page_program_us: 60_000,
            ..SimTiming::instant()
        };
        let mut flash = SerialFlash::new(SimFlash::new(SimConfig {
            timing,
            ..SimConfig::default()
        }));
        flash.begin().unwrap();

        let err = run_provision(&mut flash, &manifest, false).unwrap_err();

        assert_eq!(
            err.downcast_ref::<c3flash_core::Error>(),
            Some(&c3flash_core::Error::Timeout)
        );
        assert_eq!(
            flash.transport().status().profile(),
            Some(ProtectionProfile::All)
        );
        assert_eq!(
            flash.protection().map(|state| state.profile),
            Some(ProtectionProfile::All)
        );
    }

    #[test]
    fn test_dump_unprovisioned_bitmap_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut flash = started_sim();
        assert!(run_dump_bitmap(&mut flash, 0, &dir.path().join("x.raw")).is_err());
    }
}
