//! Read command implementation

use std::fs::File;
use std::io::Write;
use std::path::Path;

use c3flash_core::flash::SerialFlash;
use c3flash_core::layout::{Region, PAGE_COUNT, PAGE_SIZE};
use c3flash_core::transport::Transport;
use indicatif::{ProgressBar, ProgressStyle};

/// Bytes pulled through the read session per step (4 KiB)
const READ_CHUNK_SIZE: usize = 4096;

/// Read raw bytes from `page` into a file
pub fn run_read<T: Transport>(
    flash: &mut SerialFlash<T>,
    page: u16,
    length: Option<usize>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let available = PAGE_COUNT.saturating_sub(page as usize) * PAGE_SIZE;
    let length = length.unwrap_or(available);
    if length > available {
        return Err(format!(
            "{} bytes from page {} runs past the end of the chip ({} bytes left)",
            length, page, available
        )
        .into());
    }

    if let Some(region) = Region::of_page(page) {
        log::info!("Reading {} bytes from page {} ({})", length, page, region);
    }
    let data = stream_with_progress(flash, page, length)?;

    let mut file = File::create(output)?;
    file.write_all(&data)?;
    println!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(())
}

/// Stream `length` bytes from `page` through one read session
pub fn stream_with_progress<T: Transport>(
    flash: &mut SerialFlash<T>,
    page: u16,
    length: usize,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut data = vec![0u8; length];

    let pb = ProgressBar::new(length as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut chunks = data.chunks_mut(READ_CHUNK_SIZE);
    if let Some(first) = chunks.next() {
        let mut session = flash.start_read(page, first)?;
        pb.set_position(session.bytes_read() as u64);
        for chunk in chunks {
            session.continue_read(chunk)?;
            pb.set_position(session.bytes_read() as u64);
        }
        session.end_read();
    }

    pb.finish_with_message("Read complete");
    Ok(data)
}
