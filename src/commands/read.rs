//! Read command implementation

use corespi_core::programmer::SpiMaster;
use corespi_core::protocol;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Default chunk size for reading (4 KiB)
const READ_CHUNK_SIZE: usize = 4096;

/// Highest address reachable with 3-byte addressing
const MAX_3B_ADDRESS: u64 = 1 << 24;

/// Run the read command
pub fn run_read<M: SpiMaster + ?Sized>(
    master: &mut M,
    output: &Path,
    address: u32,
    length: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    if u64::from(address) + length as u64 > MAX_3B_ADDRESS {
        return Err(format!(
            "Range {:#x}+{:#x} is beyond 3-byte addressing (16 MiB)",
            address, length
        )
        .into());
    }

    let data = read_flash_with_progress(master, address, length)?;

    let mut file = File::create(output)?;
    file.write_all(&data)?;

    println!("Wrote {} bytes to {:?}", data.len(), output);

    Ok(())
}

/// Read `length` bytes starting at `address` with a progress bar
pub fn read_flash_with_progress<M: SpiMaster + ?Sized>(
    master: &mut M,
    address: u32,
    length: usize,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut data = vec![0u8; length];

    let pb = ProgressBar::new(length as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut offset = 0usize;
    while offset < length {
        let chunk_size = std::cmp::min(READ_CHUNK_SIZE, length - offset);
        let chunk = &mut data[offset..offset + chunk_size];

        protocol::read_3b(master, address + offset as u32, chunk)?;

        offset += chunk_size;
        pb.set_position(offset as u64);
    }

    pb.finish_with_message("Read complete");
    Ok(data)
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use corespi_core::init::NoDeviceInit;
    use corespi_core::slave::{CoreSpiSlave, SlaveConfig};
    use corespi_sim::{SimCoreSpi, SimFlash, SimFlashConfig};

    #[test]
    fn test_read_spans_chunks() {
        let image: Vec<u8> = (0..3 * READ_CHUNK_SIZE).map(|i| (i % 251) as u8).collect();
        let flash = SimFlash::with_data(SimFlashConfig::default(), &image).unwrap();
        let sim = SimCoreSpi::new(8, flash).unwrap();
        let config = SlaveConfig::default().with_fifo_depth(8);
        let mut slave: CoreSpiSlave<_> =
            CoreSpiSlave::setup(sim, &config, &mut NoDeviceInit).unwrap();

        let data = read_flash_with_progress(&mut slave, 0x100, 2 * READ_CHUNK_SIZE).unwrap();

        assert_eq!(data, image[0x100..0x100 + 2 * READ_CHUNK_SIZE]);
        assert_eq!(slave.regs().slave().commands().len(), 2);
    }
}
