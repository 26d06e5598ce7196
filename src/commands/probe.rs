//! Probe command implementation

use corespi_core::programmer::SpiMaster;
use corespi_core::protocol;

/// Probe the flash behind a SPI master using its JEDEC ID
pub fn run_probe<M: SpiMaster + ?Sized>(master: &mut M) -> Result<(), Box<dyn std::error::Error>> {
    let (manufacturer, device) = protocol::read_jedec_id(master)?;

    if (manufacturer, device) == (0x00, 0x0000) || (manufacturer, device) == (0xFF, 0xFFFF) {
        return Err(format!(
            "No flash chip responded (JEDEC ID {:02X} {:04X})",
            manufacturer, device
        )
        .into());
    }

    let status = protocol::read_status1(master)?;

    println!("Found flash chip:");
    println!("  Vendor:   {}", vendor_name(manufacturer));
    println!("  JEDEC ID: {:02X} {:04X}", manufacturer, device);
    match capacity_from_id(device) {
        Some(size) => println!("  Size:     {} bytes ({} KiB)", size, size / 1024),
        None => println!("  Size:     unknown"),
    }
    println!("  Status:   {:02X}", status);

    Ok(())
}

fn vendor_name(manufacturer: u8) -> &'static str {
    match manufacturer {
        0x01 => "Spansion",
        0x1F => "Adesto",
        0x20 => "Micron/ST",
        0x9D => "ISSI",
        0xBF => "SST",
        0xC2 => "Macronix",
        0xC8 => "GigaDevice",
        0xEF => "Winbond",
        _ => "Unknown",
    }
}

/// Size encoded in the low byte of the device ID, as most vendors do
fn capacity_from_id(device: u16) -> Option<u64> {
    match device & 0xFF {
        exp @ 0x10..=0x22 => Some(1u64 << exp),
        _ => None,
    }
}
