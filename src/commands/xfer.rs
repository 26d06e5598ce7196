//! Raw exchange command
//!
//! Mirrors a host `sspi` command: the bytes to send go out as the write
//! phase of an exchange, the response comes back in the read phase.

use corespi_core::regs::RegisterBlock;
use corespi_core::slave::CoreSpiSlave;
use corespi_core::xfer::XferFlags;

/// Parse hex bytes such as `"9f"`, `"03 00 10 00"` or `"0x05"`
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    for token in s.split_whitespace() {
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if digits.is_empty() || digits.len() % 2 != 0 {
            return Err(format!("Invalid hex bytes: {}", token));
        }
        for i in (0..digits.len()).step_by(2) {
            let byte = digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("Invalid hex bytes: {}", token))?;
            bytes.push(byte);
        }
    }
    if bytes.is_empty() {
        return Err("No bytes to send".to_string());
    }
    Ok(bytes)
}

/// Send `data`, then read `read_len` response bytes in the same exchange
pub fn exchange<R: RegisterBlock, const C: usize>(
    slave: &mut CoreSpiSlave<R, C>,
    data: &[u8],
    read_len: usize,
) -> corespi_core::Result<Vec<u8>> {
    let mut resp = vec![0u8; read_len];

    if read_len == 0 {
        // A write phase on its own is only staged, so clock it directly
        slave.cs_activate();
        slave.transfer(data, &mut resp);
        slave.cs_deactivate();
        return Ok(resp);
    }

    slave.xfer(bit_len(data.len()), Some(data), None, XferFlags::BEGIN)?;
    slave.xfer(bit_len(read_len), None, Some(&mut resp), XferFlags::END)?;
    Ok(resp)
}

fn bit_len(len: usize) -> u32 {
    u32::try_from(len.saturating_mul(8)).unwrap_or(u32::MAX & !7)
}

/// Run the xfer command and print the response
pub fn run_xfer<R: RegisterBlock, const C: usize>(
    slave: &mut CoreSpiSlave<R, C>,
    data: &[u8],
    read_len: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    log::debug!("xfer: sending {} bytes, reading {}", data.len(), read_len);

    let resp = exchange(slave, data, read_len)?;
    if !resp.is_empty() {
        let hex: Vec<String> = resp.iter().map(|b| format!("{:02x}", b)).collect();
        println!("{}", hex.join(" "));
    }
    Ok(())
}
