//! Flash command description

/// Address bytes sent by every addressed command
pub const ADDRESS_LEN: usize = 3;

/// Longest header [`SpiCommand::encode_header`] can produce:
/// opcode, address and up to 255 dummy cycles
pub const MAX_HEADER_LEN: usize = 1 + ADDRESS_LEN + 255 / 8;

/// One flash command: opcode, optional 24-bit address, dummy cycles, then
/// either data to write or a buffer to read into
///
/// CoreSPI only drives a single data line, so every phase is 1-1-1.
pub struct SpiCommand<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// 24-bit address, sent most significant byte first
    pub address: Option<u32>,

    /// Dummy clocks after the address; CoreSPI clocks whole bytes, so this
    /// is rounded down to a multiple of 8
    pub dummy_cycles: u8,

    /// Bytes sent after the header
    pub write_data: &'a [u8],

    /// Response bytes clocked in after everything else
    pub read_buf: &'a mut [u8],
}

impl<'a> SpiCommand<'a> {
    /// Opcode only (WREN, RSTEN, ...)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Opcode followed by a register read (RDSR, RDID, ...)
    pub fn read_reg(opcode: u8, buf: &'a mut [u8]) -> Self {
        Self {
            read_buf: buf,
            ..Self::simple(opcode)
        }
    }

    /// Addressed read
    pub fn read_3b(opcode: u8, addr: u32, buf: &'a mut [u8]) -> Self {
        Self {
            address: Some(addr),
            read_buf: buf,
            ..Self::simple(opcode)
        }
    }

    /// Addressed write (PP)
    pub fn write_3b(opcode: u8, addr: u32, data: &'a [u8]) -> Self {
        Self {
            address: Some(addr),
            write_data: data,
            ..Self::simple(opcode)
        }
    }

    /// Addressed command without data (sector erase)
    pub fn erase_3b(opcode: u8, addr: u32) -> Self {
        Self {
            address: Some(addr),
            ..Self::simple(opcode)
        }
    }

    /// Set the number of dummy cycles
    pub fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Number of bytes in the opcode, address and dummy phases
    pub fn header_len(&self) -> usize {
        let address = if self.address.is_some() { ADDRESS_LEN } else { 0 };
        1 + address + usize::from(self.dummy_cycles / 8)
    }

    /// Encode opcode, address and dummy bytes into `buf`
    ///
    /// Returns the number of bytes written. `buf` must hold at least
    /// [`header_len`](Self::header_len) bytes.
    pub fn encode_header(&self, buf: &mut [u8]) -> usize {
        let len = self.header_len();
        buf[0] = self.opcode;

        let mut pos = 1;
        if let Some(addr) = self.address {
            buf[1..1 + ADDRESS_LEN].copy_from_slice(&addr.to_be_bytes()[1..]);
            pos += ADDRESS_LEN;
        }
        buf[pos..len].fill(0);
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_read_3b() {
        let mut buf = [0u8; 4];
        let cmd = SpiCommand::read_3b(0x03, 0x12_3456, &mut buf);
        let mut header = [0xEEu8; MAX_HEADER_LEN];

        assert_eq!(cmd.encode_header(&mut header), 4);
        assert_eq!(&header[..4], &[0x03, 0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_encode_dummy_bytes() {
        let mut buf = [0u8; 2];
        let cmd = SpiCommand::read_3b(0x0B, 0x00_0100, &mut buf).with_dummy_cycles(12);
        let mut header = [0xEEu8; MAX_HEADER_LEN];

        assert_eq!(cmd.header_len(), 5);
        assert_eq!(cmd.encode_header(&mut header), 5);
        assert_eq!(&header[..6], &[0x0B, 0x00, 0x01, 0x00, 0x00, 0xEE]);
    }

    #[test]
    fn test_encode_opcode_only() {
        let cmd = SpiCommand::simple(0x66);
        let mut header = [0xEEu8; MAX_HEADER_LEN];

        assert_eq!(cmd.encode_header(&mut header), 1);
        assert_eq!(header[0], 0x66);
        assert!(cmd.write_data.is_empty() && cmd.read_buf.is_empty());
    }
}
