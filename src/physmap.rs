//! Physical memory mapping for the CoreSPI register window
//!
//! On Linux the controller is reached through /dev/mem, which requires root.
//! The mapping is page aligned; [`MappedRegisters`] keeps it alive for as
//! long as the register block is in use.

use corespi_core::regs::{MmioRegisters, RegisterBlock, REGISTER_WINDOW};
use thiserror::Error;

/// Errors from mapping physical memory
#[derive(Debug, Error)]
pub enum PhysMapError {
    /// /dev/mem could not be opened
    #[error("cannot open /dev/mem: {0}")]
    Open(#[from] std::io::Error),

    /// mmap refused the range
    #[error("failed to map {size:#x} bytes at {address:#x}")]
    Map {
        /// Physical address
        address: u64,
        /// Requested size
        size: usize,
    },

    /// Register windows must be 32-bit aligned
    #[error("register base {0:#x} is not 32-bit aligned")]
    Unaligned(u64),

    /// No /dev/mem on this platform
    #[error("physical memory mapping is only supported on Linux")]
    NotSupported,
}

/// A mapped region of physical memory
#[cfg(target_os = "linux")]
pub struct PhysMap {
    /// Start of the requested region inside the mapping
    ptr: *mut u8,
    /// Size of the whole mapping
    map_size: usize,
    /// Offset of `ptr` from the page-aligned mapping start
    offset: usize,
    phys_addr: u64,
}

#[cfg(target_os = "linux")]
impl PhysMap {
    /// Map `size` bytes of physical memory starting at `phys_addr`
    pub fn new(phys_addr: u64, size: usize) -> Result<Self, PhysMapError> {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;
        use std::os::unix::io::AsRawFd;

        // O_SYNC gives uncached access, which MMIO needs
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open("/dev/mem")?;

        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let page_mask = page_size - 1;
        let offset = (phys_addr as usize) & page_mask;
        let aligned_addr = phys_addr & !(page_mask as u64);
        let map_size = (size + offset + page_mask) & !page_mask;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                aligned_addr as libc::off_t,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(PhysMapError::Map {
                address: phys_addr,
                size,
            });
        }

        log::debug!(
            "Mapped {:#x} bytes of physical memory at {:#x}",
            map_size,
            aligned_addr
        );

        Ok(Self {
            // SAFETY: offset is below the page size and map_size covers it
            ptr: unsafe { (ptr as *mut u8).add(offset) },
            map_size,
            offset,
            phys_addr,
        })
    }

    /// Pointer to the start of the requested region
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Physical address of the requested region
    pub fn phys_addr(&self) -> u64 {
        self.phys_addr
    }
}

#[cfg(target_os = "linux")]
impl Drop for PhysMap {
    fn drop(&mut self) {
        unsafe {
            let base = self.ptr.sub(self.offset);
            libc::munmap(base as *mut libc::c_void, self.map_size);
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub struct PhysMap {
    _private: (),
}

#[cfg(not(target_os = "linux"))]
impl PhysMap {
    pub fn new(_phys_addr: u64, _size: usize) -> Result<Self, PhysMapError> {
        Err(PhysMapError::NotSupported)
    }

    pub fn as_ptr(&self) -> *mut u8 {
        std::ptr::null_mut()
    }

    pub fn phys_addr(&self) -> u64 {
        0
    }
}

/// CoreSPI registers behind a physical memory mapping
pub struct MappedRegisters {
    regs: MmioRegisters,
    map: PhysMap,
}

impl MappedRegisters {
    /// Map the controller whose register window starts at `base`
    ///
    /// # Safety
    ///
    /// `base` must be the physical address of a CoreSPI controller that no
    /// other code (including a kernel driver) is using.
    pub unsafe fn map(base: u64) -> Result<Self, PhysMapError> {
        if base & 3 != 0 {
            return Err(PhysMapError::Unaligned(base));
        }
        let map = PhysMap::new(base, REGISTER_WINDOW)?;
        let regs = MmioRegisters::new(map.as_ptr());
        Ok(Self { regs, map })
    }

    /// Physical address of the register window
    pub fn base(&self) -> u64 {
        self.map.phys_addr()
    }
}

impl RegisterBlock for MappedRegisters {
    fn read(&mut self, offset: usize) -> u32 {
        self.regs.read(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.regs.write(offset, value)
    }
}
