//! Programmer registration and dispatch
//!
//! A programmer string selects where the CoreSPI controller lives and how the
//! slave on it is set up: `name` or `name:key=value,key=value`. Every
//! programmer ends up as the same [`Slave`], a slave handle over a boxed
//! register block, so commands do not care which backend they run on.

use corespi_core::init::{DeviceInit, NoDeviceInit, SoftwareReset};
use corespi_core::regs::{RegisterBlock, DEFAULT_FIFO_DEPTH};
use corespi_core::slave::{CoreSpiSlave, SlaveConfig};

/// Slave handle every command runs against
pub type Slave = CoreSpiSlave<Box<dyn RegisterBlock>>;

/// Register base of the controller on the reference board
pub const BOARD_BASE: u64 = 0x7000_6000;
/// Chip select of the boot flash on the reference board
pub const BOARD_CS: u32 = 0;
/// Peripheral clock feeding the controller on the reference board
pub const BOARD_CLOCK_HZ: u32 = 83_000_000;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "sim")]
    programmers.push(ProgrammerInfo {
        name: "sim",
        aliases: &["dummy"],
        description: "Simulated controller with SPI NOR flash \
            (depth=,stall=,size=,jedec=,image=,cs=,unlock=)",
    });

    #[cfg(feature = "mmio")]
    programmers.push(ProgrammerInfo {
        name: "mmio",
        aliases: &["corespi"],
        description: "Memory-mapped controller via /dev/mem - requires root \
            (base=,cs=,depth=,spispeed=,unlock=)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:8} - {}\n", p.name, p.description));
    }
    help
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a programmer name or alias to its primary name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Device initialization to run at setup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unlock {
    /// Use the flash as it comes up
    None,
    /// Software reset, then wait for ready
    Reset,
}

impl Unlock {
    fn parse(value: &str) -> Result<Self, String> {
        match value {
            "none" => Ok(Self::None),
            "reset" => Ok(Self::Reset),
            _ => Err(format!("Invalid unlock value: {} (expected none or reset)", value)),
        }
    }

    fn strategy(self) -> Box<dyn DeviceInit> {
        match self {
            Self::None => Box::new(NoDeviceInit),
            Self::Reset => Box::new(SoftwareReset),
        }
    }
}

/// Options of the `sim` programmer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimOptions {
    /// FIFO depth of the simulated controller
    pub depth: usize,
    /// Idle polls between two clocked frames
    pub stall: u64,
    /// Flash size in bytes
    pub size: usize,
    /// JEDEC manufacturer and device ID, packed as 0xMMDDDD
    pub jedec: u32,
    /// Initial flash contents
    pub image: Option<String>,
    /// Chip select the flash is wired to
    pub cs: u32,
    /// Setup strategy
    pub unlock: Unlock,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            depth: DEFAULT_FIFO_DEPTH,
            stall: 0,
            size: 1024 * 1024,
            jedec: 0x20BA18,
            image: None,
            cs: BOARD_CS,
            unlock: Unlock::Reset,
        }
    }
}

/// Parse the options of the `sim` programmer
pub fn parse_sim_options(options: &[(&str, &str)]) -> Result<SimOptions, String> {
    let mut config = SimOptions::default();

    for (key, value) in options {
        match *key {
            "depth" => config.depth = parse_number(key, value)? as usize,
            "stall" => config.stall = parse_number(key, value)?,
            "size" => config.size = parse_number(key, value)? as usize,
            "jedec" => {
                let id = parse_number(key, value)?;
                if id > 0xFF_FFFF {
                    return Err(format!("Invalid jedec value: {} (at most 3 bytes)", value));
                }
                config.jedec = id as u32;
            }
            "image" => config.image = Some(value.to_string()),
            "cs" => config.cs = parse_number(key, value)? as u32,
            "unlock" => config.unlock = Unlock::parse(value)?,
            _ => log::warn!("sim: Unknown option: {}={}", key, value),
        }
    }

    Ok(config)
}

/// Options of the `mmio` programmer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmioOptions {
    /// Physical address of the register window
    pub base: u64,
    /// Chip select of the flash
    pub cs: u32,
    /// FIFO depth the core was synthesized with
    pub depth: usize,
    /// Requested SPI clock in Hz
    pub speed_hz: u32,
    /// Setup strategy
    pub unlock: Unlock,
}

impl Default for MmioOptions {
    fn default() -> Self {
        Self {
            base: BOARD_BASE,
            cs: BOARD_CS,
            depth: DEFAULT_FIFO_DEPTH,
            speed_hz: BOARD_CLOCK_HZ,
            unlock: Unlock::Reset,
        }
    }
}

/// Parse the options of the `mmio` programmer
pub fn parse_mmio_options(options: &[(&str, &str)]) -> Result<MmioOptions, String> {
    let mut config = MmioOptions::default();

    for (key, value) in options {
        match *key {
            "base" => config.base = parse_number(key, value)?,
            "cs" => config.cs = parse_number(key, value)? as u32,
            "depth" => config.depth = parse_number(key, value)? as usize,
            "spispeed" => {
                // Speed in kHz
                let khz = parse_number(key, value)?;
                config.speed_hz = khz
                    .checked_mul(1000)
                    .and_then(|hz| u32::try_from(hz).ok())
                    .ok_or_else(|| format!("Invalid spispeed value: {}", value))?;
            }
            "unlock" => config.unlock = Unlock::parse(value)?,
            _ => log::warn!("mmio: Unknown option: {}={}", key, value),
        }
    }

    Ok(config)
}

/// Parse a hex (0x-prefixed) or decimal option value
fn parse_number(key: &str, value: &str) -> Result<u64, String> {
    let parsed = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        value.parse::<u64>()
    };
    parsed.map_err(|_| format!("Invalid {} value: {}", key, value))
}

/// Execute a function with the slave selected by the programmer string
///
/// The programmer string can be just the name (e.g., "sim") or include
/// parameters (e.g., "sim:depth=4,stall=2").
pub fn with_programmer<F>(programmer: &str, f: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut Slave) -> Result<(), Box<dyn std::error::Error>>,
{
    let (name, options) = parse_programmer_string(programmer);

    let canonical_name = match find_programmer(name) {
        Some(n) => n,
        None => return Err(unknown_programmer_error(name)),
    };

    let (regs, config, unlock): Opened = match canonical_name {
        #[cfg(feature = "sim")]
        "sim" => open_sim(&options)?,
        #[cfg(feature = "mmio")]
        "mmio" => open_mmio(&options)?,
        _ => return Err(unknown_programmer_error(name)),
    };

    let mut slave = CoreSpiSlave::setup(regs, &config, unlock.strategy().as_mut())
        .map_err(|e| format!("Failed to set up CoreSPI slave: {}", e))?;

    let result = f(&mut slave);
    slave.release_bus();
    drop(slave.free());
    result
}

type Opened = (Box<dyn RegisterBlock>, SlaveConfig, Unlock);

#[cfg(feature = "sim")]
fn open_sim(options: &[(&str, &str)]) -> Result<Opened, Box<dyn std::error::Error>> {
    use corespi_sim::{SimCoreSpi, SimFlash, SimFlashConfig};

    let opts = parse_sim_options(options).map_err(|e| format!("Invalid sim parameters: {}", e))?;

    let flash_config = SimFlashConfig {
        manufacturer_id: (opts.jedec >> 16) as u8,
        device_id: opts.jedec as u16,
        size: opts.size,
        ..Default::default()
    };
    let flash = match &opts.image {
        Some(path) => {
            let data = std::fs::read(path)
                .map_err(|e| format!("Failed to read image {}: {}", path, e))?;
            SimFlash::with_data(flash_config, &data)?
        }
        None => SimFlash::new(flash_config)?,
    };

    log::info!(
        "Opening simulated CoreSPI (FIFO depth {}, flash {} KiB on cs {})",
        opts.depth,
        opts.size / 1024,
        opts.cs
    );

    let sim = SimCoreSpi::new(opts.depth, flash)?
        .with_chip_select(opts.cs)?
        .with_stall(opts.stall);
    let config = SlaveConfig::new(0, opts.cs).with_fifo_depth(opts.depth);

    Ok((Box::new(sim), config, opts.unlock))
}

#[cfg(feature = "mmio")]
fn open_mmio(options: &[(&str, &str)]) -> Result<Opened, Box<dyn std::error::Error>> {
    use crate::physmap::MappedRegisters;

    let opts =
        parse_mmio_options(options).map_err(|e| format!("Invalid mmio parameters: {}", e))?;

    log::info!("Opening CoreSPI at {:#x}...", opts.base);

    // SAFETY: the user names the controller; nothing else in this process maps it
    let regs = unsafe { MappedRegisters::map(opts.base) }.map_err(|e| {
        format!(
            "Failed to map CoreSPI registers: {}\n\
             Make sure you have root privileges and no kernel driver owns the controller.",
            e
        )
    })?;
    log::debug!("CoreSPI registers mapped at {:#x}", regs.base());

    let config = SlaveConfig::new(0, opts.cs)
        .with_speed(opts.speed_hz)
        .with_fifo_depth(opts.depth);

    Ok((Box::new(regs), config, opts.unlock))
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

fn unknown_programmer_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown programmer: {}\n\n", name);
    msg.push_str(&programmer_help());
    msg.push_str("\nUse 'corespi list-programmers' for more details");
    msg.into()
}
