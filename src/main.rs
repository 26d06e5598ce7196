//! corespi - SPI flash access through a Microsemi CoreSPI controller
//!
//! The CLI runs the polled CoreSPI transfer engine either against the
//! register-level simulator or against a real controller mapped from
//! /dev/mem, and offers the usual flash operations on top of it.

mod cli;
mod commands;
#[cfg(feature = "mmio")]
mod physmap;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};
use programmers::with_programmer;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger, RUST_LOG still wins over -v
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Probe { programmer } => {
            with_programmer(&programmer, |slave| commands::run_probe(slave))
        }
        Commands::Read {
            programmer,
            output,
            address,
            length,
        } => with_programmer(&programmer, |slave| {
            commands::run_read(slave, &output, address, length as usize)
        }),
        Commands::Xfer {
            programmer,
            data,
            read,
        } => {
            let data = commands::parse_hex_bytes(&data)?;
            with_programmer(&programmer, |slave| commands::run_xfer(slave, &data, read))
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
    }
}
