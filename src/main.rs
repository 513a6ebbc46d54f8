//! Command line front end for running ROMs headless and printing execution traces.
use std::{error::Error, fs, path::PathBuf};

use clap::{Parser, Subcommand};
use log::*;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use nescore::{Nes, Settings};

#[derive(Parser, Debug)]
#[command(name = "nescore")]
#[command(about = "Cycle accurate NES emulation core", long_about = None)]
struct Args {
    /// Minimum level of log messages to print
    #[arg(short, long, default_value = "warn", value_parser = parse_level)]
    log_level: LevelFilter,

    /// YAML file to load emulator settings from
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a nestest.log style line before every instruction
    Trace {
        /// Path to the iNES ROM file
        rom: PathBuf,
        /// Address to start executing at instead of the reset vector, in hex
        #[arg(short, long, value_parser = parse_hex)]
        start: Option<u16>,
        /// Number of instructions to trace
        #[arg(short = 'n', long, default_value = "10000")]
        count: usize,
    },
    /// Run a number of frames and print the final CPU state
    Run {
        /// Path to the iNES ROM file
        rom: PathBuf,
        /// Number of frames to run
        #[arg(short, long, default_value = "60")]
        frames: u64,
    },
}

fn parse_hex(s: &str) -> Result<u16, String> {
    u16::from_str_radix(s.trim_start_matches("0x").trim_start_matches('$'), 16)
        .map_err(|e| format!("{} is not a hex address: {}", s, e))
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.parse()
        .map_err(|_| format!("{} is not one of off, error, warn, info, debug or trace", s))
}

fn load_settings(path: &Option<PathBuf>) -> Result<Settings, Box<dyn Error>> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            let settings: Settings = serde_yaml::from_str(&contents)?;
            debug!("Loaded settings {:?} from {}", settings, path.display());
            Ok(settings)
        }
        None => Ok(Settings::default()),
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let settings = load_settings(&args.config)?;
    match args.command {
        Command::Trace { rom, start, count } => {
            let data = fs::read(&rom)?;
            let mut nes = Nes::from_ines(&data, settings)?;
            if let Some(start) = start {
                nes = nes.with_start_address(start);
            }
            for _ in 0..count {
                println!("{}", nes.trace_line());
                nes.step();
                while nes.cpu.is_dma_active() {
                    nes.step();
                }
                if nes.is_halted() {
                    info!("CPU halted at {:04X}", nes.cpu.p_c);
                    break;
                }
            }
        }
        Command::Run { rom, frames } => {
            let data = fs::read(&rom)?;
            let mut nes = Nes::from_ines(&data, settings)?;
            let cycles: u64 = (0..frames).map(|_| nes.advance_frame()).sum();
            println!("Ran {} frames in {} CPU cycles", frames, cycles);
            println!("{:?}", nes.cpu);
            if nes.is_halted() {
                println!("CPU is halted");
            }
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    TermLogger::init(
        args.log_level,
        ConfigBuilder::new().build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;
    run(args).inspect_err(|e| error!("{}", e))
}
