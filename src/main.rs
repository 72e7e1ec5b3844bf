//! vcpu16 - CLI Entry Point
//!
//! Commands:
//! - `vcpu16 run <image>` - Run a program image to its end
//! - `vcpu16 disasm <image>` - Disassemble a program image
//! - `vcpu16 demo` - Step the built-in add program, dumping registers

use clap::{Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use vcpu::cpu::registers::{R1, R2};
use vcpu::{disassemble, load_image, Cpu, Instruction, MachineConfig, Memory, RegisterLayout};

#[derive(Parser)]
#[command(name = "vcpu16")]
#[command(version)]
#[command(about = "A minimal 16-bit virtual CPU")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a program at address 0 and step until ip passes its end
    Run {
        /// Path to the program image (raw bytes, or hex text if it ends in .hex)
        program: String,
        /// JSON machine configuration
        #[arg(short, long)]
        config: Option<String>,
        /// Maximum number of steps (overrides the config)
        #[arg(short, long)]
        max_steps: Option<u64>,
        /// Dump registers after every step
        #[arg(short, long)]
        trace: bool,
        /// Print the final registers as JSON
        #[arg(long)]
        json: bool,
        /// Hexdump this many bytes of memory after the run
        #[arg(long, value_name = "BYTES")]
        dump_memory: Option<usize>,
    },
    /// Disassemble a program image
    Disasm {
        /// Path to the program image
        program: String,
    },
    /// Step the built-in `r1 + r2` program
    Demo,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialize logging: {}", e);
    }

    let result = match cli.command {
        Some(Commands::Run {
            program,
            config,
            max_steps,
            trace,
            json,
            dump_memory,
        }) => run_program(&program, config.as_deref(), max_steps, trace, json, dump_memory),
        Some(Commands::Disasm { program }) => disassemble_file(&program),
        Some(Commands::Demo) | None => run_demo(),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn run_program(
    path: &str,
    config_path: Option<&str>,
    max_steps: Option<u64>,
    trace: bool,
    json: bool,
    dump_memory: Option<usize>,
) -> CliResult {
    let config = match config_path {
        Some(p) => MachineConfig::load(p)?,
        None => MachineConfig::default(),
    };
    let program = load_image(path)?;
    let mut cpu = config.build(&program)?;

    let end = u16::try_from(program.len()).unwrap_or(u16::MAX);
    let limit = max_steps.unwrap_or(config.max_steps);

    if trace {
        print!("{}", cpu.debug());
        while cpu.ip() < end && cpu.cycles() < limit {
            cpu.step()?;
            print!("{}", cpu.debug());
        }
    } else {
        cpu.run_until(end, limit)?;
    }

    if cpu.ip() < end {
        log::warn!("stopped after {} steps (limit reached)", cpu.cycles());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&cpu.registers().snapshot())?);
    } else if !trace {
        print!("{}", cpu.debug());
    }

    if let Some(count) = dump_memory {
        print_memory(cpu.memory(), count);
    }

    Ok(())
}

fn print_memory(memory: &Memory, count: usize) {
    for row in memory.dump(0, count).chunks(16) {
        let bytes: Vec<String> = row.iter().map(|(_, b)| format!("{:02x}", b)).collect();
        println!("{:04x}: {}", row[0].0, bytes.join(" "));
    }
}

fn disassemble_file(path: &str) -> CliResult {
    let program = load_image(path)?;
    print!("{}", disassemble(&program));
    Ok(())
}

/// mov 0x1234, r1; mov 0xabcd, r2; add r1, r2
fn run_demo() -> CliResult {
    let layout = RegisterLayout::standard();
    let lhs = layout.index_of(R1).ok_or("layout has no r1")?;
    let rhs = layout.index_of(R2).ok_or("layout has no r2")?;

    let program = [
        Instruction::MovLitR1 { literal: 0x1234 },
        Instruction::MovLitR2 { literal: 0xabcd },
        Instruction::AddRegReg { lhs, rhs },
    ];

    let mut memory = Memory::new(256);
    let mut addr = 0;
    for instr in &program {
        let bytes = instr.encode();
        memory.as_bytes_mut()[addr..addr + bytes.len()].copy_from_slice(&bytes);
        addr += bytes.len();
    }

    let mut cpu = Cpu::with_layout(memory, layout);

    print!("{}", cpu.debug());
    for _ in &program {
        cpu.step()?;
        print!("{}", cpu.debug());
    }

    Ok(())
}
