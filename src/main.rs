//! VM Engine - trace replay driver
//!
//! Usage: vm-engine [OPTIONS] <TRACE> <OUTPUT>
//!
//! Each trace line is run against one engine and produces one result:
//! the address for `alloc`, the byte for `read` and `io-read`, `0` for any
//! other success and `-1` for a failure.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::LevelFilter;

use vm_engine::io::{Command, TraceLine, read_trace, write_results};
use vm_engine::{
    DEFAULT_RAM_FRAMES, DEFAULT_SWAP_FRAMES, EngineConfig, MAX_SYM, MIN_MERGE_SIZE, MemError,
    MemOp, MemResult, MemoryEngine, Pid, Status,
};

#[derive(Parser, Debug)]
#[command(name = "vm-engine")]
#[command(about = "Replay a memory trace against the simulated paging engine", long_about = None)]
struct Cli {
    /// Trace file, one command per line
    trace: PathBuf,

    /// Output file for per-command results
    output: PathBuf,

    /// RAM frames in the shared pool
    #[arg(long, default_value_t = DEFAULT_RAM_FRAMES)]
    ram_frames: usize,

    /// Swap slots in the shared pool
    #[arg(long, default_value_t = DEFAULT_SWAP_FRAMES)]
    swap_frames: usize,

    /// Free regions merge only when one side is at least this many bytes
    #[arg(long, default_value_t = MIN_MERGE_SIZE)]
    merge_threshold: usize,

    /// Region ids per process
    #[arg(long, default_value_t = MAX_SYM)]
    symbol_slots: usize,

    /// Log engine events and print a per-command summary
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .parse_default_env()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Step 1: Build the engine
    let config = EngineConfig::new()
        .with_ram_frames(cli.ram_frames)
        .with_swap_frames(cli.swap_frames)
        .with_merge_threshold(cli.merge_threshold)
        .with_symbol_slots(cli.symbol_slots);
    let engine = MemoryEngine::new(config)?;

    // Step 2: Read the trace
    let trace = read_trace(&cli.trace)?;

    if cli.verbose {
        eprintln!("=== VM Engine ===");
        eprintln!("Trace file:  {}", cli.trace.display());
        eprintln!("Output file: {}", cli.output.display());
        eprintln!("RAM:         {} frames ({} bytes)", config.ram_frames, config.ram_bytes());
        eprintln!("Swap:        {} slots ({} bytes)", config.swap_frames, config.swap_bytes());
        eprintln!("Commands:    {}", trace.len());
        eprintln!();
    }

    // Step 3: Replay each command
    let results: Vec<i64> = trace
        .iter()
        .map(|line| {
            let status = execute(&engine, line);
            if cli.verbose {
                eprintln!("line {:>4}: {:?} -> {}", line.line, line.command, status);
            }
            status
        })
        .collect();

    if cli.verbose {
        eprintln!();
        eprintln!("=== Summary ===");
        let failures = results.iter().filter(|&&r| r < 0).count();
        eprintln!("Successful commands: {}", results.len() - failures);
        eprintln!("Failed commands: {}", failures);
        for pid in engine.processes() {
            if let Ok(stats) = engine.stats(pid) {
                eprintln!(
                    "Process {}: {} faults, {} evictions, {} grows, {} fallback binds",
                    pid, stats.page_faults, stats.evictions, stats.grows, stats.fallback_binds
                );
            }
            if let Ok(dump) = engine.page_table_dump(pid) {
                for entry in dump {
                    eprintln!("  {}", entry);
                }
            }
        }
        eprintln!(
            "Free frames: {} RAM, {} swap",
            engine.free_ram_frames(),
            engine.free_swap_frames()
        );
        for (address, value) in engine.ram_dump() {
            eprintln!("  RAM {:#07x}: {:02x}", address, value);
        }
        eprintln!();
    }

    // Step 4: Write results
    write_results(&cli.output, &results)?;

    if cli.verbose {
        eprintln!("Results written to: {}", cli.output.display());
    }

    Ok(())
}

/// Run one trace command and reduce its outcome to a status code
fn execute(engine: &MemoryEngine, line: &TraceLine) -> i64 {
    match line.command {
        Command::Spawn { pid } => engine.spawn(pid).status(),
        Command::Vma { pid, vma_id, start } => engine.add_vma(pid, vma_id, start).status(),
        Command::Alloc { pid, size, region_id } => engine.allocate(pid, size, region_id).status(),
        Command::Free { pid, region_id } => engine.deallocate(pid, region_id).status(),
        Command::Read { pid, region_id, offset } => engine.read(pid, region_id, offset).status(),
        Command::Write { pid, value, region_id, offset } => {
            engine.write(pid, value, region_id, offset).status()
        }
        Command::MemOp { pid, opcode, a1, a2 } => dispatch_memop(engine, pid, opcode, a1, a2),
        Command::Exit { pid } => engine.exit(pid).map(|_| ()).status(),
    }
}

/// The memory-operation switch: route an opcode to its engine method.
fn dispatch_memop(engine: &MemoryEngine, pid: Pid, opcode: u32, a1: usize, a2: usize) -> i64 {
    let op = match MemOp::try_from(opcode) {
        Ok(op) => op,
        Err(e) => {
            log::warn!("pid {}: {}", pid, e);
            return MemResult::<()>::Err(e).status();
        }
    };

    match op {
        MemOp::Map => 0,
        MemOp::IncreaseLimit => engine.increase_limit(pid, a1, a2).map(|_| ()).status(),
        MemOp::Swap => engine.swap_page(a1, a2).status(),
        MemOp::IoRead => engine.io_read(a1).status(),
        MemOp::IoWrite => u8::try_from(a2)
            .map_err(|_| MemError::InvalidByte(a2))
            .and_then(|value| engine.io_write(a1, value))
            .status(),
    }
}
