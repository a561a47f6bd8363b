use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use intcode::explore::Explorer;
use intcode::machine::{Machine, Status};
use intcode::opcode::disassemble;
use intcode::program;
use intcode::ring::RingConfig;
use intcode::search::search_noun_verb;

#[derive(Parser)]
#[command(name = "intcode", about = "Run integer-code programs and search amplifier phase settings")]
struct Cli {
    /// Log verbosity: -v info, -vv debug, -vvv trace. RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program to completion, printing every output value.
    Run {
        /// Program file: one line of comma-separated integers.
        program: PathBuf,

        /// Input value; repeat for more. Inputs are replayed from the start
        /// once exhausted.
        #[arg(short, long = "input", allow_hyphen_values = true)]
        inputs: Vec<i64>,

        /// Overwrite a memory cell before running, as ADDR=VALUE.
        #[arg(long = "set", value_parser = parse_patch)]
        patches: Vec<(usize, i64)>,

        /// Print the value at this address after the program halts.
        #[arg(long = "peek")]
        peeks: Vec<usize>,

        /// Abort after this many instructions.
        #[arg(long)]
        step_limit: Option<u64>,
    },

    /// Try every ordering of the phase settings and report the highest signal.
    Explore {
        /// Program file: one line of comma-separated integers.
        program: PathBuf,

        /// Phase setting pool, e.g. 0,1,2,3,4. The ring has one machine per value.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        phases: Vec<i64>,

        /// Loop the last machine's output back into the first until all halt.
        #[arg(long)]
        feedback: bool,

        /// Evaluate orderings on all cores.
        #[arg(long)]
        parallel: bool,

        /// Signal fed to the first machine.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        seed: i64,

        /// Per-machine instruction budget for each ordering.
        #[arg(long)]
        step_limit: Option<u64>,
    },

    /// Find the noun (address 1) and verb (address 2) that make a program
    /// leave TARGET at address 0.
    Search {
        /// Program file: one line of comma-separated integers.
        program: PathBuf,

        /// Value wanted at address 0 after the program halts.
        #[arg(long, allow_hyphen_values = true)]
        target: i64,

        /// Abort any single attempt after this many instructions.
        #[arg(long)]
        step_limit: Option<u64>,
    },

    /// Print a linear-sweep disassembly of a program.
    Disasm {
        /// Program file: one line of comma-separated integers.
        program: PathBuf,
    },
}

/// Parse an "ADDR=VALUE" memory patch.
fn parse_patch(s: &str) -> Result<(usize, i64), String> {
    let (addr, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid patch '{s}', expected ADDR=VALUE (e.g. 1=12)"))?;
    let addr = addr
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("Invalid patch address: {e}"))?;
    let value = value
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("Invalid patch value: {e}"))?;
    Ok((addr, value))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_program(path: &Path) -> Result<Vec<i64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read program file {}", path.display()))?;
    program::parse(&text).with_context(|| format!("Failed to parse program {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run {
            program,
            inputs,
            patches,
            peeks,
            step_limit,
        } => run(&program, &inputs, &patches, &peeks, step_limit),
        Command::Explore {
            program,
            phases,
            feedback,
            parallel,
            seed,
            step_limit,
        } => {
            let config = RingConfig {
                size: phases.len(),
                pause_on_output: feedback,
                feedback,
                seed_signal: seed,
                step_limit,
            };
            explore(&program, &phases, &config, parallel)
        }
        Command::Search {
            program,
            target,
            step_limit,
        } => search(&program, target, step_limit),
        Command::Disasm { program } => {
            let memory = load_program(&program)?;
            print!("{}", disassemble(&memory));
            Ok(())
        }
    }
}

fn run(
    path: &Path,
    inputs: &[i64],
    patches: &[(usize, i64)],
    peeks: &[usize],
    step_limit: Option<u64>,
) -> Result<()> {
    let mut memory = load_program(path)?;
    let len = memory.len();
    for &(addr, value) in patches {
        let Some(cell) = memory.get_mut(addr) else {
            bail!("Patch address {addr} is outside the program ({len} cells)");
        };
        *cell = value;
    }

    // Pausing on output lets every value be printed, not just the last.
    let mut machine = Machine::new(&memory, true)
        .with_name("main")
        .with_step_limit(step_limit);
    machine.set_inputs(inputs);
    while machine.resume()? == Status::Paused {
        println!("{}", machine.output());
    }

    for &addr in peeks {
        let Some(value) = machine.read(addr) else {
            bail!("Peek address {addr} is outside the program ({len} cells)");
        };
        println!("[{addr}] = {value}");
    }
    Ok(())
}

fn explore(path: &Path, phases: &[i64], config: &RingConfig, parallel: bool) -> Result<()> {
    let memory = load_program(path)?;
    let mut explorer = Explorer::from_config(&memory, config)?;
    let result = if parallel {
        explorer.par_explore(phases)?
    } else {
        explorer.explore(phases)?
    };

    let phases = result
        .phases
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",");
    println!("signal: {}", result.signal);
    println!("phases: {phases}");
    println!("trials: {}", result.trials);
    Ok(())
}

fn search(path: &Path, target: i64, step_limit: Option<u64>) -> Result<()> {
    let memory = load_program(path)?;
    let Some((noun, verb)) = search_noun_verb(&memory, target, step_limit)? else {
        bail!("No noun/verb pair in 0..100 leaves {target} at address 0");
    };
    println!("noun: {noun}");
    println!("verb: {verb}");
    println!("answer: {}", 100 * noun + verb);
    Ok(())
}
