use std::io::{self, Write};
use std::process;

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use subleqha::error::{MachineError, Result};
use subleqha::io::IoBus;
use subleqha::machine::{HLT_LOC, Machine};
use subleqha::routine::{Routine, SymbolTable};

/// Conventional I/O location for the character input and output streams.
const CHAR_LOC: i64 = 1;

#[derive(Parser)]
#[command(
    name = "subleqha",
    about = "SUBLEQ Harvard-architecture VM running a keypress echo routine"
)]
struct Cli {
    /// Data locations reserved for memory-mapped I/O.
    #[arg(long, default_value_t = 1000)]
    io_size: i64,

    /// Total data length, including the I/O prefix.
    #[arg(long, default_value_t = 31000)]
    data_size: i64,

    /// Print the routine listing before running.
    #[arg(long)]
    list: bool,
}

/// Raw-terminal bus: location 1 reads a keypress or writes a character,
/// location 0 halts. The quit key 'x' reads as -1 so the guest program can
/// take its own halt path; Ctrl-\ tears the host down directly, bypassing
/// the machine.
struct TermBus;

impl IoBus for TermBus {
    fn input(&mut self, operand_a: i64) -> Result<i64> {
        if operand_a != CHAR_LOC {
            return Ok(0);
        }
        loop {
            let ev = event::read().map_err(|e| MachineError::Handler(format!("key read: {e}")))?;
            let Event::Key(key) = ev else { continue };
            if key.kind == KeyEventKind::Release {
                continue;
            }
            match key.code {
                KeyCode::Char('\\') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    let _ = terminal::disable_raw_mode();
                    println!("Quit");
                    process::exit(0);
                }
                KeyCode::Char('x') => return Ok(-1),
                KeyCode::Char(c) if c.is_ascii() => return Ok(c as i64),
                KeyCode::Enter => return Ok('\r' as i64),
                _ => continue,
            }
        }
    }

    fn output(&mut self, value_a: i64, operand_b: i64) -> Result<bool> {
        match operand_b {
            HLT_LOC => Ok(true),
            CHAR_LOC => {
                let byte = value_a.wrapping_neg() as u8;
                let mut stdout = io::stdout();
                stdout
                    .write_all(&[byte])
                    .and_then(|_| stdout.flush())
                    .map_err(|e| MachineError::Handler(format!("stdout: {e}")))?;
                Ok(false)
            }
            other => Err(MachineError::Handler(format!(
                "unknown IO location for B: {other}"
            ))),
        }
    }
}

/// Puts the terminal into raw mode and restores it on drop, so error paths
/// unwind cleanly.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Hand-assembled echo routine, standing in for the object an external
/// assembler would hand over.
///
/// One working cell `acc` sits at the base of true data. Reading location 1
/// leaves `acc = -key`; a non-negative key branches on to the write, which
/// hands the bus `-key` to print, and a negative key (the quit key) flips
/// `acc` positive so the halt triplet runs instead.
fn echo_routine(io_size: i64) -> Routine {
    let acc = io_size;
    Routine {
        code: vec![
            1, acc, 6, // read: acc -= key, key >= 0 branches to echo
            acc, HLT_LOC, 6, // quit: write acc through the halt location
            acc, 1, 9, // echo: the bus prints the negation of acc
            acc, acc, 0, // again: clear acc and loop
        ],
        data: vec![0],
        code_symbols: SymbolTable::from([
            ("read".to_string(), 0),
            ("quit".to_string(), 3),
            ("echo".to_string(), 6),
            ("again".to_string(), 9),
        ]),
        data_symbols: SymbolTable::from([("acc".to_string(), acc)]),
    }
}

fn main() {
    let cli = Cli::parse();
    if cli.io_size < 2 || cli.data_size <= cli.io_size {
        eprintln!(
            "need io_size >= 2 and data_size > io_size, got {} and {}",
            cli.io_size, cli.data_size
        );
        process::exit(1);
    }

    let mut machine = Machine::new(cli.io_size, cli.data_size, TermBus);
    machine.load_routine(&echo_routine(cli.io_size));

    if cli.list {
        print!("{}", machine.disassemble());
    }
    eprintln!("echoing keys; 'x' halts the routine, Ctrl-\\ quits");

    let result = match TerminalGuard::enter() {
        Ok(_guard) => machine.run(),
        Err(e) => {
            eprintln!("raw mode: {e}");
            process::exit(1);
        }
    };
    match result {
        Ok(()) => eprintln!("halted with value {}", machine.halt_value()),
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}
