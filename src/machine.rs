use crate::error::{MachineError, Result};
use crate::io::IoBus;
use crate::routine::{Routine, SymbolTable};

/// Data location whose intercepted writes conventionally signal a halt.
pub const HLT_LOC: i64 = 0;

/// Outcome of a single executed instruction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Running,
    Halted,
}

/// A SUBLEQ machine with a Harvard split between code and data.
///
/// Code and data live in separate flat arrays of signed 64-bit words. Each
/// instruction is a triplet `(a, b, c)` read from three consecutive code
/// words at the program counter: subtract the value read through `a` from
/// the data word at `b`, and jump to `c` when the result is less than or
/// equal to zero.
///
/// A negative operand takes one level of indirection: the effective address
/// is the value stored at `data[-operand]`. The dereferenced value must be
/// non-negative (a second level is an error) and, for the `a` and `b`
/// operands, below `data_size`. Branch targets address code space, so `c`
/// skips the data-range check; a bad target surfaces as an out-of-code-range
/// error on the next fetch instead.
///
/// The low `io_size` words of data space are memory mapped: reads and writes
/// that resolve there are routed to the injected [`IoBus`] rather than
/// touching memory, and an intercepted write skips the branch test entirely.
/// Writing through location [`HLT_LOC`] is the conventional way for a guest
/// program to stop the machine.
pub struct Machine<B> {
    io_size: i64,
    data_size: i64,
    code_size: i64,
    code: Vec<i64>,
    data: Vec<i64>,
    pc: i64,
    hlt_val: i64,
    code_symbols: SymbolTable,
    data_symbols: SymbolTable,
    bus: B,
}

impl<B: IoBus> Machine<B> {
    /// Create a machine with an empty code image and zeroed data.
    ///
    /// `io_size` words of data space are reserved for memory-mapped I/O and
    /// `data_size` is the total data length including that prefix. Both are
    /// fixed for the lifetime of the machine.
    pub fn new(io_size: i64, data_size: i64, bus: B) -> Self {
        assert!(
            0 <= io_size && io_size <= data_size,
            "io_size must satisfy 0 <= io_size <= data_size"
        );
        Self {
            io_size,
            data_size,
            code_size: 0,
            code: Vec::new(),
            data: vec![0; data_size as usize],
            pc: 0,
            hlt_val: 0,
            code_symbols: SymbolTable::new(),
            data_symbols: SymbolTable::new(),
            bus,
        }
    }

    /// Install an assembled routine.
    ///
    /// The code image is copied verbatim. The data image describes only the
    /// true-data region and is copied in starting at offset `io_size`,
    /// leaving the I/O prefix zeroed; an image longer than the remaining
    /// space is truncated. The symbol tables are retained unchanged for
    /// diagnostic lookup.
    pub fn load_routine(&mut self, routine: &Routine) {
        self.code = routine.code.clone();
        self.code_size = self.code.len() as i64;
        let start = self.io_size as usize;
        let limit = routine.data.len().min(self.data.len().saturating_sub(start));
        self.data[start..start + limit].copy_from_slice(&routine.data[..limit]);
        self.code_symbols = routine.code_symbols.clone();
        self.data_symbols = routine.data_symbols.clone();
    }

    /// Execute one full fetch-decode-execute cycle.
    ///
    /// Returns [`Step::Halted`] when the output handler requested a halt,
    /// [`Step::Running`] otherwise. Errors are fatal; the machine is not
    /// expected to be stepped again after one.
    pub fn step(&mut self) -> Result<Step> {
        if self.pc > self.code_size - 3 {
            return Err(MachineError::OutOfCodeRange { pc: self.pc });
        }
        let raw_a = self.code[self.pc as usize];
        let raw_b = self.code[self.pc as usize + 1];
        let raw_c = self.code[self.pc as usize + 2];

        let a = self.resolve(raw_a, true)?;
        let b = self.resolve(raw_b, true)?;
        // Branch targets address code space, so only their indirection is
        // validated here.
        let c = self.resolve(raw_c, false)?;

        let value_a = if a < self.io_size {
            self.bus.input(a)?
        } else {
            self.read_data(a)?
        };

        if b < self.io_size {
            // Intercepted write: memory is untouched and the branch test is
            // skipped, whatever value was read.
            let hlt = self.bus.output(value_a, b)?;
            self.pc += 3;
            if hlt {
                self.hlt_val = value_a.wrapping_neg();
                return Ok(Step::Halted);
            }
        } else {
            let result = self.read_data(b)?.wrapping_sub(value_a);
            self.data[b as usize] = result;
            if result <= 0 {
                self.pc = c;
            } else {
                self.pc += 3;
            }
        }
        Ok(Step::Running)
    }

    /// Drive the machine until the bus requests a halt or an error surfaces.
    ///
    /// There is no step limit or timeout: a guest program that never halts
    /// runs forever.
    pub fn run(&mut self) -> Result<()> {
        loop {
            if self.step()? == Step::Halted {
                return Ok(());
            }
        }
    }

    /// Current program counter.
    pub fn pc(&self) -> i64 {
        self.pc
    }

    /// The negated value that was written through the halt location, set
    /// when the output handler requested a halt.
    pub fn halt_value(&self) -> i64 {
        self.hlt_val
    }

    /// Read-only view of data memory, I/O prefix included.
    pub fn data(&self) -> &[i64] {
        &self.data
    }

    /// The injected I/O bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Translate an address to a symbolic name for diagnostics, searching
    /// the data symbols first and then the code symbols, falling back to
    /// the bare address. Execution never calls this.
    pub fn addr_to_symbol(&self, addr: i64) -> String {
        self.data_symbols
            .iter()
            .chain(self.code_symbols.iter())
            .find(|&(_, &sym_addr)| sym_addr == addr)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| addr.to_string())
    }

    /// Like [`addr_to_symbol`](Self::addr_to_symbol) but for code-space
    /// addresses (program counter values and branch targets), consulting
    /// only the code symbol table.
    pub fn code_addr_to_symbol(&self, addr: i64) -> String {
        self.code_symbols
            .iter()
            .find(|&(_, &sym_addr)| sym_addr == addr)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| addr.to_string())
    }

    /// Pretty-print the loaded code image for human inspection, one
    /// instruction triplet per line, annotated with symbolic names where
    /// the tables know them.
    pub fn disassemble(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        let mut pc = 0;
        while pc + 2 < self.code.len() {
            let a = self.code[pc];
            let b = self.code[pc + 1];
            let c = self.code[pc + 2];
            let _ = writeln!(
                out,
                "{:>7}: SUBLEQ {}, {}, {}",
                self.code_addr_to_symbol(pc as i64),
                self.addr_to_symbol(a),
                self.addr_to_symbol(b),
                self.code_addr_to_symbol(c),
            );
            pc += 3;
        }
        // Trailing words that don't form a complete triplet.
        for (i, &word) in self.code.iter().enumerate().skip(pc) {
            let _ = writeln!(out, "{i:>7}: {word}     (trailing)");
        }
        out
    }

    // Resolve a raw operand to an effective non-negative address. A
    // negative raw value takes one level of indirection through data space;
    // `range_checked` applies the data-size check to the dereferenced value
    // (the A and B operands), which branch targets skip.
    fn resolve(&self, raw: i64, range_checked: bool) -> Result<i64> {
        if raw >= 0 {
            return Ok(raw);
        }
        let cell = self.read_data(raw.wrapping_neg())?;
        if cell < 0 {
            return Err(MachineError::DoubleIndirect { pc: self.pc });
        }
        if range_checked && cell >= self.data_size {
            return Err(MachineError::OutOfMemoryRange {
                pc: self.pc,
                addr: cell,
            });
        }
        Ok(cell)
    }

    fn read_data(&self, addr: i64) -> Result<i64> {
        if addr < 0 || addr >= self.data_size {
            return Err(MachineError::OutOfMemoryRange { pc: self.pc, addr });
        }
        Ok(self.data[addr as usize])
    }
}
