use thiserror::Error;

/// Errors that stop a running machine.
///
/// Every variant is fatal: the execution loop surfaces it to the caller and
/// never retries. The engine does no logging of its own; callers wanting
/// symbolic addresses in their messages can translate through the machine's
/// retained symbol tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// The fetch window `pc..=pc+2` fell outside the code image.
    #[error("PC: {pc}, outside code range")]
    OutOfCodeRange { pc: i64 },

    /// An indirect operand dereferenced to another negative value. Only a
    /// single level of indirection is supported.
    #[error("PC: {pc}, double indirect not supported")]
    DoubleIndirect { pc: i64 },

    /// A data access resolved outside `[0, data_size)`.
    #[error("PC: {pc}, outside memory range: {addr}")]
    OutOfMemoryRange { pc: i64, addr: i64 },

    /// An input or output handler reported an error, propagated verbatim.
    #[error("{0}")]
    Handler(String),
}

pub type Result<T> = std::result::Result<T, MachineError>;
