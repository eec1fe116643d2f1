use std::collections::HashMap;

/// Symbol table handed over by an assembler: name → address.
pub type SymbolTable = HashMap<String, i64>;

/// An assembled routine ready for loading.
///
/// `code` is the instruction stream (consecutive `(a, b, c)` triplets) and
/// `data` the initial image of the true-data region — everything above the
/// machine's I/O prefix, which the loader leaves zeroed. The two symbol
/// tables are purely advisory: execution never consults them, they exist so
/// hosts can translate addresses back to names when reporting errors or
/// tracing.
#[derive(Debug, Clone, Default)]
pub struct Routine {
    pub code: Vec<i64>,
    pub data: Vec<i64>,
    pub code_symbols: SymbolTable,
    pub data_symbols: SymbolTable,
}
