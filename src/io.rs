use crate::error::Result;

/// The memory-mapped I/O capability injected into a machine.
///
/// Accesses whose resolved operand falls below the machine's `io_size` are
/// routed here instead of touching data memory. Both sides are blocking
/// calls: a handler runs to completion before the next cycle begins, and
/// the machine invokes handlers in exactly the guest program's data/control
/// flow order.
pub trait IoBus {
    /// Read the I/O location named by a resolved A operand, returning the
    /// value as if it had been read from memory. Location 1 conventionally
    /// denotes a character-input stream.
    fn input(&mut self, operand_a: i64) -> Result<i64>;

    /// Write `value_a` toward the I/O location named by a resolved B
    /// operand. Returning `true` requests a halt; location 0 is the
    /// conventional halt location.
    fn output(&mut self, value_a: i64, operand_b: i64) -> Result<bool>;
}

/// Bus with no devices mapped: reads yield 0 and writes do nothing except
/// halt at the conventional halt location. Useful as a test stub for guest
/// programs whose I/O traffic is irrelevant.
pub struct NullBus;

impl IoBus for NullBus {
    fn input(&mut self, _operand_a: i64) -> Result<i64> {
        Ok(0)
    }

    fn output(&mut self, _value_a: i64, operand_b: i64) -> Result<bool> {
        Ok(operand_b == 0)
    }
}
