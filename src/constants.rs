//! Protocol constants for spend validation

/// Maximum money supply: 21,000,000 coins in base units
pub const MAX_MONEY: u64 = 21_000_000 * 100_000_000;

/// Maximum transaction size: 1MB
pub const MAX_TX_SIZE: usize = 1_000_000;

/// Maximum script length
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Maximum stack size during script execution
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum number of operations in script
pub const MAX_SCRIPT_OPS: usize = 201;

/// Maximum size of a single pushed stack element
pub const MAX_PUSH_SIZE: usize = 520;

/// Signature-hash type covering all inputs and outputs
pub const SIGHASH_ALL: u8 = 0x01;

/// Sequence number for final transaction
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// Serialization marker byte announcing witness data
pub const SEGWIT_MARKER: u8 = 0x00;

/// Serialization flag byte following the witness marker
pub const SEGWIT_FLAG: u8 = 0x01;
