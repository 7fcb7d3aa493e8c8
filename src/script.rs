//! Script execution engine
//!
//! A script is parsed up front into a closed instruction set and then run
//! by a single-pass fetch-decode-execute loop over an explicit stack. The
//! verdict distinguishes decode failures (errors, per the caller's input
//! being malformed) from validation failures (an expected outcome the
//! caller branches on). Each execution owns its stack; nothing is shared
//! between validations.

use crate::constants::{MAX_PUSH_SIZE, MAX_SCRIPT_OPS, MAX_SCRIPT_SIZE, MAX_STACK_SIZE};
use crate::engine;
use crate::error::{CoreError, Result};
use crate::hashing::{hash160, hash256};
use crate::types::{ByteString, Transaction, Utxo};

/// Two-byte-prefix push forms for payloads longer than 75 bytes.
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;

/// The fixed opcode vocabulary.
///
/// Push instructions are carried as [`Instruction::Push`] data rather than
/// opcodes, so this enum is matched exhaustively with no unknown-opcode
/// dispatch path; unknown bytes never survive parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Dup,
    Drop,
    Swap,
    Equal,
    EqualVerify,
    Verify,
    Hash160,
    Hash256,
    CheckSig,
    CheckSigVerify,
}

impl Opcode {
    pub fn to_byte(self) -> u8 {
        match self {
            Opcode::Dup => 0x76,
            Opcode::Drop => 0x75,
            Opcode::Swap => 0x7c,
            Opcode::Equal => 0x87,
            Opcode::EqualVerify => 0x88,
            Opcode::Verify => 0x69,
            Opcode::Hash160 => 0xa9,
            Opcode::Hash256 => 0xaa,
            Opcode::CheckSig => 0xac,
            Opcode::CheckSigVerify => 0xad,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x76 => Some(Opcode::Dup),
            0x75 => Some(Opcode::Drop),
            0x7c => Some(Opcode::Swap),
            0x87 => Some(Opcode::Equal),
            0x88 => Some(Opcode::EqualVerify),
            0x69 => Some(Opcode::Verify),
            0xa9 => Some(Opcode::Hash160),
            0xaa => Some(Opcode::Hash256),
            0xac => Some(Opcode::CheckSig),
            0xad => Some(Opcode::CheckSigVerify),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Dup => "OP_DUP",
            Opcode::Drop => "OP_DROP",
            Opcode::Swap => "OP_SWAP",
            Opcode::Equal => "OP_EQUAL",
            Opcode::EqualVerify => "OP_EQUALVERIFY",
            Opcode::Verify => "OP_VERIFY",
            Opcode::Hash160 => "OP_HASH160",
            Opcode::Hash256 => "OP_HASH256",
            Opcode::CheckSig => "OP_CHECKSIG",
            Opcode::CheckSigVerify => "OP_CHECKSIGVERIFY",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "OP_DUP" => Some(Opcode::Dup),
            "OP_DROP" => Some(Opcode::Drop),
            "OP_SWAP" => Some(Opcode::Swap),
            "OP_EQUAL" => Some(Opcode::Equal),
            "OP_EQUALVERIFY" => Some(Opcode::EqualVerify),
            "OP_VERIFY" => Some(Opcode::Verify),
            "OP_HASH160" => Some(Opcode::Hash160),
            "OP_HASH256" => Some(Opcode::Hash256),
            "OP_CHECKSIG" => Some(Opcode::CheckSig),
            "OP_CHECKSIGVERIFY" => Some(Opcode::CheckSigVerify),
            _ => None,
        }
    }
}

/// One parsed script instruction: literal data or a named operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Push(ByteString),
    Op(Opcode),
}

/// Parse packed script bytes into instructions.
///
/// Push lengths are validated against the remaining script; a declared
/// length that overruns the script, a push beyond [`MAX_PUSH_SIZE`], an
/// oversized script, or an unknown opcode byte are all decode errors.
pub fn parse_script(script: &[u8]) -> Result<Vec<Instruction>> {
    if script.len() > MAX_SCRIPT_SIZE {
        return Err(CoreError::Decode(format!(
            "script of {} bytes exceeds limit",
            script.len()
        )));
    }

    let mut instructions = Vec::new();
    let mut offset = 0;
    while offset < script.len() {
        let byte = script[offset];
        offset += 1;
        match byte {
            0x00 => instructions.push(Instruction::Push(Vec::new())),
            0x01..=0x4b => {
                let len = byte as usize;
                instructions.push(Instruction::Push(read_push(script, &mut offset, len)?));
            }
            OP_PUSHDATA1 => {
                let len = *script
                    .get(offset)
                    .ok_or_else(|| CoreError::Decode("truncated push length".to_string()))?
                    as usize;
                offset += 1;
                instructions.push(Instruction::Push(read_push(script, &mut offset, len)?));
            }
            OP_PUSHDATA2 => {
                let raw = script
                    .get(offset..offset + 2)
                    .ok_or_else(|| CoreError::Decode("truncated push length".to_string()))?;
                let len = u16::from_le_bytes([raw[0], raw[1]]) as usize;
                offset += 2;
                instructions.push(Instruction::Push(read_push(script, &mut offset, len)?));
            }
            other => match Opcode::from_byte(other) {
                Some(op) => instructions.push(Instruction::Op(op)),
                None => {
                    return Err(CoreError::Decode(format!(
                        "unknown opcode 0x{other:02x} at offset {}",
                        offset - 1
                    )))
                }
            },
        }
    }
    Ok(instructions)
}

fn read_push(script: &[u8], offset: &mut usize, len: usize) -> Result<ByteString> {
    if len > MAX_PUSH_SIZE {
        return Err(CoreError::Decode(format!(
            "push of {len} bytes exceeds limit"
        )));
    }
    let data = script
        .get(*offset..*offset + len)
        .ok_or_else(|| {
            CoreError::Decode(format!(
                "push of {len} bytes overruns script at offset {at}",
                at = *offset
            ))
        })?
        .to_vec();
    *offset += len;
    Ok(data)
}

/// Why a script was not authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    StackUnderflow,
    EqualVerifyFailed,
    VerifyFailed,
    SignatureCheckFailed,
    FinalStackShape,
    FinalStackFalsy,
}

/// Spend-authorization verdict.
///
/// `Unauthorized` is the expected negative outcome of validation, not an
/// error; hard errors (malformed scripts, resource-limit violations) are
/// reported through `CoreError` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Authorized,
    Unauthorized(FailReason),
}

impl Verdict {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Verdict::Authorized)
    }
}

/// Execution stack: a LIFO of byte strings, owned by one execution.
#[derive(Debug, Default, Clone)]
pub struct Stack {
    items: Vec<ByteString>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[ByteString] {
        &self.items
    }

    fn push(&mut self, item: ByteString) -> Result<()> {
        if self.items.len() >= MAX_STACK_SIZE {
            return Err(CoreError::Script("stack size limit exceeded".to_string()));
        }
        self.items.push(item);
        Ok(())
    }

    fn pop(&mut self) -> Option<ByteString> {
        self.items.pop()
    }

    fn top(&self) -> Option<&ByteString> {
        self.items.last()
    }
}

/// An item is truthy unless empty or all-zero.
fn is_truthy(item: &[u8]) -> bool {
    item.iter().any(|b| *b != 0)
}

/// Validation context: the transaction being validated, the input under
/// consideration, and the UTXO it claims to spend.
struct ExecContext<'a> {
    tx: &'a Transaction,
    input_index: usize,
    spent: &'a Utxo,
}

/// Run the concatenation of unlocking and locking script for one input.
///
/// Authorized iff execution completes with exactly one truthy item on the
/// stack. Decode failures and resource-limit violations are `Err`; every
/// semantic failure is an `Unauthorized` verdict with its reason.
pub fn verify_spend(
    script_sig: &[u8],
    script_pubkey: &[u8],
    tx: &Transaction,
    input_index: usize,
    spent: &Utxo,
) -> Result<Verdict> {
    let mut script = Vec::with_capacity(script_sig.len() + script_pubkey.len());
    script.extend_from_slice(script_sig);
    script.extend_from_slice(script_pubkey);
    execute_script(&script, tx, input_index, spent)
}

/// Hex-interface variant: the validator's input is the concatenation of
/// unlocking-script hex and locking-script hex.
pub fn verify_spend_hex(
    script_hex: &str,
    tx: &Transaction,
    input_index: usize,
    spent: &Utxo,
) -> Result<Verdict> {
    let script = hex::decode(script_hex)
        .map_err(|e| CoreError::Decode(format!("invalid script hex: {e}")))?;
    execute_script(&script, tx, input_index, spent)
}

/// Execute an already-concatenated script against its transaction context.
pub fn execute_script(
    script: &[u8],
    tx: &Transaction,
    input_index: usize,
    spent: &Utxo,
) -> Result<Verdict> {
    if input_index >= tx.inputs.len() {
        return Err(CoreError::InputIndexOutOfRange {
            index: input_index,
            len: tx.inputs.len(),
        });
    }

    let instructions = parse_script(script)?;
    let ctx = ExecContext {
        tx,
        input_index,
        spent,
    };

    let mut stack = Stack::new();
    let mut op_count = 0usize;
    for instruction in &instructions {
        match instruction {
            Instruction::Push(data) => stack.push(data.clone())?,
            Instruction::Op(op) => {
                op_count += 1;
                if op_count > MAX_SCRIPT_OPS {
                    return Err(CoreError::Script(
                        "operation count limit exceeded".to_string(),
                    ));
                }
                if let Some(reason) = execute_opcode(*op, &mut stack, &ctx)? {
                    return Ok(Verdict::Unauthorized(reason));
                }
            }
        }
    }

    if stack.height() != 1 {
        return Ok(Verdict::Unauthorized(FailReason::FinalStackShape));
    }
    if !is_truthy(stack.top().expect("height checked")) {
        return Ok(Verdict::Unauthorized(FailReason::FinalStackFalsy));
    }
    Ok(Verdict::Authorized)
}

/// Execute one opcode. `Some(reason)` halts the script unauthorized.
fn execute_opcode(
    op: Opcode,
    stack: &mut Stack,
    ctx: &ExecContext,
) -> Result<Option<FailReason>> {
    match op {
        Opcode::Dup => match stack.top().cloned() {
            Some(item) => stack.push(item)?,
            None => return Ok(Some(FailReason::StackUnderflow)),
        },

        Opcode::Drop => {
            if stack.pop().is_none() {
                return Ok(Some(FailReason::StackUnderflow));
            }
        }

        Opcode::Swap => {
            if stack.height() < 2 {
                return Ok(Some(FailReason::StackUnderflow));
            }
            let top = stack.pop().expect("height checked");
            let second = stack.pop().expect("height checked");
            stack.push(top)?;
            stack.push(second)?;
        }

        Opcode::Equal => {
            if stack.height() < 2 {
                return Ok(Some(FailReason::StackUnderflow));
            }
            let a = stack.pop().expect("height checked");
            let b = stack.pop().expect("height checked");
            stack.push(if a == b { vec![1] } else { vec![] })?;
        }

        Opcode::EqualVerify => {
            if stack.height() < 2 {
                return Ok(Some(FailReason::StackUnderflow));
            }
            let a = stack.pop().expect("height checked");
            let b = stack.pop().expect("height checked");
            if a != b {
                return Ok(Some(FailReason::EqualVerifyFailed));
            }
        }

        Opcode::Verify => match stack.pop() {
            Some(item) => {
                if !is_truthy(&item) {
                    return Ok(Some(FailReason::VerifyFailed));
                }
            }
            None => return Ok(Some(FailReason::StackUnderflow)),
        },

        Opcode::Hash160 => match stack.pop() {
            Some(item) => stack.push(hash160(&item).to_vec())?,
            None => return Ok(Some(FailReason::StackUnderflow)),
        },

        Opcode::Hash256 => match stack.pop() {
            Some(item) => stack.push(hash256(&item).to_vec())?,
            None => return Ok(Some(FailReason::StackUnderflow)),
        },

        Opcode::CheckSig => {
            if stack.height() < 2 {
                return Ok(Some(FailReason::StackUnderflow));
            }
            let pubkey = stack.pop().expect("height checked");
            let signature = stack.pop().expect("height checked");
            let valid = check_signature(&pubkey, &signature, ctx)?;
            stack.push(if valid { vec![1] } else { vec![] })?;
        }

        Opcode::CheckSigVerify => {
            if stack.height() < 2 {
                return Ok(Some(FailReason::StackUnderflow));
            }
            let pubkey = stack.pop().expect("height checked");
            let signature = stack.pop().expect("height checked");
            if !check_signature(&pubkey, &signature, ctx)? {
                return Ok(Some(FailReason::SignatureCheckFailed));
            }
        }
    }
    Ok(None)
}

/// Recompute the signature digest for the current input under the spent
/// output's locking script and verify the popped signature against the
/// popped public key. The signature's trailing byte is the sighash-type
/// marker; anything but SIGHASH_ALL fails the check.
fn check_signature(pubkey: &[u8], signature: &[u8], ctx: &ExecContext) -> Result<bool> {
    let Some((&hash_type, der)) = signature.split_last() else {
        return Ok(false);
    };
    if hash_type != crate::constants::SIGHASH_ALL {
        return Ok(false);
    }

    let digest =
        engine::signature_digest(ctx.tx, ctx.input_index, &ctx.spent.script_pubkey)?;
    Ok(engine::verify_digest(pubkey, &digest, der))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Outpoint, TxInput, TxOutput};

    fn dummy_context() -> (Transaction, Utxo) {
        let outpoint = Outpoint::new([1; 32], 0);
        let tx = Transaction::new(
            vec![TxInput::unsigned(outpoint.clone())],
            vec![TxOutput {
                value: 10,
                script_pubkey: vec![],
            }],
        );
        let utxo = Utxo {
            outpoint,
            height: 100,
            value: 20,
            script_pubkey: vec![],
            coinbase: false,
        };
        (tx, utxo)
    }

    fn run(script: &[u8]) -> Result<Verdict> {
        let (tx, utxo) = dummy_context();
        execute_script(script, &tx, 0, &utxo)
    }

    #[test]
    fn test_opcode_byte_round_trip() {
        for op in [
            Opcode::Dup,
            Opcode::Drop,
            Opcode::Swap,
            Opcode::Equal,
            Opcode::EqualVerify,
            Opcode::Verify,
            Opcode::Hash160,
            Opcode::Hash256,
            Opcode::CheckSig,
            Opcode::CheckSigVerify,
        ] {
            assert_eq!(Opcode::from_byte(op.to_byte()), Some(op));
            assert_eq!(Opcode::from_name(op.name()), Some(op));
        }
    }

    #[test]
    fn test_parse_rejects_unknown_opcode() {
        assert!(matches!(parse_script(&[0xff]), Err(CoreError::Decode(_))));
    }

    #[test]
    fn test_parse_rejects_overrunning_push() {
        // Declares 5 bytes, supplies 2
        assert!(parse_script(&[0x05, 0xaa, 0xbb]).is_err());
    }

    #[test]
    fn test_parse_pushdata_forms() {
        let mut script = vec![OP_PUSHDATA1, 3, 1, 2, 3];
        script.extend_from_slice(&[OP_PUSHDATA2, 2, 0, 9, 9]);
        let instructions = parse_script(&script).unwrap();
        assert_eq!(
            instructions,
            vec![
                Instruction::Push(vec![1, 2, 3]),
                Instruction::Push(vec![9, 9]),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_oversized_push() {
        let mut script = vec![OP_PUSHDATA2];
        script.extend_from_slice(&(521u16).to_le_bytes());
        script.extend_from_slice(&[0u8; 521]);
        assert!(parse_script(&script).is_err());
    }

    #[test]
    fn test_single_truthy_push_authorizes() {
        let verdict = run(&[0x01, 0x01]).unwrap();
        assert!(verdict.is_authorized());
    }

    #[test]
    fn test_empty_push_is_falsy() {
        assert_eq!(
            run(&[0x00]).unwrap(),
            Verdict::Unauthorized(FailReason::FinalStackFalsy)
        );
    }

    #[test]
    fn test_two_items_fail_shape() {
        let verdict = run(&[0x01, 0x01, 0x01, 0x01]).unwrap();
        assert_eq!(verdict, Verdict::Unauthorized(FailReason::FinalStackShape));
    }

    #[test]
    fn test_dup_on_empty_stack_underflows() {
        assert_eq!(
            run(&[Opcode::Dup.to_byte()]).unwrap(),
            Verdict::Unauthorized(FailReason::StackUnderflow)
        );
    }

    #[test]
    fn test_equalverify_mismatch_halts() {
        let script = [0x01, 0x01, 0x01, 0x02, Opcode::EqualVerify.to_byte()];
        assert_eq!(
            run(&script).unwrap(),
            Verdict::Unauthorized(FailReason::EqualVerifyFailed)
        );
    }

    #[test]
    fn test_equalverify_match_consumes_both() {
        let script = [
            0x01,
            0x07,
            0x01,
            0x07,
            Opcode::EqualVerify.to_byte(),
            0x01,
            0x01,
        ];
        assert!(run(&script).unwrap().is_authorized());
    }

    #[test]
    fn test_leading_equalverify_underflows() {
        // Locking script starting with OP_EQUALVERIFY and no prior pushes
        let script = [Opcode::EqualVerify.to_byte()];
        assert_eq!(
            run(&script).unwrap(),
            Verdict::Unauthorized(FailReason::StackUnderflow)
        );
    }

    #[test]
    fn test_hash160_of_push() {
        let digest = crate::hashing::hash160(&[0xab]);
        let mut script = vec![0x01, 0xab, Opcode::Hash160.to_byte(), 20];
        script.extend_from_slice(&digest);
        script.push(Opcode::Equal.to_byte());
        assert!(run(&script).unwrap().is_authorized());
    }

    #[test]
    fn test_verify_consumes_and_continues() {
        let script = [0x01, 0x01, Opcode::Verify.to_byte(), 0x01, 0x05];
        assert!(run(&script).unwrap().is_authorized());
    }

    #[test]
    fn test_verify_falsy_halts() {
        let script = [0x00, Opcode::Verify.to_byte()];
        assert_eq!(
            run(&script).unwrap(),
            Verdict::Unauthorized(FailReason::VerifyFailed)
        );
    }

    #[test]
    fn test_swap_and_drop() {
        // push 2, push 5, swap, drop -> 5 left on stack
        let script = [
            0x01,
            0x02,
            0x01,
            0x05,
            Opcode::Swap.to_byte(),
            Opcode::Drop.to_byte(),
        ];
        assert!(run(&script).unwrap().is_authorized());
    }

    #[test]
    fn test_checksig_garbage_pushes_falsy() {
        // Garbage sig/pubkey: CHECKSIG pushes falsy, final stack is falsy.
        // The one-byte "signature" has its lone byte consumed as the
        // sighash marker, leaving an empty DER body.
        let script = [0x01, 0x01, 0x01, 0xbb, Opcode::CheckSig.to_byte()];
        assert_eq!(
            run(&script).unwrap(),
            Verdict::Unauthorized(FailReason::FinalStackFalsy)
        );
    }

    #[test]
    fn test_checksigverify_garbage_halts() {
        let script = [0x01, 0x01, 0x01, 0xbb, Opcode::CheckSigVerify.to_byte()];
        assert_eq!(
            run(&script).unwrap(),
            Verdict::Unauthorized(FailReason::SignatureCheckFailed)
        );
    }

    #[test]
    fn test_op_count_limit() {
        let mut script = vec![0x01, 0x01];
        for _ in 0..(MAX_SCRIPT_OPS + 1) {
            script.push(Opcode::Dup.to_byte());
        }
        assert!(matches!(run(&script), Err(CoreError::Script(_))));
    }

    #[test]
    fn test_script_size_limit() {
        let script = vec![0x00; MAX_SCRIPT_SIZE + 1];
        assert!(matches!(run(&script), Err(CoreError::Decode(_))));
    }

    #[test]
    fn test_input_index_out_of_range() {
        let (tx, utxo) = dummy_context();
        assert!(matches!(
            execute_script(&[0x01, 0x01], &tx, 5, &utxo),
            Err(CoreError::InputIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_verify_spend_hex_rejects_bad_hex() {
        let (tx, utxo) = dummy_context();
        assert!(verify_spend_hex("zz", &tx, 0, &utxo).is_err());
    }
}
