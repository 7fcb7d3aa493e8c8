//! Script assembler / disassembler
//!
//! Translates between the human-readable token form of a script and its
//! packed bytes. A token list is a flat sequence: bare opcode names
//! (`OP_DUP`), or a push directive (`OP_PUSHBYTES_N`, `OP_PUSHDATA1`,
//! `OP_PUSHDATA2`, `OP_0`) followed by its hex payload. Disassembly
//! preserves the push form it finds, so reassembling its output reproduces
//! the original bytes.

use crate::constants::MAX_PUSH_SIZE;
use crate::error::{CoreError, Result};
use crate::script::{Opcode, OP_PUSHDATA1, OP_PUSHDATA2};

/// Assemble a token list into packed script bytes.
///
/// Errors: unknown opcode name, missing or invalid hex payload, payload
/// length disagreeing with the declared push width, push beyond the
/// 520-byte cap.
pub fn assemble<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<u8>> {
    let mut script = Vec::new();
    let mut iter = tokens.iter().map(|t| t.as_ref());
    while let Some(token) = iter.next() {
        if token == "OP_0" {
            script.push(0x00);
        } else if let Some(declared) = token.strip_prefix("OP_PUSHBYTES_") {
            let len: usize = declared
                .parse()
                .map_err(|_| CoreError::Decode(format!("bad push width in {token}")))?;
            if len == 0 || len > 75 {
                return Err(CoreError::Decode(format!(
                    "push width {len} outside 1..=75"
                )));
            }
            let payload = next_payload(&mut iter, token)?;
            if payload.len() != len {
                return Err(CoreError::Decode(format!(
                    "{token} payload is {} bytes",
                    payload.len()
                )));
            }
            script.push(len as u8);
            script.extend_from_slice(&payload);
        } else if token == "OP_PUSHDATA1" {
            let payload = next_payload(&mut iter, token)?;
            if payload.len() > 0xff {
                return Err(CoreError::Decode(format!(
                    "{token} payload is {} bytes",
                    payload.len()
                )));
            }
            script.push(OP_PUSHDATA1);
            script.push(payload.len() as u8);
            script.extend_from_slice(&payload);
        } else if token == "OP_PUSHDATA2" {
            let payload = next_payload(&mut iter, token)?;
            script.push(OP_PUSHDATA2);
            script.extend_from_slice(&(payload.len() as u16).to_le_bytes());
            script.extend_from_slice(&payload);
        } else if let Some(op) = Opcode::from_name(token) {
            script.push(op.to_byte());
        } else {
            return Err(CoreError::Decode(format!("unknown opcode name {token}")));
        }
    }
    Ok(script)
}

fn next_payload<'a, I: Iterator<Item = &'a str>>(iter: &mut I, token: &str) -> Result<Vec<u8>> {
    let raw = iter
        .next()
        .ok_or_else(|| CoreError::Decode(format!("{token} missing payload")))?;
    let payload =
        hex::decode(raw).map_err(|e| CoreError::Decode(format!("{token} payload: {e}")))?;
    if payload.len() > MAX_PUSH_SIZE {
        return Err(CoreError::Decode(format!(
            "{token} payload of {} bytes exceeds limit",
            payload.len()
        )));
    }
    Ok(payload)
}

/// Disassemble packed script bytes into the token form.
///
/// Errors: push length overrunning the script, unknown opcode byte.
pub fn disassemble(script: &[u8]) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut offset = 0;
    while offset < script.len() {
        let byte = script[offset];
        offset += 1;
        match byte {
            0x00 => tokens.push("OP_0".to_string()),
            0x01..=0x4b => {
                let len = byte as usize;
                tokens.push(format!("OP_PUSHBYTES_{len}"));
                tokens.push(hex::encode(take(script, &mut offset, len)?));
            }
            OP_PUSHDATA1 => {
                let len = *script.get(offset).ok_or_else(truncated)? as usize;
                offset += 1;
                tokens.push("OP_PUSHDATA1".to_string());
                tokens.push(hex::encode(take(script, &mut offset, len)?));
            }
            OP_PUSHDATA2 => {
                let raw = script.get(offset..offset + 2).ok_or_else(truncated)?;
                let len = u16::from_le_bytes([raw[0], raw[1]]) as usize;
                offset += 2;
                if len > MAX_PUSH_SIZE {
                    return Err(CoreError::Decode(format!(
                        "push of {len} bytes exceeds limit"
                    )));
                }
                tokens.push("OP_PUSHDATA2".to_string());
                tokens.push(hex::encode(take(script, &mut offset, len)?));
            }
            other => match Opcode::from_byte(other) {
                Some(op) => tokens.push(op.name().to_string()),
                None => {
                    return Err(CoreError::Decode(format!(
                        "unknown opcode 0x{other:02x} at offset {}",
                        offset - 1
                    )))
                }
            },
        }
    }
    Ok(tokens)
}

fn take<'a>(script: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8]> {
    let slice = script.get(*offset..*offset + len).ok_or_else(truncated)?;
    *offset += len;
    Ok(slice)
}

fn truncated() -> CoreError {
    CoreError::Decode("truncated push".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_p2pkh_locking_script() {
        let pubkey_hash = "89abcdefabbaabbaabbaabbaabbaabbaabbaabba";
        let tokens = [
            "OP_DUP",
            "OP_HASH160",
            "OP_PUSHBYTES_20",
            pubkey_hash,
            "OP_EQUALVERIFY",
            "OP_CHECKSIG",
        ];
        let script = assemble(&tokens).unwrap();
        assert_eq!(script.len(), 25);
        assert_eq!(script[0], 0x76);
        assert_eq!(script[2], 20);
        assert_eq!(hex::encode(&script[3..23]), pubkey_hash);
    }

    #[test]
    fn test_round_trip_byte_identical() {
        let tokens = [
            "OP_DUP",
            "OP_HASH160",
            "OP_PUSHBYTES_3",
            "aabbcc",
            "OP_EQUALVERIFY",
            "OP_0",
            "OP_CHECKSIG",
        ];
        let script = assemble(&tokens).unwrap();
        let recovered = disassemble(&script).unwrap();
        assert_eq!(assemble(&recovered).unwrap(), script);
    }

    #[test]
    fn test_non_minimal_push_survives_round_trip() {
        // OP_PUSHDATA1 with a 3-byte payload is non-minimal but legal;
        // disassembly preserves the form, so reassembly is byte-identical.
        let script = vec![OP_PUSHDATA1, 3, 1, 2, 3];
        let tokens = disassemble(&script).unwrap();
        assert_eq!(tokens[0], "OP_PUSHDATA1");
        assert_eq!(assemble(&tokens).unwrap(), script);
    }

    #[test]
    fn test_assemble_unknown_name() {
        assert!(assemble(&["OP_NOPE"]).is_err());
    }

    #[test]
    fn test_assemble_missing_payload() {
        assert!(assemble(&["OP_PUSHBYTES_20"]).is_err());
    }

    #[test]
    fn test_assemble_length_mismatch() {
        assert!(assemble(&["OP_PUSHBYTES_20", "aabb"]).is_err());
    }

    #[test]
    fn test_assemble_bad_hex() {
        assert!(assemble(&["OP_PUSHBYTES_2", "zzzz"]).is_err());
    }

    #[test]
    fn test_assemble_oversized_pushdata2() {
        let payload = "00".repeat(MAX_PUSH_SIZE + 1);
        assert!(assemble(&["OP_PUSHDATA2", payload.as_str()]).is_err());
    }

    #[test]
    fn test_disassemble_truncated_push() {
        assert!(disassemble(&[0x05, 0xaa]).is_err());
        assert!(disassemble(&[OP_PUSHDATA1]).is_err());
        assert!(disassemble(&[OP_PUSHDATA2, 0x02]).is_err());
    }

    #[test]
    fn test_disassemble_unknown_byte() {
        assert!(disassemble(&[0xff]).is_err());
    }

    #[test]
    fn test_disassemble_names() {
        let script = vec![0x76, 0xa9, 0x88, 0xac];
        assert_eq!(
            disassemble(&script).unwrap(),
            vec!["OP_DUP", "OP_HASH160", "OP_EQUALVERIFY", "OP_CHECKSIG"]
        );
    }
}
