use alloy::{hex, sol_types::decode_revert_reason};

/// Best-effort decoding of a failed contract execution into a readable
/// revert reason. `None` when the result carries no recognizable revert data,
/// in which case callers fall back to the ledger's own message.
pub fn try_resolve_revert_message(code: i32, message: &str) -> Option<String> {
    if code == 0 {
        return None;
    }
    let revert_hex = extract_revert_hex(message)?;
    let data = hex::decode(revert_hex).ok()?;
    if data.len() < 4 {
        return None;
    }
    decode_revert_reason(&data)
}

/// The message itself when it is hex, else the first `0x...` token in it.
fn extract_revert_hex(message: &str) -> Option<&str> {
    let trimmed = message.trim();
    if is_hex(trimmed.strip_prefix("0x").unwrap_or(trimmed)) {
        return Some(trimmed);
    }
    let start = trimmed.find("0x")?;
    let token = trimmed[start..]
        .split(|c: char| !(c.is_ascii_hexdigit() || c == 'x'))
        .next()?;
    is_hex(&token[2..]).then_some(token)
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}
