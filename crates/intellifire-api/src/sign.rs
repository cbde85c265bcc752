// ── Challenge-response signing ──
//
// The local firmware authorizes control commands with a double-SHA256 over
// the API key, a short-lived challenge nonce, and the command payload:
//
//   payload  = "post:command={name}&value={value}"
//   inner    = SHA256(api_key || challenge || payload)
//   response = SHA256(api_key || inner)
//
// Pure functions, no I/O. The algorithm must match the device bit-for-bit or
// every command is rejected with a 403.

use sha2::{Digest, Sha256};

use crate::error::Error;

/// Compute the hex-encoded `response` digest for a local command.
///
/// `api_key_hex` and `challenge_hex` are decoded to raw bytes before
/// hashing; fails with [`Error::InvalidKeyFormat`] if either is not valid
/// hex. Deterministic for identical inputs.
pub fn sign(
    api_key_hex: &str,
    challenge_hex: &str,
    command_name: &str,
    value: u16,
) -> Result<String, Error> {
    let api_key = hex::decode(api_key_hex)?;
    let challenge = hex::decode(challenge_hex)?;

    let payload = format!("post:command={command_name}&value={value}");

    let mut inner = Sha256::new();
    inner.update(&api_key);
    inner.update(&challenge);
    inner.update(payload.as_bytes());
    let inner = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(&api_key);
    outer.update(inner);

    Ok(hex::encode(outer.finalize()))
}

/// Build the full signed form body for `POST /post`:
/// `command={name}&value={value}&user={user_id}&response={sig}`.
pub fn signed_body(
    api_key_hex: &str,
    challenge_hex: &str,
    command_name: &str,
    value: u16,
    user_id: &str,
) -> Result<String, Error> {
    let response = sign(api_key_hex, challenge_hex, command_name, value)?;
    Ok(format!(
        "command={command_name}&value={value}&user={user_id}&response={response}"
    ))
}
