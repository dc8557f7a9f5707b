//! Random identifiers
//!
//! Meeting ids, room ids, invite tokens and peer ids all come from the OS
//! random source and are hex encoded, so they are safe in URL paths and
//! query strings without escaping.

use crate::error::AccessError;

/// Random bytes in a meeting id (96 bits)
pub const MEETING_ID_BYTES: usize = 12;

/// Random bytes in an invite token (144 bits)
pub const TOKEN_BYTES: usize = 18;

/// Random bytes in a room id
pub const ROOM_ID_BYTES: usize = 8;

/// Random bytes in a peer id (unique within a room only)
pub const PEER_ID_BYTES: usize = 8;

/// Prefix that marks room ids
pub const ROOM_ID_PREFIX: &str = "r-";

/// Generate `len` random bytes, hex encoded
pub fn random_hex(len: usize) -> Result<String, AccessError> {
    let mut bytes = vec![0u8; len];
    getrandom::fill(&mut bytes)?;
    Ok(hex::encode(bytes))
}

pub fn meeting_id() -> Result<String, AccessError> {
    random_hex(MEETING_ID_BYTES)
}

pub fn room_id() -> Result<String, AccessError> {
    Ok(format!("{}{}", ROOM_ID_PREFIX, random_hex(ROOM_ID_BYTES)?))
}

pub fn token() -> Result<String, AccessError> {
    random_hex(TOKEN_BYTES)
}

pub fn peer_id() -> Result<String, AccessError> {
    random_hex(PEER_ID_BYTES)
}
