use rand::Rng;

use crate::models::SyncError;

const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ROOM_CODE_LEN: usize = 6;

/// Generate a fresh 6 character room code
pub fn generate_room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_CHARS[rng.gen_range(0..ROOM_CODE_CHARS.len())] as char)
        .collect()
}

/// Canonical form of a user-entered room code
pub fn normalize_room_code(input: &str) -> Result<String, SyncError> {
    let code = input.trim().to_ascii_uppercase();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SyncError::InvalidRoomCode(input.to_string()));
    }
    Ok(code)
}
