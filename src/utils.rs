/// Invitation tokens are stored uppercase; guest input is normalized the
/// same way before lookup.
pub fn normalize_token(token: &str) -> String {
    token.to_uppercase()
}

/// Compare the admin secret without leaking where the mismatch is.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }

    diff == 0
}
