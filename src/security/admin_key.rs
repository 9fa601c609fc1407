//! Static admin key comparison.
//!
//! Keys pasted into HTTP clients or `.env` files often pick up stray CR/LF,
//! BOMs or other control characters, so both sides are normalized first.

use rand::RngCore;

/// Strip CR/LF, BOM and ASCII control characters, then trim.
pub fn normalize_key(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '\u{FEFF}' && !c.is_ascii_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Hex-only lowercase form when it is exactly 64 hex chars.
fn hex_form(value: &str) -> Option<String> {
    let hex_only: String = value
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (hex_only.len() == 64).then_some(hex_only)
}

/// Whether a presented key matches the configured one. An empty configured
/// key never matches.
pub fn key_matches(expected: &str, presented: &str) -> bool {
    let expected = normalize_key(expected);
    let presented = normalize_key(presented);
    if expected.is_empty() || presented.is_empty() {
        return false;
    }
    if expected == presented {
        return true;
    }
    match (hex_form(&expected), hex_form(&presented)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Fresh 32-byte key, hex encoded.
pub fn generate_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_exact_match() {
        assert!(key_matches("plain-secret", "plain-secret"));
        assert!(!key_matches("plain-secret", "plain-secreT"));
    }

    #[test]
    fn test_strips_hidden_characters() {
        assert!(key_matches("plain-secret", "\u{FEFF}plain-secret\r\n"));
        assert!(key_matches(" plain-secret\n", "plain-secret"));
    }

    #[test]
    fn test_hex_key_ignores_case_and_noise() {
        let noisy = format!("{}\u{200B}", KEY.to_uppercase());
        assert!(key_matches(KEY, &noisy));
    }

    #[test]
    fn test_empty_never_matches() {
        assert!(!key_matches("", ""));
        assert!(!key_matches("", "anything"));
        assert!(!key_matches(KEY, "\r\n"));
    }

    #[test]
    fn test_generated_key_shape() {
        let key = generate_key();
        assert_eq!(key.len(), 64);
        assert!(key_matches(&key, &key.to_uppercase()));
    }
}
