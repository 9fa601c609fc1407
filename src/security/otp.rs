use rand::Rng;
use sha2::{Digest, Sha256};

/// Six-digit numeric code, uniform over 100000..=999999.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Hash binding a code to the pepper and the normalized email.
pub fn hash_code(pepper: &str, email: &str, code: &str) -> String {
    let input = format!("{}:{}:{}", pepper, email.trim().to_lowercase(), code);
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Constant-time comparison of two hex digests.
pub fn hashes_match(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn is_six_digits(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}
