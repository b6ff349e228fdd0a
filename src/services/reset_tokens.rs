use rand::Rng;
use sha2::{Digest, Sha256};

const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";
const TOKEN_LEN: usize = 48;

/// Raw token handed to the user; only its hash is stored.
pub(crate) fn generate_reset_token() -> String {
    let mut rng = rand::thread_rng();
    let mut output = String::with_capacity(TOKEN_LEN);
    for _ in 0..TOKEN_LEN {
        let index = rng.gen_range(0..ALPHABET.len());
        output.push(ALPHABET[index] as char);
    }
    output
}

pub(crate) fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique_and_sized() {
        let first = generate_reset_token();
        let second = generate_reset_token();
        assert_eq!(first.len(), TOKEN_LEN);
        assert_ne!(first, second);
    }

    #[test]
    fn hash_is_stable_hex_sha256() {
        let token = "fixed-token";
        assert_eq!(hash_reset_token(token), hash_reset_token(token));
        assert_eq!(hash_reset_token(token).len(), 64);
        assert_ne!(hash_reset_token(token), hash_reset_token("other-token"));
    }
}
