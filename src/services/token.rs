use ring::error::Unspecified;
use ring::rand::{SecureRandom, SystemRandom};

pub const TOKEN_LEN: usize = 10;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// Largest multiple of the alphabet size that fits in a byte; bytes at or
// above it are discarded so every character is equally likely.
const ACCEPT_BELOW: u8 = (256 / ALPHABET.len() * ALPHABET.len()) as u8;

/// Generates a random alphanumeric card token
pub fn generate() -> Result<String, Unspecified> {
    let rng = SystemRandom::new();
    let mut token = String::with_capacity(TOKEN_LEN);
    let mut buf = [0u8; 32];

    while token.len() < TOKEN_LEN {
        rng.fill(&mut buf)?;
        for byte in buf {
            if byte < ACCEPT_BELOW {
                token.push(ALPHABET[(byte as usize) % ALPHABET.len()] as char);
                if token.len() == TOKEN_LEN {
                    break;
                }
            }
        }
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_shape() {
        let token = generate().unwrap();

        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_are_distinct() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate().unwrap()).collect();

        assert_eq!(tokens.len(), 1000);
    }
}
