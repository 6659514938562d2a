use std::str::FromStr;

use derive_more::Display;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::common::PASSKEY_LENGTH;

/// The token that authenticates a user on the HTTP tracker, embedded as the
/// first URL path segment. Always 40 lowercase hexadecimal characters, fixed
/// at creation time.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, Display, Hash)]
pub struct Passkey(String);

impl Passkey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Generates a fresh passkey from 20 random bytes.
#[must_use]
pub fn generate() -> Passkey {
    let mut random_bytes = [0u8; PASSKEY_LENGTH / 2];
    thread_rng().fill(&mut random_bytes[..]);

    let mut hex = [0u8; PASSKEY_LENGTH];
    binascii::bin2hex(&random_bytes, &mut hex).expect("failed to hexlify passkey bytes");

    Passkey(String::from_utf8_lossy(&hex).into_owned())
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParsePasskeyError {
    #[error("passkey must be {PASSKEY_LENGTH} characters, got {0}")]
    InvalidLength(usize),
    #[error("passkey must be lowercase hexadecimal")]
    InvalidCharacter,
}

impl FromStr for Passkey {
    type Err = ParsePasskeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != PASSKEY_LENGTH {
            return Err(ParsePasskeyError::InvalidLength(s.len()));
        }
        if !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(ParsePasskeyError::InvalidCharacter);
        }
        Ok(Passkey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{generate, ParsePasskeyError, Passkey};

    #[test]
    fn generated_passkeys_are_40_lowercase_hex_characters() {
        let passkey = generate();

        assert_eq!(passkey.as_str().len(), 40);
        assert!(passkey
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn generated_passkeys_are_unique() {
        assert_ne!(generate(), generate());
    }

    #[test]
    fn a_valid_passkey_string_parses() {
        let raw = "b92b07d6b7ffff1337beefcafe00112233445566";
        assert_eq!(Passkey::from_str(raw).unwrap().as_str(), raw);
    }

    #[test]
    fn a_short_passkey_string_is_rejected() {
        assert_eq!(Passkey::from_str("abc123"), Err(ParsePasskeyError::InvalidLength(6)));
    }

    #[test]
    fn uppercase_hex_is_rejected() {
        let raw = "B92B07D6B7FFFF1337BEEFCAFE00112233445566";
        assert_eq!(Passkey::from_str(raw), Err(ParsePasskeyError::InvalidCharacter));
    }

    #[test]
    fn non_hex_characters_are_rejected() {
        let raw = "zzzz07d6b7ffff1337beefcafe00112233445566";
        assert_eq!(Passkey::from_str(raw), Err(ParsePasskeyError::InvalidCharacter));
    }
}
