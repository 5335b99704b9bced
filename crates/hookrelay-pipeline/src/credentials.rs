// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account secrets and session tokens.
//!
//! Account secrets are UUID v4 strings in lowercase hyphenated form. Session
//! tokens are random hex strings; only their SHA-256 digest is stored.

use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Number of random bytes in a session token.
const SESSION_TOKEN_BYTES: usize = 32;

/// Generate a fresh account secret.
pub fn generate_account_secret() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Canonicalize a presented account secret.
///
/// Accepts only the 36-character hyphenated form (any hex case) and returns it
/// lowercased. Braced, URN, and unhyphenated spellings are rejected.
pub fn parse_secret_token(raw: &str) -> Option<String> {
    if raw.len() != 36 {
        return None;
    }
    let uuid = Uuid::try_parse(raw).ok()?;
    let canonical = uuid.hyphenated().to_string();
    canonical.eq_ignore_ascii_case(raw).then_some(canonical)
}

/// Issue a new plaintext session token.
pub fn issue_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest of a session token, as stored.
pub fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_is_canonical() {
        let secret = generate_account_secret();
        assert_eq!(parse_secret_token(&secret).as_deref(), Some(secret.as_str()));
    }

    #[test]
    fn uppercase_secret_is_lowercased() {
        assert_eq!(
            parse_secret_token("AAAAAAAA-BBBB-4CCC-8DDD-EEEEEEEEEEEE").as_deref(),
            Some("aaaaaaaa-bbbb-4ccc-8ddd-eeeeeeeeeeee")
        );
    }

    #[test]
    fn non_canonical_spellings_are_rejected() {
        for raw in [
            "",
            "not-a-uuid",
            "11111111111111111111111111111111",
            "{11111111-1111-1111-1111-111111111111}",
            "urn:uuid:11111111-1111-1111-1111-111111111111",
            "11111111-1111-1111-1111-11111111111g",
            " 11111111-1111-1111-1111-11111111111",
        ] {
            assert!(parse_secret_token(raw).is_none(), "{raw:?} should be rejected");
        }
    }

    proptest::proptest! {
        #[test]
        fn any_uuid_parses_in_either_case(bytes in proptest::array::uniform16(proptest::num::u8::ANY)) {
            let canonical = Uuid::from_bytes(bytes).hyphenated().to_string();
            let upper = canonical.to_uppercase();
            proptest::prop_assert_eq!(parse_secret_token(&upper), Some(canonical.clone()));
            proptest::prop_assert_eq!(parse_secret_token(&canonical), Some(canonical));
        }
    }

    #[test]
    fn session_tokens_are_unique_hex() {
        let a = issue_session_token();
        let b = issue_session_token();
        assert_eq!(a.len(), SESSION_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn digest_is_stable_sha256() {
        assert_eq!(
            digest_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
