//! Cipher suite registry.
//!
//! A suite is a cipher family plus mode plus padding plus key size,
//! identified by a canonical name string such as
//! `AES/KeyWrap/RFC5649Padding/256`. The registry is a static table;
//! resolving a name is an exact, case-sensitive lookup, never a prefix
//! or fuzzy match.

pub mod aes_keywrap_5649;

use crate::error::{Error, Result};
use crate::secret::Protected;

/// A registered cipher suite.
///
/// Suites are immutable and registry-owned; callers only ever see
/// `&'static CipherSuite` references.
pub struct CipherSuite {
    /// Canonical suite name, e.g. `AES/KeyWrap/RFC5649Padding/128`.
    pub name: &'static str,
    /// The only key length this suite accepts, in bytes.
    pub key_bytes: usize,
    wrap_fn: fn(&[u8], &[u8]) -> Result<Vec<u8>>,
    unwrap_fn: fn(&[u8], &[u8]) -> Result<Vec<u8>>,
}

impl CipherSuite {
    /// Encrypts `plaintext` under `key` using this suite's transform.
    ///
    /// Fails with `InvalidKeySize` if `key.len() != self.key_bytes`,
    /// `InvalidInputSize` if `plaintext` is out of bounds, or
    /// `CryptoBackend` on an unexpected failure from the underlying
    /// primitive.
    pub fn wrap(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        self.check_key(key)?;
        (self.wrap_fn)(key, plaintext)
    }

    /// Decrypts `ciphertext` under `key`, recovering the plaintext.
    ///
    /// Same preconditions as [`CipherSuite::wrap`]; additionally fails
    /// with `IntegrityFailure` when the authentication/IV check rejects
    /// the input.
    pub fn unwrap(&self, key: &[u8], ciphertext: &[u8]) -> Result<Protected> {
        self.check_key(key)?;
        (self.unwrap_fn)(key, ciphertext).map(Protected::new)
    }

    fn check_key(&self, key: &[u8]) -> Result<()> {
        if key.len() != self.key_bytes {
            return Err(Error::InvalidKeySize(format!(
                "suite {} requires a {}-byte key, got {}",
                self.name,
                self.key_bytes,
                key.len()
            )));
        }
        Ok(())
    }
}

const SUITES: &[CipherSuite] = &[
    CipherSuite {
        name: "AES/KeyWrap/RFC5649Padding/128",
        key_bytes: 16,
        wrap_fn: aes_keywrap_5649::wrap,
        unwrap_fn: aes_keywrap_5649::unwrap,
    },
    CipherSuite {
        name: "AES/KeyWrap/RFC5649Padding/192",
        key_bytes: 24,
        wrap_fn: aes_keywrap_5649::wrap,
        unwrap_fn: aes_keywrap_5649::unwrap,
    },
    CipherSuite {
        name: "AES/KeyWrap/RFC5649Padding/256",
        key_bytes: 32,
        wrap_fn: aes_keywrap_5649::wrap,
        unwrap_fn: aes_keywrap_5649::unwrap,
    },
];

/// Resolves a suite name to its descriptor.
///
/// Lookup is exact and case-sensitive; there is no fallback or fuzzy
/// matching. Unknown names return `UnknownCipher`.
pub fn lookup(name: &str) -> Result<&'static CipherSuite> {
    SUITES
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| Error::UnknownCipher(name.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup_known_suites() {
        for name in [
            "AES/KeyWrap/RFC5649Padding/128",
            "AES/KeyWrap/RFC5649Padding/192",
            "AES/KeyWrap/RFC5649Padding/256",
        ] {
            assert_eq!(lookup(name).unwrap().name, name);
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(lookup("aes/keywrap/rfc5649padding/128").is_err());
    }

    #[test]
    fn lookup_rejects_unknown_name() {
        assert!(matches!(lookup("AES/GCM/NoPadding/128"), Err(Error::UnknownCipher(_))));
    }

    #[test]
    fn wrap_rejects_wrong_key_size() {
        let suite = lookup("AES/KeyWrap/RFC5649Padding/128").unwrap();
        assert!(matches!(suite.wrap(&[0u8; 24], b"hello"), Err(Error::InvalidKeySize(_))));
    }

    #[test]
    fn wrap_then_unwrap_round_trips() {
        let suite = lookup("AES/KeyWrap/RFC5649Padding/256").unwrap();
        let key = [7u8; 32];
        let ct = suite.wrap(&key, b"top secret payload").unwrap();
        let pt = suite.unwrap(&key, &ct).unwrap();
        assert_eq!(&*pt, b"top secret payload");
    }
}
