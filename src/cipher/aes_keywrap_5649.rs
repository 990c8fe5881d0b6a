//! AES Key Wrap with Padding, RFC 5649.
//!
//! Implements the wrap/unwrap transformation of [RFC 5649 §4], built
//! directly on the AES codebook at 128/192/256 bits. The surrounding
//! registry entry (`super::registry`) is what callers actually invoke;
//! this module only concerns itself with the wire-level transform.
//!
//!   [RFC 5649 §4]: https://www.rfc-editor.org/rfc/rfc5649#section-4

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};

use crate::error::{Error, Result};

/// Largest plaintext this engine will wrap: 2^32 - 8 bytes, per RFC 5649's
/// 32-bit message length indicator.
pub const MAX_WRAP_INPUT: u64 = (1u64 << 32) - 8;

const ICV2: [u8; 4] = [0xA6, 0x59, 0x59, 0xA6];
const SEMIBLOCK: usize = 8;

enum Codebook {
    Aes128(Box<Aes128>),
    Aes192(Box<Aes192>),
    Aes256(Box<Aes256>),
}

impl Codebook {
    fn new(key: &[u8]) -> Result<Self> {
        match key.len() {
            16 => Ok(Codebook::Aes128(Box::new(Aes128::new(GenericArray::from_slice(key))))),
            24 => Ok(Codebook::Aes192(Box::new(Aes192::new(GenericArray::from_slice(key))))),
            32 => Ok(Codebook::Aes256(Box::new(Aes256::new(GenericArray::from_slice(key))))),
            n => Err(Error::InvalidKeySize(format!("{} bytes, expected 16, 24, or 32", n))),
        }
    }

    fn encrypt_block(&self, block: &mut [u8; 16]) {
        let mut ga = GenericArray::clone_from_slice(block);
        match self {
            Codebook::Aes128(c) => c.encrypt_block(&mut ga),
            Codebook::Aes192(c) => c.encrypt_block(&mut ga),
            Codebook::Aes256(c) => c.encrypt_block(&mut ga),
        }
        block.copy_from_slice(&ga);
    }

    fn decrypt_block(&self, block: &mut [u8; 16]) {
        let mut ga = GenericArray::clone_from_slice(block);
        match self {
            Codebook::Aes128(c) => c.decrypt_block(&mut ga),
            Codebook::Aes192(c) => c.decrypt_block(&mut ga),
            Codebook::Aes256(c) => c.decrypt_block(&mut ga),
        }
        block.copy_from_slice(&ga);
    }
}

/// Wraps `plaintext` under `key`, producing an RFC 5649 ciphertext.
///
/// `key.len()` must be 16, 24, or 32. `plaintext` must be non-empty and
/// no longer than [`MAX_WRAP_INPUT`]. Output length is
/// `ceil(plaintext.len() / 8) * 8 + 8`.
pub fn wrap(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    if plaintext.is_empty() {
        return Err(Error::InvalidInputSize("plaintext is empty".into()));
    }
    if plaintext.len() as u64 > MAX_WRAP_INPUT {
        return Err(Error::InvalidInputSize(format!(
            "plaintext of {} bytes exceeds the {} byte limit",
            plaintext.len(),
            MAX_WRAP_INPUT
        )));
    }
    let codebook = Codebook::new(key)?;

    let padded_len = round_up_8(plaintext.len());
    let mut padded = vec![0u8; padded_len];
    padded[..plaintext.len()].copy_from_slice(plaintext);

    let mut aiv = [0u8; 8];
    aiv[..4].copy_from_slice(&ICV2);
    aiv[4..].copy_from_slice(&(plaintext.len() as u32).to_be_bytes());

    let n = padded_len / SEMIBLOCK;
    if n == 1 {
        let mut block = [0u8; 16];
        block[..8].copy_from_slice(&aiv);
        block[8..].copy_from_slice(&padded);
        codebook.encrypt_block(&mut block);
        return Ok(block.to_vec());
    }

    let mut a = aiv;
    let mut r: Vec<[u8; 8]> = padded.chunks_exact(SEMIBLOCK).map(|c| {
        let mut b = [0u8; 8];
        b.copy_from_slice(c);
        b
    }).collect();

    for j in 0..=5u64 {
        for i in 0..n {
            let mut block = [0u8; 16];
            block[..8].copy_from_slice(&a);
            block[8..].copy_from_slice(&r[i]);
            codebook.encrypt_block(&mut block);

            let t = j * (n as u64) + (i as u64 + 1);
            a.copy_from_slice(&block[..8]);
            xor_counter(&mut a, t);
            r[i].copy_from_slice(&block[8..]);
        }
    }

    let mut out = Vec::with_capacity(8 + padded_len);
    out.extend_from_slice(&a);
    for semiblock in &r {
        out.extend_from_slice(semiblock);
    }
    Ok(out)
}

/// Unwraps `ciphertext` under `key`, recovering the original plaintext.
///
/// `ciphertext.len()` must be at least 16, a multiple of 8, and no more
/// than `MAX_WRAP_INPUT + 8`. Any integrity check failure (bad ICV, bad
/// length counter, non-zero padding) is reported as `IntegrityFailure`
/// without distinguishing which check failed.
pub fn unwrap(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < 16 {
        return Err(Error::InvalidInputSize(format!(
            "ciphertext of {} bytes is shorter than the minimum of 16",
            ciphertext.len()
        )));
    }
    if ciphertext.len() % SEMIBLOCK != 0 {
        return Err(Error::InvalidInputSize("ciphertext is not a multiple of 8 bytes".into()));
    }
    if ciphertext.len() as u64 > MAX_WRAP_INPUT + 8 {
        return Err(Error::InvalidInputSize(format!(
            "ciphertext of {} bytes exceeds the {} byte limit",
            ciphertext.len(),
            MAX_WRAP_INPUT + 8
        )));
    }
    let codebook = Codebook::new(key)?;

    let n = ciphertext.len() / SEMIBLOCK - 1;
    let (a, padded) = if n == 1 {
        let mut block = [0u8; 16];
        block.copy_from_slice(ciphertext);
        codebook.decrypt_block(&mut block);
        let mut a = [0u8; 8];
        a.copy_from_slice(&block[..8]);
        (a, block[8..].to_vec())
    } else {
        let mut a = [0u8; 8];
        a.copy_from_slice(&ciphertext[..8]);
        let mut r: Vec<[u8; 8]> = ciphertext[8..].chunks_exact(SEMIBLOCK).map(|c| {
            let mut b = [0u8; 8];
            b.copy_from_slice(c);
            b
        }).collect();

        for j in (0..=5u64).rev() {
            for i in (0..n).rev() {
                let t = j * (n as u64) + (i as u64 + 1);
                xor_counter(&mut a, t);

                let mut block = [0u8; 16];
                block[..8].copy_from_slice(&a);
                block[8..].copy_from_slice(&r[i]);
                codebook.decrypt_block(&mut block);

                a.copy_from_slice(&block[..8]);
                r[i].copy_from_slice(&block[8..]);
            }
        }

        let mut padded = Vec::with_capacity(n * SEMIBLOCK);
        for semiblock in &r {
            padded.extend_from_slice(semiblock);
        }
        (a, padded)
    };

    // Constant-time-ish checks: evaluate every predicate before branching,
    // so integrity failures are indistinguishable regardless of which
    // check is the one that actually failed.
    let icv_ok = subtle::ConstantTimeEq::ct_eq(&a[..4], &ICV2[..]).into();
    let mli = u32::from_be_bytes([a[4], a[5], a[6], a[7]]) as usize;
    let length_ok = mli <= padded.len() && mli > padded.len().saturating_sub(SEMIBLOCK);
    let padding_ok = if mli <= padded.len() {
        padded[mli..].iter().fold(0u8, |acc, b| acc | b) == 0
    } else {
        false
    };

    if !(icv_ok && length_ok && padding_ok) {
        return Err(Error::IntegrityFailure);
    }

    Ok(padded[..mli].to_vec())
}

fn round_up_8(n: usize) -> usize {
    (n + 7) & !7
}

fn xor_counter(a: &mut [u8; 8], t: u64) {
    let t_bytes = t.to_be_bytes();
    for i in 0..8 {
        a[i] ^= t_bytes[i];
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn s1_wrap_128_of_20_bytes() {
        let key = [0u8; 16];
        let plaintext: Vec<u8> = (0u8..=0x13).collect();
        let ct = wrap(&key, &plaintext).unwrap();
        assert_eq!(ct.len(), 32);
        let pt = unwrap(&key, &ct).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn s2_wrap_256_of_1_byte() {
        let key = [0u8; 32];
        let plaintext = [0xA6u8];
        let ct = wrap(&key, &plaintext).unwrap();
        assert_eq!(ct.len(), 16);
        let pt = unwrap(&key, &ct).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn s6_tamper_detected() {
        let key = [0u8; 16];
        let plaintext: Vec<u8> = (0u8..=0x13).collect();
        let mut ct = wrap(&key, &plaintext).unwrap();
        ct[0] ^= 1;
        assert_eq!(unwrap(&key, &ct).unwrap_err(), Error::IntegrityFailure);
    }

    #[test]
    fn rejects_empty_plaintext() {
        assert!(matches!(wrap(&[0u8; 16], &[]), Err(Error::InvalidInputSize(_))));
    }

    #[test]
    fn multi_block_plaintext_round_trips() {
        // Nine bytes pads to two semiblocks, past the single-block special
        // case exercised by s2_wrap_256_of_1_byte.
        let key = [0u8; 16];
        let plaintext = vec![0u8; 9];
        let ct = wrap(&key, &plaintext).unwrap();
        assert_eq!(ct.len(), 24);
        assert_eq!(unwrap(&key, &ct).unwrap(), plaintext);
    }

    #[test]
    fn rejects_short_ciphertext() {
        assert!(matches!(unwrap(&[0u8; 16], &[0u8; 8]), Err(Error::InvalidInputSize(_))));
    }

    #[test]
    fn rejects_misaligned_ciphertext() {
        assert!(matches!(unwrap(&[0u8; 16], &[0u8; 17]), Err(Error::InvalidInputSize(_))));
    }

    #[test]
    fn rejects_bad_key_size() {
        assert!(matches!(wrap(&[0u8; 20], &[1]), Err(Error::InvalidKeySize(_))));
    }

    #[test]
    fn roundtrip_all_key_sizes_and_small_lengths() {
        for key_len in [16usize, 24, 32] {
            let key = vec![0x42u8; key_len];
            for len in 1..=64usize {
                let plaintext: Vec<u8> = (0..len as u32).map(|i| (i % 256) as u8).collect();
                let ct = wrap(&key, &plaintext).unwrap();
                assert_eq!(ct.len(), round_up_8(len) + 8);
                let pt = unwrap(&key, &ct).unwrap();
                assert_eq!(pt, plaintext);
            }
        }
    }
}
