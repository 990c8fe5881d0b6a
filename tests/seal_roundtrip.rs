//! End-to-end seal/unseal and envelope scenarios against a fake TPM
//! session, plus property-based coverage of the wrap/unwrap contract.

use std::collections::HashMap;

use kmyth_ski::cipher::aes_keywrap_5649;
use kmyth_ski::envelope::Envelope;
use kmyth_ski::error::Error;
use kmyth_ski::orchestrator::{seal, unseal};
use kmyth_ski::secret::Protected;
use kmyth_ski::tpm::session::{TpmHandle, TpmSession};
use kmyth_ski::tpm::{PcrBank, PcrSelection, PrivateBlob, PublicBlob};

struct FakeSession {
    next_handle: u32,
    live_handles: HashMap<u32, ()>,
    deny: bool,
}

impl FakeSession {
    fn new() -> Self {
        FakeSession { next_handle: 1, live_handles: HashMap::new(), deny: false }
    }
}

impl TpmSession for FakeSession {
    fn create_storage_key(
        &mut self,
        _pcr_policy: &PcrSelection,
    ) -> kmyth_ski::Result<(PublicBlob, PrivateBlob, TpmHandle)> {
        let handle = TpmHandle(self.next_handle);
        self.next_handle += 1;
        self.live_handles.insert(handle.0, ());
        Ok((PublicBlob::new(vec![0x01; 6]).unwrap(), PrivateBlob::new(vec![0x02; 6]).unwrap(), handle))
    }

    fn seal(
        &mut self,
        _sk_handle: TpmHandle,
        plaintext_key: &Protected,
        _pcr_policy: &PcrSelection,
    ) -> kmyth_ski::Result<(PublicBlob, PrivateBlob)> {
        let sealed: Vec<u8> = plaintext_key.iter().map(|b| b.wrapping_add(1)).collect();
        Ok((PublicBlob::new(vec![0x03; 6]).unwrap(), PrivateBlob::new(sealed).unwrap()))
    }

    fn unseal(
        &mut self,
        _sk_pub: &PublicBlob,
        _sk_priv: &PrivateBlob,
        _wk_pub: &PublicBlob,
        wk_priv: &PrivateBlob,
    ) -> kmyth_ski::Result<Protected> {
        if self.deny {
            return Err(Error::PolicyFailure);
        }
        let recovered: Vec<u8> = wk_priv.as_bytes().iter().map(|b| b.wrapping_sub(1)).collect();
        Ok(Protected::new(recovered))
    }

    fn random(&mut self, n: usize) -> kmyth_ski::Result<Protected> {
        Ok(Protected::new((0..n).map(|i| i as u8).collect()))
    }

    fn flush_handle(&mut self, handle: TpmHandle) -> kmyth_ski::Result<()> {
        self.live_handles.remove(&handle.0);
        Ok(())
    }
}

fn policy() -> PcrSelection {
    PcrSelection::new(vec![PcrBank { hash_alg: 0x000B, select: vec![0x01, 0x00, 0x00] }]).unwrap()
}

#[test]
fn seal_unseal_is_symmetric_across_all_registered_suites() {
    for suite in [
        "AES/KeyWrap/RFC5649Padding/128",
        "AES/KeyWrap/RFC5649Padding/192",
        "AES/KeyWrap/RFC5649Padding/256",
    ] {
        let mut session = FakeSession::new();
        let payload = b"vault contents that must survive the round trip";

        let envelope = seal(&mut session, payload, &policy(), suite).unwrap();
        let bytes = envelope.serialize();
        let reparsed = Envelope::parse(&bytes).unwrap();

        let recovered = unseal(&mut session, &reparsed).unwrap();
        assert_eq!(&*recovered, payload);
        assert!(session.live_handles.is_empty());
    }
}

#[test]
fn unseal_surfaces_policy_failure_without_leaking_the_wrapping_key() {
    let mut session = FakeSession::new();
    let envelope = seal(&mut session, b"classified", &policy(), "AES/KeyWrap/RFC5649Padding/256").unwrap();

    session.deny = true;
    let err = unseal(&mut session, &envelope).unwrap_err();
    assert_eq!(err, Error::PolicyFailure);
}

quickcheck::quickcheck! {
    fn wrap_unwrap_round_trips_for_every_registered_key_size(len_seed: u8, body: Vec<u8>) -> bool {
        let key_bytes = match len_seed % 3 {
            0 => 16,
            1 => 24,
            _ => 32,
        };
        let key = vec![0x5Au8; key_bytes];
        let mut plaintext = body;
        plaintext.push(0); // ensure non-empty without biasing the distribution much
        if plaintext.len() as u64 > aes_keywrap_5649::MAX_WRAP_INPUT {
            return true;
        }

        let ciphertext = aes_keywrap_5649::wrap(&key, &plaintext).unwrap();
        aes_keywrap_5649::unwrap(&key, &ciphertext).unwrap() == plaintext
    }
}
