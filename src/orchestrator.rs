//! Seal and unseal: the end-to-end pipeline tying the cipher registry,
//! the TPM marshaller, and the envelope codec to a caller-supplied
//! [`TpmSession`].
//!
//! Both operations are single-threaded, straight-line computations:
//! there is no internal suspension point and no partial result visible
//! on any exit path. Every TPM handle created here is released before
//! return, and every buffer that held the wrapping key is zeroized
//! before return, success or failure.

use crate::cipher;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::secret::Protected;
use crate::tpm::session::{TpmHandle, TpmSession};
use crate::tpm::PcrSelection;

/// A storage-key handle that flushes itself through the owning session
/// on drop, best-effort, regardless of how the orchestrator call exits.
struct HandleGuard<'a, S: TpmSession + ?Sized> {
    session: &'a mut S,
    handle: Option<TpmHandle>,
}

impl<'a, S: TpmSession + ?Sized> HandleGuard<'a, S> {
    fn new(session: &'a mut S, handle: TpmHandle) -> Self {
        HandleGuard { session, handle: Some(handle) }
    }
}

impl<'a, S: TpmSession + ?Sized> Drop for HandleGuard<'a, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            // Best-effort: there is nothing actionable to do with a
            // failed flush here, and propagating it would shadow the
            // real error (or success) this call is already returning.
            let _ = self.session.flush_handle(handle);
        }
    }
}

/// Seals `payload` under a fresh TPM storage key bound to `pcr_policy`,
/// using the wrapping cipher named by `suite_name`.
///
/// 1. Resolves `suite_name` in the registry.
/// 2. Draws a fresh wrapping key from the session's RNG.
/// 3. Wraps `payload` under that key.
/// 4. Derives a PCR-bound storage key and seals the wrapping key under
///    it.
/// 5. Assembles and returns the envelope.
///
/// The wrapping key is zeroized before this function returns on every
/// path, including error paths.
pub fn seal(
    session: &mut (impl TpmSession + ?Sized),
    payload: &[u8],
    pcr_policy: &PcrSelection,
    suite_name: &str,
) -> Result<Envelope> {
    let suite = cipher::lookup(suite_name)?;

    let wk = session.random(suite.key_bytes)?;

    let enc_payload = suite.wrap(&wk, payload)?;

    let (sk_pub, sk_priv, sk_handle) = session.create_storage_key(pcr_policy)?;
    let _guard = HandleGuard::new(session, sk_handle);

    let (wk_pub, wk_priv) = _guard.session.seal(sk_handle, &wk, pcr_policy)?;

    // `wk` (a `Protected`) zeroizes on drop here, whichever branch above
    // returned early.
    drop(wk);

    Envelope::new(
        pcr_policy.clone(),
        sk_pub,
        sk_priv,
        suite.name.to_string(),
        wk_pub,
        wk_priv,
        enc_payload,
    )
}

/// Unseals `envelope`, recovering the original payload.
///
/// 1. Resolves the envelope's cipher suite.
/// 2. Asks the session to unseal the wrapping key; a PCR mismatch or an
///    unavailable hierarchy surfaces as `PolicyFailure`.
/// 3. Unwraps the payload under the recovered key.
///
/// The wrapping key is zeroized before this function returns on every
/// path, including error paths.
pub fn unseal(session: &mut (impl TpmSession + ?Sized), envelope: &Envelope) -> Result<Protected> {
    let suite = cipher::lookup(envelope.cipher_name())?;

    let wk = session.unseal(envelope.sk_pub(), envelope.sk_priv(), envelope.wk_pub(), envelope.wk_priv())?;

    let payload = suite.unwrap(&wk, envelope.enc_payload());

    drop(wk);

    payload
}
