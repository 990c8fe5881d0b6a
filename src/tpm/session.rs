//! The `TpmSession` capability.
//!
//! This crate does not talk to a TPM itself — that belongs to an ESAPI
//! or equivalent TCTI binding living outside this core. `TpmSession` is
//! the seam: the orchestrator (`crate::orchestrator`) drives seal and
//! unseal purely in terms of these four operations, so the pipeline is
//! testable with a fake session and portable to whatever transport a
//! caller wires in.

use crate::error::Result;
use crate::secret::Protected;
use crate::tpm::{PcrSelection, PrivateBlob, PublicBlob};

/// An opaque handle to a transient TPM object.
///
/// Handles are scoped to a single orchestrator call: every handle
/// returned by [`TpmSession::create_storage_key`] must be released by
/// [`TpmSession::flush_handle`] before that call returns, on every exit
/// path including errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TpmHandle(pub u32);

/// Capability an orchestrator uses to drive TPM sealing operations.
///
/// Implementations are expected to wrap ESAPI or an equivalent TPM 2.0
/// host library. Sessions are not required to be thread-safe; the
/// orchestrator never shares one session across concurrent calls.
pub trait TpmSession {
    /// Derives a storage key from the SRK, bound to `pcr_policy`.
    ///
    /// Returns the new key's public/private blobs and a handle to the
    /// loaded key.
    fn create_storage_key(
        &mut self,
        pcr_policy: &PcrSelection,
    ) -> Result<(PublicBlob, PrivateBlob, TpmHandle)>;

    /// Seals `plaintext_key` under the storage key at `sk_handle`, such
    /// that unsealing it later requires `pcr_policy` to still hold.
    fn seal(
        &mut self,
        sk_handle: TpmHandle,
        plaintext_key: &Protected,
        pcr_policy: &PcrSelection,
    ) -> Result<(PublicBlob, PrivateBlob)>;

    /// Loads the storage key hierarchy described by `sk_pub`/`sk_priv`
    /// and releases the key wrapped in `wk_pub`/`wk_priv`, if and only
    /// if the current PCR state still matches the sealing policy.
    ///
    /// A PCR mismatch, or an unavailable hierarchy, surfaces as
    /// `PolicyFailure`.
    fn unseal(
        &mut self,
        sk_pub: &PublicBlob,
        sk_priv: &PrivateBlob,
        wk_pub: &PublicBlob,
        wk_priv: &PrivateBlob,
    ) -> Result<Protected>;

    /// Draws `n` bytes from the TPM's RNG.
    fn random(&mut self, n: usize) -> Result<Protected>;

    /// Releases a handle returned by `create_storage_key`.
    ///
    /// Called on every exit path of an orchestrator call that created a
    /// handle, including error paths. Implementations should treat a
    /// failure here as non-fatal to the caller's result; there is
    /// nothing meaningful to recover by propagating it.
    fn flush_handle(&mut self, handle: TpmHandle) -> Result<()>;
}
