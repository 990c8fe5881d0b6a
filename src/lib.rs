//! Sealed-key envelope core.
//!
//! This crate implements the two-layer cryptographic sealing pipeline
//! that binds an arbitrary payload to a hardware root of trust and
//! persists it as a self-describing archive, the "SKI envelope":
//!
//! 1. A TPM sealing layer ([`tpm`]) that marshals a storage-key
//!    hierarchy's public/private blobs and a PCR selection into
//!    platform-independent wire form.
//! 2. A symmetric wrapping layer ([`cipher`]) that encrypts the payload
//!    under a software-generated key, using a cipher suite drawn from a
//!    registry.
//! 3. An envelope codec ([`envelope`]) that marshals the five TPM blobs
//!    plus the cipher suite name into a delimited, base64-chunked
//!    archive, and parses it back with strict boundary checks.
//!
//! [`orchestrator::seal`] and [`orchestrator::unseal`] compose these
//! three layers end to end, driven by a caller-supplied
//! [`tpm::session::TpmSession`] — this crate never speaks to a TPM
//! itself.
//!
//! # Non-goals
//!
//! This crate does not define new cryptographic primitives, support
//! non-AES cipher families, support hot-reload of the suite registry,
//! or stream payloads: every payload handled here is in memory and
//! bounded by [`cipher::aes_keywrap_5649::MAX_WRAP_INPUT`].

#![warn(missing_docs)]

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod orchestrator;
pub mod secret;
pub mod tpm;

pub use envelope::Envelope;
pub use error::{Error, Result};
pub use secret::Protected;
