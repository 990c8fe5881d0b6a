//! Error taxonomy for the sealed-key envelope core.
//!
//! All fallible operations in this crate return [`Result`]. Diagnostic
//! text may name the failing step but must never carry key material,
//! plaintexts, or ciphertexts.

/// Crate result specialization.
pub type Result<T> = ::std::result::Result<T, Error>;

/// Errors returned by this crate.
///
/// Note: this enum cannot be exhaustively matched to allow future
/// extensions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Null/empty required input, or a size outside the allowed range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Cipher suite name not found in the registry.
    #[error("Unknown cipher suite: {0}")]
    UnknownCipher(String),

    /// Wrap/unwrap key length not among the suite's allowed sizes.
    #[error("Invalid key size: {0}")]
    InvalidKeySize(String),

    /// Plaintext/ciphertext outside the suite's bounds, or misaligned.
    #[error("Invalid input size: {0}")]
    InvalidInputSize(String),

    /// Unwrap authentication or IV check failed.
    #[error("Integrity check failed")]
    IntegrityFailure,

    /// Missing/misordered delimiter, trailing bytes, base64 decode
    /// failure, or TPM unmarshal failure.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// TPM refused to release sealed material (PCR mismatch or
    /// hierarchy unavailable).
    #[error("Policy failure")]
    PolicyFailure,

    /// The underlying crypto library returned an unexpected error.
    #[error("Crypto backend error: {0}")]
    CryptoBackend(String),

    /// The underlying TPM library returned an unexpected error.
    #[error("TPM backend error: {0}")]
    TpmBackend(String),

    /// Allocation failure.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),
}
