//! Secret byte containers.
//!
//! The source this crate's pipeline is modeled on relies on hand-written
//! zeroize calls scattered across every early-return path. Here, secret
//! material is instead owned by a type whose destructor always zeroizes,
//! so that leaking key material on an error path is structurally
//! impossible rather than merely disciplined.

use zeroize::Zeroizing;

/// An owned buffer of secret bytes.
///
/// Construction copies the input; the copy (and only the copy) is
/// zeroized on drop. Deref gives read access to the bytes for the
/// duration of a wrap/unwrap/seal call; nothing at this type's API
/// surface lets the bytes escape without an explicit copy.
#[derive(Clone)]
pub struct Protected(Zeroizing<Vec<u8>>);

impl Protected {
    /// Takes ownership of `bytes`, without copying.
    pub fn new(bytes: Vec<u8>) -> Self {
        Protected(Zeroizing::new(bytes))
    }

    /// Copies `bytes` into a new zeroizing buffer.
    pub fn copy_from(bytes: &[u8]) -> Self {
        Protected(Zeroizing::new(bytes.to_vec()))
    }

    /// The number of secret bytes held.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::ops::Deref for Protected {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Protected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Protected").field(&format_args!("[redacted; {} bytes]", self.len())).finish()
    }
}
