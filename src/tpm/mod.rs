//! TPM 2.0 marshalling.
//!
//! Converts between in-memory representations of `TPML_PCR_SELECTION`,
//! `TPM2B_PUBLIC`, and `TPM2B_PRIVATE` and their canonical,
//! platform-independent byte encodings: big-endian, length-prefixed,
//! widths exactly as in the TPM 2.0 "Structures" specification.
//!
//! Pack and unpack never leave a caller-visible partial result: an
//! error means the destination buffer, or the cursor offset, is
//! exactly as it was before the call.

pub mod session;

use crate::error::{Error, Result};

/// Largest payload a `TPM2B_PUBLIC`/`TPM2B_PRIVATE` container may carry.
///
/// `TPM2B` containers use a 16-bit length prefix, so this is `u16::MAX`.
pub const MAX_TPM2B: usize = u16::MAX as usize;

/// A length-prefixed byte container mirroring `TPM2B_PUBLIC`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicBlob(Tpm2b);

/// A length-prefixed byte container mirroring `TPM2B_PRIVATE`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivateBlob(Tpm2b);

#[derive(Clone, Debug, PartialEq, Eq)]
struct Tpm2b(Vec<u8>);

impl Tpm2b {
    fn new(data: Vec<u8>, what: &'static str) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::InvalidArgument(format!("{} is empty", what)));
        }
        if data.len() > MAX_TPM2B {
            return Err(Error::InvalidArgument(format!(
                "{} of {} bytes exceeds the {} byte TPM2B limit",
                what,
                data.len(),
                MAX_TPM2B
            )));
        }
        Ok(Tpm2b(data))
    }

    fn pack(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.0.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.0);
    }

    fn unpack(buf: &[u8], cursor: &mut usize, what: &'static str) -> Result<Self> {
        let mut c = *cursor;
        let size = read_u16(buf, &mut c, what)? as usize;
        if size == 0 {
            return Err(Error::MalformedEnvelope(format!("{} declares zero size", what)));
        }
        if c + size > buf.len() {
            return Err(Error::MalformedEnvelope(format!("{} truncated", what)));
        }
        let data = buf[c..c + size].to_vec();
        c += size;
        *cursor = c;
        Ok(Tpm2b(data))
    }
}

impl PublicBlob {
    /// Wraps raw `TPM2B_PUBLIC` payload bytes.
    ///
    /// Fails with `InvalidArgument` unless `0 < data.len() <= MAX_TPM2B`.
    pub fn new(data: Vec<u8>) -> Result<Self> {
        Tpm2b::new(data, "public blob").map(PublicBlob)
    }

    /// The raw payload bytes (without the length prefix).
    pub fn as_bytes(&self) -> &[u8] {
        &self.0 .0
    }

    /// Appends this blob's canonical `TPM2B_PUBLIC` encoding to `out`.
    pub fn pack(&self, out: &mut Vec<u8>) {
        self.0.pack(out)
    }

    /// Reads a `TPM2B_PUBLIC` from `buf` starting at `*cursor`, advancing
    /// `*cursor` past it only on success.
    pub fn unpack(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        Tpm2b::unpack(buf, cursor, "public blob").map(PublicBlob)
    }
}

impl PrivateBlob {
    /// Wraps raw `TPM2B_PRIVATE` payload bytes.
    ///
    /// Fails with `InvalidArgument` unless `0 < data.len() <= MAX_TPM2B`.
    pub fn new(data: Vec<u8>) -> Result<Self> {
        Tpm2b::new(data, "private blob").map(PrivateBlob)
    }

    /// The raw payload bytes (without the length prefix).
    pub fn as_bytes(&self) -> &[u8] {
        &self.0 .0
    }

    /// Appends this blob's canonical `TPM2B_PRIVATE` encoding to `out`.
    pub fn pack(&self, out: &mut Vec<u8>) {
        self.0.pack(out)
    }

    /// Reads a `TPM2B_PRIVATE` from `buf` starting at `*cursor`, advancing
    /// `*cursor` past it only on success.
    pub fn unpack(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        Tpm2b::unpack(buf, cursor, "private blob").map(PrivateBlob)
    }
}

/// A single bank's worth of a `TPML_PCR_SELECTION` entry
/// (`TPMS_PCR_SELECTION`): a hash algorithm ID plus its PCR bitmap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcrBank {
    /// `TPMI_ALG_HASH` identifying the PCR bank.
    pub hash_alg: u16,
    /// The bitmap of selected PCRs in this bank.
    pub select: Vec<u8>,
}

/// A vendor-independent `TPML_PCR_SELECTION`: zero or more PCR banks,
/// each with its own hash algorithm and selection bitmap.
///
/// Values are opaque to the rest of this crate; only their marshalled
/// form is manipulated by the envelope codec and orchestrator.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PcrSelection {
    banks: Vec<PcrBank>,
}

impl PcrSelection {
    /// Builds a selection from its constituent banks.
    ///
    /// Fails with `InvalidArgument` if any bank's `select` bitmap is
    /// longer than 255 bytes (`sizeofSelect` is a `UINT8` in
    /// `TPMS_PCR_SELECTION`).
    pub fn new(banks: Vec<PcrBank>) -> Result<Self> {
        for bank in &banks {
            if bank.select.len() > u8::MAX as usize {
                return Err(Error::InvalidArgument(format!(
                    "pcr bank select bitmap of {} bytes exceeds the 255 byte sizeofSelect limit",
                    bank.select.len()
                )));
            }
        }
        Ok(PcrSelection { banks })
    }

    /// The banks in this selection, in encoding order.
    pub fn banks(&self) -> &[PcrBank] {
        &self.banks
    }

    /// Appends this selection's canonical `TPML_PCR_SELECTION` encoding
    /// to `out`.
    pub fn pack(&self, out: &mut Vec<u8>) {
        let mut scratch = Vec::new();
        scratch.extend_from_slice(&(self.banks.len() as u32).to_be_bytes());
        for bank in &self.banks {
            scratch.extend_from_slice(&bank.hash_alg.to_be_bytes());
            scratch.push(bank.select.len() as u8);
            scratch.extend_from_slice(&bank.select);
        }
        out.extend_from_slice(&scratch);
    }

    /// Reads a `TPML_PCR_SELECTION` from `buf` starting at `*cursor`,
    /// advancing `*cursor` past it only on success.
    pub fn unpack(buf: &[u8], cursor: &mut usize) -> Result<Self> {
        let mut c = *cursor;
        let count = read_u32(buf, &mut c, "pcr selection count")? as usize;

        let mut banks = Vec::with_capacity(count);
        for _ in 0..count {
            let hash_alg = read_u16(buf, &mut c, "pcr bank hash algorithm")?;
            let select_len = read_u8(buf, &mut c, "pcr bank select length")? as usize;
            if c + select_len > buf.len() {
                return Err(Error::MalformedEnvelope("pcr bank select bitmap truncated".into()));
            }
            let select = buf[c..c + select_len].to_vec();
            c += select_len;
            banks.push(PcrBank { hash_alg, select });
        }

        *cursor = c;
        Ok(PcrSelection { banks })
    }
}

fn read_u8(buf: &[u8], cursor: &mut usize, what: &'static str) -> Result<u8> {
    let c = *cursor;
    if c + 1 > buf.len() {
        return Err(Error::MalformedEnvelope(format!("{} truncated", what)));
    }
    *cursor = c + 1;
    Ok(buf[c])
}

fn read_u16(buf: &[u8], cursor: &mut usize, what: &'static str) -> Result<u16> {
    let c = *cursor;
    if c + 2 > buf.len() {
        return Err(Error::MalformedEnvelope(format!("{} truncated", what)));
    }
    let v = u16::from_be_bytes([buf[c], buf[c + 1]]);
    *cursor = c + 2;
    Ok(v)
}

fn read_u32(buf: &[u8], cursor: &mut usize, what: &'static str) -> Result<u32> {
    let c = *cursor;
    if c + 4 > buf.len() {
        return Err(Error::MalformedEnvelope(format!("{} truncated", what)));
    }
    let v = u32::from_be_bytes([buf[c], buf[c + 1], buf[c + 2], buf[c + 3]]);
    *cursor = c + 4;
    Ok(v)
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_pcr_selection() -> PcrSelection {
        PcrSelection::new(vec![
            PcrBank { hash_alg: 0x000B, select: vec![0x00, 0x00, 0x01] },
            PcrBank { hash_alg: 0x000C, select: vec![0xFF, 0x00, 0x00] },
        ])
        .unwrap()
    }

    #[test]
    fn pcr_selection_round_trips() {
        let original = sample_pcr_selection();
        let mut buf = Vec::new();
        original.pack(&mut buf);

        let mut cursor = 0;
        let parsed = PcrSelection::unpack(&buf, &mut cursor).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(cursor, buf.len());
    }

    #[test]
    fn empty_pcr_selection_round_trips() {
        let original = PcrSelection::default();
        let mut buf = Vec::new();
        original.pack(&mut buf);

        let mut cursor = 0;
        assert_eq!(PcrSelection::unpack(&buf, &mut cursor).unwrap(), original);
    }

    #[test]
    fn pcr_selection_unpack_leaves_cursor_on_failure() {
        let mut buf = Vec::new();
        sample_pcr_selection().pack(&mut buf);
        buf.truncate(buf.len() - 1);

        let mut cursor = 5;
        assert!(PcrSelection::unpack(&buf, &mut cursor).is_err());
        assert_eq!(cursor, 5);
    }

    #[test]
    fn public_blob_round_trips() {
        let original = PublicBlob::new(vec![0xAB; 12]).unwrap();
        let mut buf = Vec::new();
        original.pack(&mut buf);

        let mut cursor = 0;
        let parsed = PublicBlob::unpack(&buf, &mut cursor).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(cursor, buf.len());
    }

    #[test]
    fn private_blob_round_trips() {
        let original = PrivateBlob::new(vec![0x11, 0x22, 0x33]).unwrap();
        let mut buf = Vec::new();
        original.pack(&mut buf);

        let mut cursor = 0;
        let parsed = PrivateBlob::unpack(&buf, &mut cursor).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn blob_rejects_empty_payload() {
        assert!(PublicBlob::new(Vec::new()).is_err());
    }

    #[test]
    fn blob_unpack_rejects_zero_size() {
        let buf = vec![0x00, 0x00];
        let mut cursor = 0;
        assert!(PublicBlob::unpack(&buf, &mut cursor).is_err());
        assert_eq!(cursor, 0);
    }

    #[test]
    fn blob_unpack_rejects_truncated_payload() {
        let buf = vec![0x00, 0x05, 0x01, 0x02];
        let mut cursor = 0;
        assert!(PublicBlob::unpack(&buf, &mut cursor).is_err());
        assert_eq!(cursor, 0);
    }

    #[test]
    fn new_rejects_oversized_select_bitmap() {
        let result = PcrSelection::new(vec![PcrBank { hash_alg: 0x000B, select: vec![0u8; 256] }]);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
