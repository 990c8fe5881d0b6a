//! The SKI envelope: a delimited, base64-chunked archive.
//!
//! Modeled on [RFC 4880's ASCII Armor][armor] in spirit — banner lines
//! bracketing base64-wrapped sections — but with a fixed, mandatory
//! section order instead of a self-describing `Kind`, and strict
//! end-of-file discipline: the end delimiter must be the final bytes of
//! the archive, with nothing tolerated past it.
//!
//! [armor]: https://tools.ietf.org/html/rfc4880#section-6
//!
//! # Memory allocations
//!
//! Intermediate base64 buffers never outlive a single `serialize` or
//! `parse` call; any failure releases everything allocated so far and
//! returns a single error, never a half-built envelope.

use base64::Engine;

use crate::cipher;
use crate::error::{Error, Result};
use crate::tpm::{PcrSelection, PrivateBlob, PublicBlob};

/// Base64 output is wrapped to this many columns per line, matching the
/// widely used OpenSSL default.
const LINE_LENGTH: usize = 64;

const D_PCR: &str = "-----PCR SELECTIONS-----\n";
const D_SK_PUB: &str = "-----STORAGE KEY PUBLIC-----\n";
const D_SK_PRIV: &str = "-----STORAGE KEY PRIVATE-----\n";
const D_CIPHER: &str = "-----CIPHER SUITE-----\n";
const D_WK_PUB: &str = "-----SYM KEY PUBLIC-----\n";
const D_WK_PRIV: &str = "-----SYM KEY PRIVATE-----\n";
const D_ENC: &str = "-----ENC DATA-----\n";
const D_END: &str = "-----FILE END-----\n";

/// The persisted sealed-key archive.
///
/// All seven fields are validated at construction time ([`Envelope::new`])
/// and again whenever an envelope is reconstituted from bytes
/// ([`Envelope::parse`]); the two paths share the same invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pcr_list: PcrSelection,
    sk_pub: PublicBlob,
    sk_priv: PrivateBlob,
    cipher_name: String,
    wk_pub: PublicBlob,
    wk_priv: PrivateBlob,
    enc_payload: Vec<u8>,
}

impl Envelope {
    /// Assembles an envelope from its seven logical fields.
    ///
    /// Fails with `InvalidArgument` if `enc_payload` is empty, or
    /// `UnknownCipher` if `cipher_name` is not registered. The five TPM
    /// blobs are already validated by their own constructors.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pcr_list: PcrSelection,
        sk_pub: PublicBlob,
        sk_priv: PrivateBlob,
        cipher_name: String,
        wk_pub: PublicBlob,
        wk_priv: PrivateBlob,
        enc_payload: Vec<u8>,
    ) -> Result<Self> {
        if enc_payload.is_empty() {
            return Err(Error::InvalidArgument("enc_payload is empty".into()));
        }
        cipher::lookup(&cipher_name)?;

        Ok(Envelope { pcr_list, sk_pub, sk_priv, cipher_name, wk_pub, wk_priv, enc_payload })
    }

    /// The PCR selection the storage key is bound to.
    pub fn pcr_list(&self) -> &PcrSelection {
        &self.pcr_list
    }

    /// The storage key's public area.
    pub fn sk_pub(&self) -> &PublicBlob {
        &self.sk_pub
    }

    /// The storage key's TPM-encrypted private area.
    pub fn sk_priv(&self) -> &PrivateBlob {
        &self.sk_priv
    }

    /// The cipher suite name the payload was wrapped with.
    pub fn cipher_name(&self) -> &str {
        &self.cipher_name
    }

    /// The sealed wrapping key's public area.
    pub fn wk_pub(&self) -> &PublicBlob {
        &self.wk_pub
    }

    /// The sealed wrapping key's TPM-encrypted private area.
    pub fn wk_priv(&self) -> &PrivateBlob {
        &self.wk_priv
    }

    /// The payload, encrypted under `cipher_name`.
    pub fn enc_payload(&self) -> &[u8] {
        &self.enc_payload
    }

    /// Serializes this envelope to its delimited, base64-chunked wire
    /// form.
    ///
    /// A pure function of `self`: byte-identical envelopes always
    /// produce byte-identical output, and section order is fixed.
    pub fn serialize(&self) -> Vec<u8> {
        let mut pcr_bytes = Vec::new();
        self.pcr_list.pack(&mut pcr_bytes);
        let mut sk_pub_bytes = Vec::new();
        self.sk_pub.pack(&mut sk_pub_bytes);
        let mut sk_priv_bytes = Vec::new();
        self.sk_priv.pack(&mut sk_priv_bytes);
        let mut wk_pub_bytes = Vec::new();
        self.wk_pub.pack(&mut wk_pub_bytes);
        let mut wk_priv_bytes = Vec::new();
        self.wk_priv.pack(&mut wk_priv_bytes);

        let mut out = String::new();
        out.push_str(D_PCR);
        out.push_str(&base64_block(&pcr_bytes));
        out.push_str(D_SK_PUB);
        out.push_str(&base64_block(&sk_pub_bytes));
        out.push_str(D_SK_PRIV);
        out.push_str(&base64_block(&sk_priv_bytes));
        out.push_str(D_CIPHER);
        out.push_str(&self.cipher_name);
        out.push('\n');
        out.push_str(D_WK_PUB);
        out.push_str(&base64_block(&wk_pub_bytes));
        out.push_str(D_WK_PRIV);
        out.push_str(&base64_block(&wk_priv_bytes));
        out.push_str(D_ENC);
        out.push_str(&base64_block(&self.enc_payload));
        out.push_str(D_END);

        out.into_bytes()
    }

    /// Parses a delimited, base64-chunked archive produced by
    /// [`Envelope::serialize`].
    ///
    /// Sections must appear in the fixed order of the wire format; the
    /// end delimiter must be the final bytes of `input`, with nothing
    /// remaining after it. Any single failure aborts the parse and
    /// returns `MalformedEnvelope` (or `UnknownCipher`, if the suite name
    /// is not registered) without producing a partially built envelope.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let mut sc = Scanner::new(input);

        sc.expect(D_PCR)?;
        let pcr_b64 = sc.section_ending_at(D_SK_PUB)?;
        sc.expect(D_SK_PUB)?;
        let sk_pub_b64 = sc.section_ending_at(D_SK_PRIV)?;
        sc.expect(D_SK_PRIV)?;
        let sk_priv_b64 = sc.section_ending_at(D_CIPHER)?;
        sc.expect(D_CIPHER)?;
        let cipher_line = sc.section_ending_at(D_WK_PUB)?;
        sc.expect(D_WK_PUB)?;
        let wk_pub_b64 = sc.section_ending_at(D_WK_PRIV)?;
        sc.expect(D_WK_PRIV)?;
        let wk_priv_b64 = sc.section_ending_at(D_ENC)?;
        sc.expect(D_ENC)?;
        let enc_b64 = sc.section_ending_at(D_END)?;
        sc.expect(D_END)?;
        sc.expect_exhausted()?;

        let pcr_bytes = base64_decode(pcr_b64)?;
        let sk_pub_bytes = base64_decode(sk_pub_b64)?;
        let sk_priv_bytes = base64_decode(sk_priv_b64)?;
        let wk_pub_bytes = base64_decode(wk_pub_b64)?;
        let wk_priv_bytes = base64_decode(wk_priv_b64)?;
        let enc_payload = base64_decode(enc_b64)?;

        let cipher_name = ascii_line(cipher_line)?;

        let mut cursor = 0;
        let pcr_list = PcrSelection::unpack(&pcr_bytes, &mut cursor)?;
        require_consumed(&pcr_bytes, cursor, "pcr selection")?;

        let mut cursor = 0;
        let sk_pub = PublicBlob::unpack(&sk_pub_bytes, &mut cursor)?;
        require_consumed(&sk_pub_bytes, cursor, "storage key public")?;

        let mut cursor = 0;
        let sk_priv = PrivateBlob::unpack(&sk_priv_bytes, &mut cursor)?;
        require_consumed(&sk_priv_bytes, cursor, "storage key private")?;

        let mut cursor = 0;
        let wk_pub = PublicBlob::unpack(&wk_pub_bytes, &mut cursor)?;
        require_consumed(&wk_pub_bytes, cursor, "sym key public")?;

        let mut cursor = 0;
        let wk_priv = PrivateBlob::unpack(&wk_priv_bytes, &mut cursor)?;
        require_consumed(&wk_priv_bytes, cursor, "sym key private")?;

        Envelope::new(pcr_list, sk_pub, sk_priv, cipher_name, wk_pub, wk_priv, enc_payload)
    }
}

fn require_consumed(buf: &[u8], cursor: usize, what: &'static str) -> Result<()> {
    if cursor != buf.len() {
        return Err(Error::MalformedEnvelope(format!("{} has trailing TPM-unmarshalled bytes", what)));
    }
    Ok(())
}

fn ascii_line(content: &[u8]) -> Result<String> {
    let line = content
        .strip_suffix(b"\n")
        .ok_or_else(|| Error::MalformedEnvelope("cipher suite section missing newline".into()))?;
    if line.is_empty() {
        return Err(Error::MalformedEnvelope("cipher suite name is empty".into()));
    }
    if !line.is_ascii() {
        return Err(Error::MalformedEnvelope("cipher suite name is not ASCII".into()));
    }
    Ok(String::from_utf8(line.to_vec()).expect("validated ASCII"))
}

fn base64_block(data: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / LINE_LENGTH + 1);
    for chunk in encoded.as_bytes().chunks(LINE_LENGTH) {
        // `encoded` is pure base64 alphabet, always valid UTF-8 ASCII.
        out.push_str(std::str::from_utf8(chunk).expect("base64 output is ASCII"));
        out.push('\n');
    }
    if encoded.is_empty() {
        out.push('\n');
    }
    out
}

fn base64_decode(section: &[u8]) -> Result<Vec<u8>> {
    let mut condensed = Vec::with_capacity(section.len());
    for &b in section {
        if b != b'\n' {
            condensed.push(b);
        }
    }
    base64::engine::general_purpose::STANDARD
        .decode(condensed)
        .map_err(|e| Error::MalformedEnvelope(format!("base64 decode failed: {}", e)))
}

/// A one-shot, forward-only cursor over the envelope's bytes.
///
/// Modeled as an explicit value rather than shared mutable state: each
/// `parse` call owns exactly one `Scanner`, and its position only ever
/// advances.
struct Scanner<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Scanner { buf, pos: 0 }
    }

    fn expect(&mut self, delimiter: &str) -> Result<()> {
        let bytes = delimiter.as_bytes();
        if !self.buf[self.pos..].starts_with(bytes) {
            return Err(Error::MalformedEnvelope(format!(
                "expected delimiter {:?} at offset {}",
                delimiter.trim_end(),
                self.pos
            )));
        }
        self.pos += bytes.len();
        Ok(())
    }

    /// Returns the bytes between the current position and the next
    /// occurrence of `closing_delimiter`, without consuming the
    /// delimiter itself.
    fn section_ending_at(&mut self, closing_delimiter: &str) -> Result<&'a [u8]> {
        let needle = closing_delimiter.as_bytes();
        let rest = &self.buf[self.pos..];
        let idx = find_subslice(rest, needle).ok_or_else(|| {
            Error::MalformedEnvelope(format!("missing delimiter {:?}", closing_delimiter.trim_end()))
        })?;
        let content = &rest[..idx];
        self.pos += idx;
        Ok(content)
    }

    fn expect_exhausted(&self) -> Result<()> {
        if self.pos != self.buf.len() {
            return Err(Error::MalformedEnvelope("trailing bytes after FILE END delimiter".into()));
        }
        Ok(())
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
