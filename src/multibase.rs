//! Byte/string transcoding.
//!
//! Canonical identifiers use unpadded RFC 4648 base32 in upper case. Other encodings only show up
//! when an identifier is wrapped in a multiformat string: a multibase prefix character, followed
//! by the encoded form of the `0xCC01` multicodec prefix and the identifier bytes.
//!
//! All encoders strip padding, and all decoders put it back before decoding, so any string a
//! decoder accepts is exactly what the matching encoder would have produced.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use data_encoding::{BASE32, BASE32HEX, HEXLOWER, HEXLOWER_PERMISSIVE};

use crate::error::{Error, Result};

/// Multicodec prefix identifying ISCC bytes inside a multiformat string.
pub const MULTICODEC_PREFIX: [u8; 2] = [0xCC, 0x01];

/// Re-add the `=` padding that the encoders strip.
fn pad(code: &str, block: usize) -> String {
    let missing = (block - code.len() % block) % block;
    let mut padded = String::with_capacity(code.len() + missing);
    padded.push_str(code);
    padded.extend(std::iter::repeat('=').take(missing));
    padded
}

/// Encode as unpadded base32, upper case.
pub fn encode_base32(data: &[u8]) -> String {
    BASE32.encode(data).trim_end_matches('=').to_string()
}

/// Decode unpadded base32. Case-insensitive.
pub fn decode_base32(code: &str) -> Result<Vec<u8>> {
    BASE32
        .decode(pad(&code.to_ascii_uppercase(), 8).as_bytes())
        .map_err(|e| Error::Malformed(format!("invalid base32 string: {}", e)))
}

/// Encode as unpadded base32hex, upper case.
pub fn encode_base32hex(data: &[u8]) -> String {
    BASE32HEX.encode(data).trim_end_matches('=').to_string()
}

/// Decode unpadded base32hex. Case-insensitive.
pub fn decode_base32hex(code: &str) -> Result<Vec<u8>> {
    BASE32HEX
        .decode(pad(&code.to_ascii_uppercase(), 8).as_bytes())
        .map_err(|e| Error::Malformed(format!("invalid base32hex string: {}", e)))
}

/// Encode as base58, using the bitcoin alphabet.
pub fn encode_base58(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn decode_base58(code: &str) -> Result<Vec<u8>> {
    bs58::decode(code)
        .into_vec()
        .map_err(|e| Error::Malformed(format!("invalid base58 string: {}", e)))
}

/// Encode as unpadded URL-safe base64.
pub fn encode_base64(data: &[u8]) -> String {
    URL_SAFE.encode(data).trim_end_matches('=').to_string()
}

pub fn decode_base64(code: &str) -> Result<Vec<u8>> {
    URL_SAFE
        .decode(pad(code, 4))
        .map_err(|e| Error::Malformed(format!("invalid base64url string: {}", e)))
}

/// Encode as lower-case hexadecimal.
pub fn encode_base16(data: &[u8]) -> String {
    HEXLOWER.encode(data)
}

/// Decode hexadecimal. Case-insensitive.
pub fn decode_base16(code: &str) -> Result<Vec<u8>> {
    HEXLOWER_PERMISSIVE
        .decode(code.as_bytes())
        .map_err(|e| Error::Malformed(format!("invalid base16 string: {}", e)))
}

/// The multibase encodings an identifier may be wrapped in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Multibase {
    Base16,
    Base32,
    Base32Hex,
    Base58Btc,
    Base64Url,
}

impl Multibase {
    pub fn prefix(self) -> char {
        match self {
            Multibase::Base16 => 'f',
            Multibase::Base32 => 'b',
            Multibase::Base32Hex => 'v',
            Multibase::Base58Btc => 'z',
            Multibase::Base64Url => 'u',
        }
    }

    /// Look up the encoding for a multibase prefix character.
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            'f' => Some(Multibase::Base16),
            'b' => Some(Multibase::Base32),
            'v' => Some(Multibase::Base32Hex),
            'z' => Some(Multibase::Base58Btc),
            'u' => Some(Multibase::Base64Url),
            _ => None,
        }
    }

    /// Encode without the prefix character. The base32 variants come out lower case, as is
    /// conventional for multibase.
    pub fn encode(self, data: &[u8]) -> String {
        match self {
            Multibase::Base16 => encode_base16(data),
            Multibase::Base32 => encode_base32(data).to_ascii_lowercase(),
            Multibase::Base32Hex => encode_base32hex(data).to_ascii_lowercase(),
            Multibase::Base58Btc => encode_base58(data),
            Multibase::Base64Url => encode_base64(data),
        }
    }

    /// Decode a string without its prefix character.
    pub fn decode(self, code: &str) -> Result<Vec<u8>> {
        match self {
            Multibase::Base16 => decode_base16(code),
            Multibase::Base32 => decode_base32(code),
            Multibase::Base32Hex => decode_base32hex(code),
            Multibase::Base58Btc => decode_base58(code),
            Multibase::Base64Url => decode_base64(code),
        }
    }

    /// Wrap identifier bytes into a full multiformat string: prefix, multicodec, data.
    pub fn wrap(self, data: &[u8]) -> String {
        let mut raw = Vec::with_capacity(data.len() + MULTICODEC_PREFIX.len());
        raw.extend_from_slice(&MULTICODEC_PREFIX);
        raw.extend_from_slice(data);
        let mut out = String::new();
        out.push(self.prefix());
        out.push_str(&self.encode(&raw));
        out
    }

    /// Unwrap a multiformat string, verifying the multicodec prefix. Returns `Ok(None)` if the
    /// string doesn't start with a multibase prefix character.
    pub fn unwrap_multiformat(code: &str) -> Result<Option<Vec<u8>>> {
        let mut chars = code.chars();
        let base = match chars.next().and_then(Multibase::from_prefix) {
            Some(base) => base,
            None => return Ok(None),
        };
        let decoded = base.decode(chars.as_str())?;
        if !decoded.starts_with(&MULTICODEC_PREFIX) {
            return Err(Error::Malformed(format!(
                "multiformat codec prefix {:02x?} is not {:02x?}",
                &decoded[..decoded.len().min(2)],
                MULTICODEC_PREFIX
            )));
        }
        Ok(Some(decoded[MULTICODEC_PREFIX.len()..].to_vec()))
    }
}
