//! The identifier value type.
//!
//! A [`Code`] is a header plus the body it declares. It's built once, from a string, from bytes,
//! or from its parts, and never changes afterwards. Deriving a new identifier from an existing
//! one (like incrementing an ID counter) always produces a new `Code`.

use std::fmt;
use std::str::FromStr;

use serde::{
    de::{Deserialize, Deserializer, Error as DeError, Visitor},
    ser::{Serialize, Serializer},
};
use serde_bytes::Bytes;

use crate::error::{Error, Result};
use crate::header::{Header, MainType, SubType, VERSION_0};
use crate::multibase::{decode_base32, encode_base16, encode_base32, Multibase};
use crate::varint::UVarInt;

/// URI scheme prefixed to canonical identifier strings.
pub const SCHEME: &str = "ISCC:";

/// Strip whitespace and the `ISCC:` scheme from an identifier string. Dashes separating
/// concatenated units are dropped, unless the string is multibase-encoded (where `-` is part of
/// the base64url alphabet).
pub fn clean(iscc: &str) -> Result<String> {
    let parts: Vec<&str> = iscc.trim().split(':').map(str::trim).collect();
    match parts.as_slice() {
        [code] => {
            if code.chars().next().and_then(Multibase::from_prefix).is_some() {
                Ok(code.to_string())
            } else {
                Ok(code.replace('-', ""))
            }
        }
        [scheme, code] => {
            if !scheme.eq_ignore_ascii_case("iscc") {
                return Err(Error::Malformed(format!("invalid scheme: {}", scheme)));
            }
            Ok(code.replace('-', ""))
        }
        _ => Err(Error::Malformed(format!("malformed ISCC string: {}", iscc))),
    }
}

/// Clean an identifier string and decode it to raw bytes, unwrapping it first if it's a
/// multiformat string.
pub(crate) fn decode_str(iscc: &str) -> Result<Vec<u8>> {
    let cleaned = clean(iscc)?;
    match Multibase::unwrap_multiformat(&cleaned)? {
        Some(raw) => Ok(raw),
        None => decode_base32(&cleaned),
    }
}

/// Build an ISCC-UNIT from a digest and return its canonical base32 form, without the scheme.
/// The digest is truncated to `bit_length` bits.
pub fn encode_component(
    mtype: MainType,
    stype: SubType,
    version: u8,
    bit_length: u32,
    digest: &[u8],
) -> Result<String> {
    Ok(Code::new(mtype, stype, version, bit_length, digest)?.code())
}

/// An immutable ISCC identifier: a unit, a composite ISCC-CODE, an ID, or a Flake.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Code {
    header: Header,
    header_len: usize,
    bytes: Vec<u8>,
}

impl Code {
    /// Build an ISCC-UNIT of `bit_length` bits from a digest, truncating it as needed. Fails for
    /// the ISCC MainType, which isn't a unit, or if the digest is too short.
    pub fn new(
        mtype: MainType,
        stype: SubType,
        version: u8,
        bit_length: u32,
        digest: &[u8],
    ) -> Result<Code> {
        let header = Header::for_unit(mtype, stype, version, bit_length)?;
        let nbytes = header.byte_length();
        if digest.len() < nbytes {
            return Err(Error::LengthTooShort {
                step: "truncate digest",
                actual: digest.len(),
                expected: nbytes,
            });
        }
        Code::from_header(header, &digest[..nbytes])
    }

    /// Join a header with a body of exactly the length it declares.
    pub fn from_header(header: Header, body: &[u8]) -> Result<Code> {
        if body.len() != header.byte_length() {
            return Err(Error::Malformed(format!(
                "header declares {} body bytes, but got {}",
                header.byte_length(),
                body.len()
            )));
        }
        let mut bytes = header.encode()?;
        let header_len = bytes.len();
        bytes.extend_from_slice(body);
        Ok(Code {
            header,
            header_len,
            bytes,
        })
    }

    /// Decode a single identifier from raw bytes. The bytes must hold exactly one header and its
    /// body.
    pub fn from_bytes(data: &[u8]) -> Result<Code> {
        let (header, body) = Header::decode(data)?;
        if body.len() < header.byte_length() {
            return Err(Error::LengthTooShort {
                step: "decode body",
                actual: body.len(),
                expected: header.byte_length(),
            });
        }
        Code::from_header(header, body)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn maintype(&self) -> MainType {
        self.header.maintype()
    }

    pub fn subtype(&self) -> SubType {
        self.header.subtype()
    }

    pub fn version(&self) -> u8 {
        self.header.version()
    }

    /// The raw Length field of the header.
    pub fn length(&self) -> u32 {
        self.header.length()
    }

    /// Body length in bits.
    pub fn bit_length(&self) -> u32 {
        self.header.bit_length()
    }

    /// The body, without the header.
    pub fn hash_bytes(&self) -> &[u8] {
        &self.bytes[self.header_len..]
    }

    pub fn hash_hex(&self) -> String {
        encode_base16(self.hash_bytes())
    }

    /// The full encoded identifier: header followed by body.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Canonical base32 form, without the scheme.
    pub fn code(&self) -> String {
        encode_base32(&self.bytes)
    }

    /// Canonical form with the `ISCC:` scheme.
    pub fn uri(&self) -> String {
        format!("{}{}", SCHEME, self.code())
    }

    /// Multiformat form: multibase prefix, then the encoded multicodec prefix and identifier.
    pub fn to_multiformat(&self, base: Multibase) -> String {
        base.wrap(&self.bytes)
    }

    /// Human-readable type descriptor, like `CONTENT-IMAGE-V0-64`. For ISCC-CODEs the length
    /// part lists the initials of the units folded in, like `ISCC-IMAGE-V0-MCDI`.
    pub fn type_id(&self) -> String {
        let length = if self.maintype() == MainType::Iscc {
            let mut units: String = self
                .header
                .units()
                .iter()
                .map(|t| &t.name()[..1])
                .collect();
            units.push_str("DI");
            units
        } else {
            self.bit_length().to_string()
        };
        format!(
            "{}-{}-V{}-{}",
            self.maintype(),
            self.subtype(),
            self.version(),
            length
        )
    }

    /// The type descriptor followed by the body in hex. ID counters are shown as a number.
    pub fn explain(&self) -> String {
        match self.id_counter() {
            Some(Ok(counter)) => format!(
                "{}-{}-{}",
                self.type_id(),
                encode_base16(&self.hash_bytes()[..8]),
                counter
            ),
            _ => format!("{}-{}", self.type_id(), self.hash_hex()),
        }
    }

    /// The counter of a version 0 ID, if it has one.
    pub fn id_counter(&self) -> Option<Result<u64>> {
        if self.maintype() != MainType::Id || self.version() != VERSION_0 {
            return None;
        }
        let mut counter = self.hash_bytes().get(8..).filter(|c| !c.is_empty())?;
        Some(UVarInt::read(&mut counter).and_then(|v| {
            if counter.is_empty() {
                Ok(v.to_u64())
            } else {
                Err(Error::Malformed(
                    "trailing bytes after ID counter".to_string(),
                ))
            }
        }))
    }
}

impl FromStr for Code {
    type Err = Error;

    /// Parse a single identifier. Accepts the canonical form, with or without the scheme and in
    /// any case, as well as multiformat strings.
    fn from_str(s: &str) -> Result<Code> {
        Code::from_bytes(&decode_str(s)?)
    }
}

impl TryFrom<&str> for Code {
    type Error = Error;
    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

impl TryFrom<&[u8]> for Code {
    type Error = Error;
    fn try_from(value: &[u8]) -> Result<Self> {
        Code::from_bytes(value)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", SCHEME, self.code())
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Code({})", self.uri())
    }
}

impl Serialize for Code {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.uri())
        } else {
            Bytes::new(&self.bytes).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Code {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CodeVisitor;

        impl<'de> Visitor<'de> for CodeVisitor {
            type Value = Code;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
                write!(fmt, "an ISCC string or encoded ISCC bytes")
            }

            fn visit_str<E: DeError>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_bytes<E: DeError>(self, v: &[u8]) -> Result<Self::Value, E> {
                Code::from_bytes(v).map_err(E::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(CodeVisitor)
        } else {
            deserializer.deserialize_bytes(CodeVisitor)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const META_64: &str = "ISCC:AAAWKLHFPV6OPKDG";

    #[test]
    fn encode_meta() {
        let digest = [0x65, 0x2c, 0xe5, 0x7d, 0x7c, 0xe7, 0xa8, 0x66, 0xFF, 0xFF];
        let code = encode_component(MainType::Meta, SubType::None, 0, 64, &digest).unwrap();
        assert_eq!(code, "AAAWKLHFPV6OPKDG");
        let parsed: Code = META_64.parse().unwrap();
        assert_eq!(parsed.hash_bytes(), &digest[..8]);
        assert_eq!(parsed.to_string(), META_64);
    }

    #[test]
    fn component_errors() {
        assert!(matches!(
            encode_component(MainType::Iscc, SubType::Sum, 0, 64, &[0u8; 8]).unwrap_err(),
            Error::TypeMismatch(_)
        ));
        assert!(matches!(
            encode_component(MainType::Data, SubType::None, 0, 64, &[0u8; 7]).unwrap_err(),
            Error::LengthTooShort { .. }
        ));
        assert!(matches!(
            encode_component(MainType::Data, SubType::None, 0, 40, &[0u8; 8]).unwrap_err(),
            Error::Range(_)
        ));
    }

    #[test]
    fn accessors() {
        let code = Code::new(MainType::Content, SubType::Image, 0, 64, &[0xAB; 32]).unwrap();
        assert_eq!(code.maintype(), MainType::Content);
        assert_eq!(code.subtype(), SubType::Image);
        assert_eq!(code.version(), 0);
        assert_eq!(code.length(), 1);
        assert_eq!(code.bit_length(), 64);
        assert_eq!(code.hash_bytes(), &[0xAB; 8]);
        assert_eq!(code.hash_hex(), "abababababababab");
        assert_eq!(code.as_bytes().len(), 10);
        assert_eq!(code.type_id(), "CONTENT-IMAGE-V0-64");
        assert_eq!(code.explain(), "CONTENT-IMAGE-V0-64-abababababababab");
        assert!(code.uri().starts_with(SCHEME));
        assert_eq!(format!("{:?}", code), format!("Code({})", code.uri()));
    }

    #[test]
    fn parse_variants() {
        let code: Code = META_64.parse().unwrap();
        let inputs = [
            "ISCC:AAAWKLHFPV6OPKDG",
            "AAAWKLHFPV6OPKDG",
            "iscc:aaawklhfpv6opkdg",
            "  ISCC: AAAW-KLHF-PV6O-PKDG ",
        ];
        for input in inputs {
            println!("Test with {:?}", input);
            assert_eq!(input.parse::<Code>().unwrap(), code);
        }
        for base in [
            Multibase::Base16,
            Multibase::Base32,
            Multibase::Base32Hex,
            Multibase::Base58Btc,
            Multibase::Base64Url,
        ] {
            let mf = code.to_multiformat(base);
            println!("Test with {}", mf);
            assert_eq!(mf.parse::<Code>().unwrap(), code);
        }
    }

    #[test]
    fn parse_rejects() {
        for input in [
            "",
            "ISCC:",
            "FOO:AAAWKLHFPV6OPKDG",
            "ISCC:AAAW:KLHFPV6OPKDG",
            "ISCC:AAAWKLHFPV6OPK",
            "ISCC:AAAWKLHFPV6OPKDGAA",
        ] {
            println!("Test with {:?}", input);
            assert!(input.parse::<Code>().is_err());
        }
    }

    #[test]
    fn from_bytes_exact() {
        let code: Code = META_64.parse().unwrap();
        let mut raw = code.as_bytes().to_vec();
        assert_eq!(Code::try_from(&raw[..]).unwrap(), code);
        raw.push(0);
        assert!(matches!(
            Code::from_bytes(&raw).unwrap_err(),
            Error::Malformed(_)
        ));
        raw.truncate(raw.len() - 2);
        assert!(matches!(
            Code::from_bytes(&raw).unwrap_err(),
            Error::LengthTooShort { .. }
        ));
    }

    #[test]
    fn iscc_type_id() {
        let header = Header::new(MainType::Iscc, SubType::Image, 0, 5).unwrap();
        let code = Code::from_header(header, &[0u8; 32]).unwrap();
        assert_eq!(code.type_id(), "ISCC-IMAGE-V0-MCDI");
        let header = Header::new(MainType::Iscc, SubType::Sum, 0, 0).unwrap();
        let code = Code::from_header(header, &[0u8; 16]).unwrap();
        assert_eq!(code.type_id(), "ISCC-SUM-V0-DI");
    }

    #[test]
    fn id_counter() {
        let mut body = vec![0x11u8; 8];
        body.extend_from_slice(&[0xAC, 0x02]);
        let header = Header::new(MainType::Id, SubType::Private, 0, 2).unwrap();
        let code = Code::from_header(header, &body).unwrap();
        assert_eq!(code.id_counter().unwrap().unwrap(), 300);
        assert_eq!(code.explain(), "ID-PRIVATE-V0-80-1111111111111111-300");

        let plain = Code::new(MainType::Id, SubType::Private, 0, 64, &[0x11; 8]).unwrap();
        assert!(plain.id_counter().is_none());
        let meta: Code = META_64.parse().unwrap();
        assert!(meta.id_counter().is_none());
    }

    #[test]
    fn serde_json_string() {
        let code: Code = META_64.parse().unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, format!("\"{}\"", META_64));
        let back: Code = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
        assert!(serde_json::from_str::<Code>("\"ISCC:A\"").is_err());
    }
}
