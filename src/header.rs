//! ISCC headers.
//!
//! Every identifier starts with a header of four varnibble fields, in order: MainType, SubType,
//! Version, and Length. If the four fields don't end on a byte boundary, a single `0000` nibble
//! pads them out. A header is always between 2 and 8 bytes long.
//!
//! ```text
//! +==========+==========+==========+==========+------+
//! | MainType | SubType  | Version  |  Length  | 0000 |
//! +==========+==========+==========+==========+------+
//! ```
//!
//! The Length field is not a bit count. How it decodes depends on the MainType:
//!
//! - META, SEMANTIC, CONTENT, DATA, INSTANCE, FLAKE: `bits = (length + 1) * 32`
//! - ISCC: `length` indexes [`UNITS`], the optional units folded into the composite. The body
//!     holds 64 bits per optional unit, plus 128 bits for the DATA and INSTANCE units.
//! - ID: `length` counts counter bytes following the 64-bit body, so `bits = length * 8 + 64`.

use std::fmt;

use crate::bits::{BitReader, BitWriter};
use crate::error::{Error, Result};
use crate::varnibble::VarNibble;

/// The kind of identifier a header describes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MainType {
    /// Similarity hash of the content's metadata.
    Meta,
    /// Similarity hash of the content's meaning.
    Semantic,
    /// Perceptual similarity hash of the content itself.
    Content,
    /// Similarity hash of the raw bytes.
    Data,
    /// Cryptographic hash of the raw bytes.
    Instance,
    /// Composite of several units.
    Iscc,
    /// Globally unique, issued identifier.
    Id,
    /// Time-ordered unique identifier.
    Flake,
}

impl MainType {
    pub fn to_u8(self) -> u8 {
        match self {
            MainType::Meta => 0,
            MainType::Semantic => 1,
            MainType::Content => 2,
            MainType::Data => 3,
            MainType::Instance => 4,
            MainType::Iscc => 5,
            MainType::Id => 6,
            MainType::Flake => 7,
        }
    }

    /// Try to read a raw value as a MainType. Fails if it's not a recognized type.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(MainType::Meta),
            1 => Some(MainType::Semantic),
            2 => Some(MainType::Content),
            3 => Some(MainType::Data),
            4 => Some(MainType::Instance),
            5 => Some(MainType::Iscc),
            6 => Some(MainType::Id),
            7 => Some(MainType::Flake),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MainType::Meta => "META",
            MainType::Semantic => "SEMANTIC",
            MainType::Content => "CONTENT",
            MainType::Data => "DATA",
            MainType::Instance => "INSTANCE",
            MainType::Iscc => "ISCC",
            MainType::Id => "ID",
            MainType::Flake => "FLAKE",
        }
    }
}

impl fmt::Display for MainType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Interpretation of the SubType field. Which values are allowed depends on the MainType and
/// Version; see [`SubType::from_raw`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SubType {
    /// No subtype: META, DATA, INSTANCE, and FLAKE units.
    None,
    Text,
    Image,
    Audio,
    Video,
    Mixed,
    /// ISCC-CODE made of only DATA and INSTANCE units.
    Sum,
    /// ISCC-CODE with optional units, but none of them SEMANTIC or CONTENT.
    IsccNone,
    Private,
    Bitcoin,
    Ethereum,
    Polygon,
    Realm0,
    Realm1,
}

impl SubType {
    pub fn to_u8(self) -> u8 {
        use self::SubType::*;
        match self {
            None | Text | Private | Realm0 => 0,
            Image | Bitcoin | Realm1 => 1,
            Audio | Ethereum => 2,
            Video | Polygon => 3,
            Mixed => 4,
            Sum => 5,
            IsccNone => 6,
        }
    }

    /// Look up the subtype for a raw value, given the MainType and Version it appears under.
    /// Returns `None` for any combination that isn't defined.
    pub fn from_raw(mtype: MainType, version: u8, raw: u8) -> Option<SubType> {
        use self::MainType::*;
        let st = match (mtype, version, raw) {
            (Meta | Data | Instance | Flake, 0, 0) => SubType::None,
            (Semantic | Content | Iscc, 0, 0) => SubType::Text,
            (Semantic | Content | Iscc, 0, 1) => SubType::Image,
            (Semantic | Content | Iscc, 0, 2) => SubType::Audio,
            (Semantic | Content | Iscc, 0, 3) => SubType::Video,
            (Semantic | Content | Iscc, 0, 4) => SubType::Mixed,
            (Iscc, 0, 5) => SubType::Sum,
            (Iscc, 0, 6) => SubType::IsccNone,
            (Id, 0, 0) => SubType::Private,
            (Id, 0, 1) => SubType::Bitcoin,
            (Id, 0, 2) => SubType::Ethereum,
            (Id, 0, 3) => SubType::Polygon,
            (Id, 1, 0) => SubType::Realm0,
            (Id, 1, 1) => SubType::Realm1,
            _ => return Option::None,
        };
        Some(st)
    }

    pub fn name(&self) -> &'static str {
        use self::SubType::*;
        match self {
            None | IsccNone => "NONE",
            Text => "TEXT",
            Image => "IMAGE",
            Audio => "AUDIO",
            Video => "VIDEO",
            Mixed => "MIXED",
            Sum => "SUM",
            Private => "PRIVATE",
            Bitcoin => "BITCOIN",
            Ethereum => "ETHEREUM",
            Polygon => "POLYGON",
            Realm0 => "REALM_0",
            Realm1 => "REALM_1",
        }
    }

    /// True if this subtype is valid under the given MainType and Version.
    pub fn is_valid_for(&self, mtype: MainType, version: u8) -> bool {
        SubType::from_raw(mtype, version, self.to_u8()) == Some(*self)
    }
}

impl fmt::Display for SubType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Version 0 of the identifier algorithms. The only version for all MainTypes besides ID.
pub const VERSION_0: u8 = 0;
/// Version 1, used by ID units minted from a timestamp and server id.
pub const VERSION_1: u8 = 1;

/// True if the version is defined for the MainType.
pub fn is_known_version(mtype: MainType, version: u8) -> bool {
    match mtype {
        MainType::Id => version == VERSION_0 || version == VERSION_1,
        _ => version == VERSION_0,
    }
}

/// The optional unit combinations an ISCC-CODE can fold in, indexed by its Length field. DATA and
/// INSTANCE are always present and aren't listed.
pub const UNITS: [&[MainType]; 8] = [
    &[],
    &[MainType::Content],
    &[MainType::Semantic],
    &[MainType::Semantic, MainType::Content],
    &[MainType::Meta],
    &[MainType::Meta, MainType::Content],
    &[MainType::Meta, MainType::Semantic],
    &[MainType::Meta, MainType::Semantic, MainType::Content],
];

/// Find the [`UNITS`] index for a combination of optional MainTypes, given in MainType order.
pub fn encode_units(units: &[MainType]) -> Result<u32> {
    UNITS
        .iter()
        .position(|u| *u == units)
        .map(|i| i as u32)
        .ok_or_else(|| {
            let names: Vec<&str> = units.iter().map(MainType::name).collect();
            Error::Composition(format!(
                "[{}] is not a valid combination of optional units",
                names.join(", ")
            ))
        })
}

/// Get the optional MainTypes for a [`UNITS`] index.
pub fn decode_units(index: u32) -> Result<&'static [MainType]> {
    UNITS
        .get(index as usize)
        .copied()
        .ok_or_else(|| Error::Range(format!("unit combination index {} is not in 0-7", index)))
}

/// Convert a length in bits into the value stored in a header's Length field. For ISCC-CODEs the
/// "length" given is the [`UNITS`] index, which is stored as-is.
pub fn encode_length(mtype: MainType, length: u32) -> Result<u32> {
    let ok = match mtype {
        MainType::Iscc => length <= 7,
        MainType::Id => (64..=96).contains(&length) && length % 8 == 0,
        _ => length >= 32 && length % 32 == 0,
    };
    if !ok {
        return Err(Error::Range(format!(
            "invalid length {} for MainType {}",
            length, mtype
        )));
    }
    Ok(match mtype {
        MainType::Iscc => length,
        MainType::Id => (length - 64) / 8,
        _ => (length / 32) - 1,
    })
}

/// Convert a header's Length field into the body length in bits.
pub fn decode_length(mtype: MainType, length: u32) -> Result<u32> {
    match mtype {
        MainType::Iscc => Ok(decode_units(length)?.len() as u32 * 64 + 128),
        MainType::Id => {
            if length > 4 {
                return Err(Error::Range(format!(
                    "ID counter length of {} bytes exceeds 4",
                    length
                )));
            }
            Ok(length * 8 + 64)
        }
        _ => length
            .checked_add(1)
            .and_then(|words| words.checked_mul(32))
            .ok_or_else(|| Error::Range(format!("length field {} is out of range", length))),
    }
}

/// Write the four raw header fields, padding to a byte boundary with one zero nibble if needed.
pub fn encode_header(mtype: u32, stype: u32, version: u32, length: u32) -> Result<Vec<u8>> {
    let mut buf = BitWriter::new();
    for n in [mtype, stype, version, length] {
        VarNibble::from_u32(n)?.write(&mut buf);
    }
    if buf.len() % 8 != 0 {
        buf.push(0, 4);
    }
    Ok(buf.into_bytes())
}

/// Read the four raw header fields off the front of `data`. Returns them along with the bytes
/// following the header, which may hold more than one body.
///
/// When the fields end mid-byte, the rest of that byte must be a zero pad nibble. Anything else
/// is `Malformed`, since the body that follows would not start on a byte boundary.
pub fn decode_header(data: &[u8]) -> Result<(u32, u32, u32, u32, &[u8])> {
    let mut reader = BitReader::new(data);
    let mtype = VarNibble::read(&mut reader)?.to_u32();
    let stype = VarNibble::read(&mut reader)?.to_u32();
    let version = VarNibble::read(&mut reader)?.to_u32();
    let length = VarNibble::read(&mut reader)?.to_u32();
    if !reader.is_aligned() {
        if reader.peek(4, "decode header padding")? != 0 {
            return Err(Error::Malformed(
                "header padding nibble is not zero".to_string(),
            ));
        }
        reader.skip(4, "decode header padding")?;
    }
    Ok((mtype, stype, version, length, reader.tail()))
}

/// A decoded and validated header.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Header {
    mtype: MainType,
    stype: SubType,
    version: u8,
    length: u32,
    bits: u32,
}

impl Header {
    /// Build a header from its fields, where `length` is the raw Length field value. Fails if
    /// the combination isn't defined.
    pub fn new(mtype: MainType, stype: SubType, version: u8, length: u32) -> Result<Header> {
        if !is_known_version(mtype, version) {
            return Err(Error::TypeMismatch(format!(
                "version {} is not defined for MainType {}",
                version, mtype
            )));
        }
        if !stype.is_valid_for(mtype, version) {
            return Err(Error::TypeMismatch(format!(
                "SubType {} is not defined for MainType {} version {}",
                stype, mtype, version
            )));
        }
        let bits = decode_length(mtype, length)?;
        Ok(Header {
            mtype,
            stype,
            version,
            length,
            bits,
        })
    }

    /// Build a header for an ISCC-UNIT with a body of `bit_length` bits.
    pub fn for_unit(mtype: MainType, stype: SubType, version: u8, bit_length: u32) -> Result<Header> {
        if mtype == MainType::Iscc {
            return Err(Error::TypeMismatch(format!("{} is not a unit", mtype)));
        }
        Header::new(mtype, stype, version, encode_length(mtype, bit_length)?)
    }

    pub fn maintype(&self) -> MainType {
        self.mtype
    }

    pub fn subtype(&self) -> SubType {
        self.stype
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// The raw Length field.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// The body length in bits this header declares.
    pub fn bit_length(&self) -> u32 {
        self.bits
    }

    /// The body length in bytes this header declares.
    pub fn byte_length(&self) -> usize {
        (self.bits / 8) as usize
    }

    /// The optional units folded into an ISCC-CODE. Empty for any other MainType.
    pub fn units(&self) -> &'static [MainType] {
        if self.mtype == MainType::Iscc {
            UNITS[self.length as usize]
        } else {
            &[]
        }
    }

    /// Encode the header.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_header(
            self.mtype.to_u8() as u32,
            self.stype.to_u8() as u32,
            self.version as u32,
            self.length,
        )
    }

    /// Decode a header off the front of `data`, returning the header and the remaining bytes.
    pub fn decode(data: &[u8]) -> Result<(Header, &[u8])> {
        let (mtype, stype, version, length, tail) = decode_header(data)?;
        let mtype = u8::try_from(mtype)
            .ok()
            .and_then(MainType::from_u8)
            .ok_or_else(|| Error::Malformed(format!("unknown MainType {}", mtype)))?;
        let version = u8::try_from(version).map_err(|_| {
            Error::TypeMismatch(format!("version {} is not defined for {}", version, mtype))
        })?;
        let stype = u8::try_from(stype)
            .ok()
            .and_then(|st| SubType::from_raw(mtype, version, st))
            .ok_or_else(|| {
                Error::TypeMismatch(format!(
                    "SubType {} is not defined for MainType {} version {}",
                    stype, mtype, version
                ))
            })?;
        Ok((Header::new(mtype, stype, version, length)?, tail))
    }
}
