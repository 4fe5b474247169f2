//! Structural validation of canonical identifier strings.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::header::{encode_header, Header, MainType, SubType, VERSION_0, VERSION_1};
use crate::multibase::{decode_base32, encode_base32};

const PATTERN: &str = "^ISCC:[A-Z2-7]{10,73}$";

fn pattern() -> Option<&'static Regex> {
    static PATTERN_RE: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN_RE.get_or_init(|| Regex::new(PATTERN).ok()).as_ref()
}

/// The first two base32 characters of every defined MainType/SubType/Version combination. They
/// cover the first 10 header bits, which the Length field never reaches.
fn prefixes() -> &'static HashSet<String> {
    static PREFIXES: OnceLock<HashSet<String>> = OnceLock::new();
    PREFIXES.get_or_init(|| {
        let mut set = HashSet::new();
        for m in 0..8u8 {
            let Some(mtype) = MainType::from_u8(m) else {
                continue;
            };
            for version in [VERSION_0, VERSION_1] {
                for raw in 0..8u8 {
                    if SubType::from_raw(mtype, version, raw).is_none() {
                        continue;
                    }
                    if let Ok(header) = encode_header(m as u32, raw as u32, version as u32, 0) {
                        set.insert(encode_base32(&header)[..2].to_string());
                    }
                }
            }
        }
        set
    })
}

fn check(iscc: &str) -> Result<()> {
    if !pattern().is_some_and(|re| re.is_match(iscc)) {
        return Err(Error::Malformed(format!(
            "{} does not match {}",
            iscc, PATTERN
        )));
    }
    let code = &iscc[5..];
    let raw = decode_base32(code)?;
    if !prefixes().contains(&code[..2]) {
        return Err(Error::TypeMismatch(format!(
            "header prefix {} is not a known type",
            &code[..2]
        )));
    }
    let (header, body) = Header::decode(&raw)?;
    if body.len() != header.byte_length() {
        return Err(Error::Malformed(format!(
            "header declares {} body bytes, found {}",
            header.byte_length(),
            body.len()
        )));
    }
    Ok(())
}

/// Check that a string is a well-formed canonical identifier: the `ISCC:` scheme followed by
/// upper case base32, with a known header and a body of the declared length.
///
/// With `strict`, the first failed check is returned as an error. Otherwise failures come back
/// as `Ok(false)`.
pub fn validate(iscc: &str, strict: bool) -> Result<bool> {
    match check(iscc) {
        Ok(()) => Ok(true),
        Err(e) if strict => Err(e),
        Err(_) => Ok(false),
    }
}
