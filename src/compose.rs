//! Composite identifiers.
//!
//! An ISCC-CODE folds 64-bit prefixes of several units under a single header. [`compose`] builds
//! one from its units, [`decompose`] splits a composite (or a run of concatenated units) back
//! into standalone units, and [`normalize`] uses both to bring any accepted input form into its
//! canonical composite.

use tracing::debug;

use crate::code::{decode_str, Code};
use crate::error::{Error, Result};
use crate::header::{encode_units, Header, MainType, SubType};

/// Body bytes each unit contributes to a composite.
const UNIT_PREFIX: usize = 8;

/// Split raw identifier bytes into standalone units. Concatenated units are read one after the
/// other. A composite is expanded into its units and must be the last thing in the data.
pub fn decompose_bytes(data: &[u8]) -> Result<Vec<Code>> {
    if data.is_empty() {
        return Err(Error::Malformed("no identifier to decompose".to_string()));
    }
    let mut units = Vec::new();
    let mut raw = data;
    while !raw.is_empty() {
        let (header, body) = Header::decode(raw)?;
        let len = header.byte_length();
        if body.len() < len {
            return Err(Error::LengthTooShort {
                step: "decompose body",
                actual: body.len(),
                expected: len,
            });
        }
        let (body, tail) = body.split_at(len);

        if header.maintype() != MainType::Iscc {
            units.push(Code::from_header(header, body)?);
            raw = tail;
            continue;
        }

        if !tail.is_empty() {
            return Err(Error::Malformed(format!(
                "{} bytes trail an ISCC-CODE",
                tail.len()
            )));
        }
        let version = header.version();
        let mut segments = body.chunks_exact(UNIT_PREFIX);
        let kinds = header
            .units()
            .iter()
            .copied()
            .chain([MainType::Data, MainType::Instance]);
        for mtype in kinds {
            let stype = match mtype {
                MainType::Semantic | MainType::Content => header.subtype(),
                _ => SubType::None,
            };
            let segment = segments.next().ok_or(Error::LengthTooShort {
                step: "decompose ISCC-CODE",
                actual: body.len(),
                expected: (header.units().len() + 2) * UNIT_PREFIX,
            })?;
            units.push(Code::new(mtype, stype, version, 64, segment)?);
        }
        break;
    }
    Ok(units)
}

/// Split an identifier string into its standalone units.
pub fn decompose(iscc: &str) -> Result<Vec<Code>> {
    decompose_bytes(&decode_str(iscc)?)
}

/// Build an ISCC-CODE out of units. DATA and INSTANCE units are required; META, SEMANTIC, and
/// CONTENT are optional. Every unit must carry at least 64 bits and share a version.
pub fn compose(codes: &[Code]) -> Result<Code> {
    if codes.len() < 2 {
        return Err(Error::Composition(format!(
            "an ISCC-CODE needs at least 2 units, got {}",
            codes.len()
        )));
    }
    for code in codes {
        match code.maintype() {
            MainType::Iscc | MainType::Id => {
                return Err(Error::TypeMismatch(format!(
                    "{} can't be folded into an ISCC-CODE",
                    code.maintype()
                )))
            }
            _ => (),
        }
        if code.bit_length() < 64 {
            return Err(Error::Composition(format!(
                "{} unit has {} bits, at least 64 are needed",
                code.maintype(),
                code.bit_length()
            )));
        }
    }

    let mut sorted: Vec<&Code> = codes.iter().collect();
    sorted.sort_by_key(|c| c.maintype());

    let version = sorted[0].version();
    if sorted.iter().any(|c| c.version() != version) {
        return Err(Error::Composition(
            "all units must have the same version".to_string(),
        ));
    }

    let types: Vec<MainType> = sorted.iter().map(|c| c.maintype()).collect();
    let (optional, mandatory) = types.split_at(types.len() - 2);
    if mandatory != [MainType::Data, MainType::Instance] {
        return Err(Error::Composition(
            "an ISCC-CODE must include exactly one DATA and one INSTANCE unit".to_string(),
        ));
    }
    let length = encode_units(optional)?;

    let mut stype = None;
    for code in sorted
        .iter()
        .filter(|c| matches!(c.maintype(), MainType::Semantic | MainType::Content))
    {
        match stype {
            Some(st) if st != code.subtype() => {
                return Err(Error::Composition(format!(
                    "SEMANTIC and CONTENT subtypes disagree: {} vs {}",
                    st,
                    code.subtype()
                )))
            }
            _ => stype = Some(code.subtype()),
        }
    }
    let stype = match stype {
        Some(st) => st,
        None if codes.len() == 2 => SubType::Sum,
        None => SubType::IsccNone,
    };

    let mut body = Vec::with_capacity(sorted.len() * UNIT_PREFIX);
    for code in &sorted {
        body.extend_from_slice(&code.hash_bytes()[..UNIT_PREFIX]);
    }
    let header = Header::new(MainType::Iscc, stype, version, length)?;
    let composite = Code::from_header(header, &body)?;
    debug!(code = %composite, units = sorted.len(), "composed ISCC-CODE");
    Ok(composite)
}

/// Build an ISCC-CODE from unit strings and return it in canonical form.
pub fn gen_iscc_code(codes: &[&str]) -> Result<String> {
    let codes = codes
        .iter()
        .map(|c| c.parse())
        .collect::<Result<Vec<Code>>>()?;
    Ok(compose(&codes)?.uri())
}

/// Bring any accepted identifier form into its canonical form. Inputs that hold two or more units,
/// whether concatenated or already composed, come out as a single ISCC-CODE.
pub fn normalize(iscc: &str) -> Result<String> {
    let mut units = decompose(iscc)?;
    let normalized = if units.len() >= 2 {
        compose(&units)?.uri()
    } else {
        // decompose never returns an empty list
        units.remove(0).uri()
    };
    debug!(input = iscc, normalized = %normalized, "normalized identifier");
    Ok(normalized)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::multibase::Multibase;

    const META: &str = "ISCC:AAAYPXW445FTYNJ3";
    const CONTENT: &str = "ISCC:EAARMJLTQCUWAND2";
    const DATA: &str = "ISCC:GABVVC5DMJJGYKZ4ZBYVNYABFFYXG";
    const INSTANCE: &str = "ISCC:IADWIK7A7JTUAQ2D6QARX7OBEIK3OOUAM42LOBLCZ4ZOGDLRHMDL6TQ";
    const COMPOSITE: &str = "ISCC:KACYPXW445FTYNJ3CYSXHAFJMA2HUWULUNRFE3BLHRSCXYH2M5AEGQY";

    fn parse(codes: &[&str]) -> Vec<Code> {
        codes.iter().map(|c| c.parse().unwrap()).collect()
    }

    #[test]
    fn compose_vector() {
        let composite = gen_iscc_code(&[META, CONTENT, DATA, INSTANCE]).unwrap();
        assert_eq!(composite, COMPOSITE);
        // Input order doesn't matter
        let composite = gen_iscc_code(&[INSTANCE, DATA, META, CONTENT]).unwrap();
        assert_eq!(composite, COMPOSITE);
        let code: Code = composite.parse().unwrap();
        assert_eq!(code.type_id(), "ISCC-TEXT-V0-MCDI");
    }

    #[test]
    fn decompose_vector() {
        let units = decompose(COMPOSITE).unwrap();
        let types: Vec<MainType> = units.iter().map(Code::maintype).collect();
        assert_eq!(
            types,
            vec![
                MainType::Meta,
                MainType::Content,
                MainType::Data,
                MainType::Instance
            ]
        );
        let originals = parse(&[META, CONTENT, DATA, INSTANCE]);
        for (unit, original) in units.iter().zip(originals.iter()) {
            println!("Test with {}", unit);
            assert_eq!(unit.bit_length(), 64);
            assert_eq!(unit.subtype(), original.subtype());
            assert_eq!(unit.hash_bytes(), &original.hash_bytes()[..8]);
        }
        // META and CONTENT were already 64 bits
        assert_eq!(units[0].uri(), META);
        assert_eq!(units[1].uri(), CONTENT);
    }

    #[test]
    fn decompose_idempotent() {
        let units = decompose(COMPOSITE).unwrap();
        let again = decompose(&compose(&units).unwrap().uri()).unwrap();
        assert_eq!(units, again);
    }

    #[test]
    fn sum_and_none_subtypes() {
        let sum = compose(&parse(&[DATA, INSTANCE])).unwrap();
        assert_eq!(sum.subtype(), SubType::Sum);
        assert_eq!(sum.bit_length(), 128);
        assert_eq!(sum.type_id(), "ISCC-SUM-V0-DI");

        let none = compose(&parse(&[META, DATA, INSTANCE])).unwrap();
        assert_eq!(none.subtype(), SubType::IsccNone);
        assert_eq!(none.bit_length(), 192);
        let units = decompose(&none.uri()).unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].subtype(), SubType::None);
    }

    #[test]
    fn compose_errors() {
        let cases: Vec<(Vec<&str>, &str)> = vec![
            (vec![DATA], "composition"),
            (vec![], "composition"),
            (vec![META, CONTENT], "composition"),
            (vec![META, DATA], "composition"),
            (vec![DATA, DATA, INSTANCE], "composition"),
            (vec![COMPOSITE, DATA, INSTANCE], "type"),
            (vec!["ISCC:AAAGKLHFPU", DATA, INSTANCE], "composition"),
        ];
        for (codes, kind) in cases {
            println!("Test with {:?}", codes);
            let err = gen_iscc_code(&codes).unwrap_err();
            match (kind, &err) {
                ("composition", Error::Composition(_)) => (),
                ("type", Error::TypeMismatch(_)) => (),
                _ => panic!("Expected {} error, got {:?}", kind, err),
            }
        }
    }

    #[test]
    fn subtype_conflict() {
        let semantic = Code::new(MainType::Semantic, SubType::Image, 0, 64, &[1; 8]).unwrap();
        let content = Code::new(MainType::Content, SubType::Text, 0, 64, &[2; 8]).unwrap();
        let mut codes = parse(&[DATA, INSTANCE]);
        codes.push(content.clone());
        codes.push(semantic);
        assert!(matches!(
            compose(&codes).unwrap_err(),
            Error::Composition(_)
        ));
        let semantic = Code::new(MainType::Semantic, SubType::Text, 0, 64, &[1; 8]).unwrap();
        codes.pop();
        codes.push(semantic);
        let composite = compose(&codes).unwrap();
        assert_eq!(composite.subtype(), SubType::Text);
        assert_eq!(composite.length(), 3);
    }

    #[test]
    fn id_rejected() {
        let id = Code::new(MainType::Id, SubType::Private, 0, 64, &[7; 8]).unwrap();
        let mut codes = parse(&[DATA, INSTANCE]);
        codes.push(id);
        assert!(matches!(
            compose(&codes).unwrap_err(),
            Error::TypeMismatch(_)
        ));
    }

    #[test]
    fn concatenated_units() {
        let units = parse(&[META, CONTENT]);
        let mut raw = units[0].as_bytes().to_vec();
        raw.extend_from_slice(units[1].as_bytes());
        let split = decompose_bytes(&raw).unwrap();
        assert_eq!(split, units);
    }

    #[test]
    fn decompose_rejects() {
        assert!(decompose("").is_err());
        let composite: Code = COMPOSITE.parse().unwrap();
        let mut raw = composite.as_bytes().to_vec();
        raw.push(0);
        assert!(matches!(
            decompose_bytes(&raw).unwrap_err(),
            Error::Malformed(_)
        ));
        raw.truncate(raw.len() - 3);
        assert!(matches!(
            decompose_bytes(&raw).unwrap_err(),
            Error::LengthTooShort { .. }
        ));
    }

    #[test]
    fn normalize_forms() {
        let composite: Code = COMPOSITE.parse().unwrap();
        let dashed = format!(
            "{}-{}-{}-{}",
            &META[5..],
            &CONTENT[5..],
            decompose(DATA).unwrap()[0].code(),
            decompose(INSTANCE).unwrap()[0].code()
        );
        let inputs = vec![
            COMPOSITE.to_string(),
            COMPOSITE.to_lowercase(),
            COMPOSITE[5..].to_string(),
            composite.to_multiformat(Multibase::Base16),
            composite.to_multiformat(Multibase::Base58Btc),
            composite.to_multiformat(Multibase::Base64Url),
            dashed,
        ];
        for input in inputs {
            println!("Test with {}", input);
            let normalized = normalize(&input).unwrap();
            assert_eq!(normalized, COMPOSITE);
            assert_eq!(normalize(&normalized).unwrap(), normalized);
        }
    }

    #[test]
    fn normalize_single_unit() {
        assert_eq!(normalize("aaaypxw445ftynj3").unwrap(), META);
        assert_eq!(normalize(DATA).unwrap(), DATA);
    }
}
