//! Hamming distance and similarity between identifiers.

use serde::{Deserialize, Serialize};

use crate::code::Code;
use crate::compose::decompose_bytes;
use crate::error::{Error, Result};
use crate::header::{MainType, VERSION_0};

/// Count differing bits over the common prefix of two byte strings.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

fn check_comparable(a: &Code, b: &Code) -> Result<()> {
    if (a.maintype(), a.subtype(), a.version()) != (b.maintype(), b.subtype(), b.version()) {
        return Err(Error::TypeMismatch(format!(
            "headers don't match: {} vs {}",
            a.type_id(),
            b.type_id()
        )));
    }
    if a.maintype() == MainType::Instance {
        return Err(Error::TypeMismatch(
            "Instance-Codes can only be compared for equality".to_string(),
        ));
    }
    if a.maintype() == MainType::Id && a.version() > VERSION_0 {
        return Err(Error::TypeMismatch(
            "ID codes past version 0 can only be compared for equality".to_string(),
        ));
    }
    Ok(())
}

/// Hamming distance between the bodies of two identifiers with matching headers. Bodies of
/// different lengths are compared over the shorter one. Instance-Codes and ISCC-IDs past
/// version 0 have no meaningful distance and are refused; [`compare`] checks them for equality.
pub fn distance(a: &Code, b: &Code) -> Result<u32> {
    check_comparable(a, b)?;
    Ok(hamming_distance(a.hash_bytes(), b.hash_bytes()))
}

/// Similarity of two identifiers as a percentage, 100 meaning identical bodies.
pub fn similarity(a: &Code, b: &Code) -> Result<u32> {
    check_comparable(a, b)?;
    let bits = a.bit_length().min(b.bit_length());
    let dist = hamming_distance(a.hash_bytes(), b.hash_bytes());
    Ok((100.0 * (1.0 - dist as f64 / bits as f64)).round() as u32)
}

/// Unit-by-unit comparison of two identifiers. Facets missing from either side are `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub meta_dist: Option<u32>,
    pub semantic_dist: Option<u32>,
    pub content_dist: Option<u32>,
    pub data_dist: Option<u32>,
    /// INSTANCE units are exact hashes, so they only match or don't.
    pub instance_match: Option<bool>,
    /// ID and FLAKE units are compared for equality.
    pub id_match: Option<bool>,
}

/// Decompose both identifiers and compare each facet they share.
pub fn compare(a: &Code, b: &Code) -> Result<Comparison> {
    let units_a = decompose_bytes(a.as_bytes())?;
    let units_b = decompose_bytes(b.as_bytes())?;
    let mut result = Comparison::default();
    for ua in &units_a {
        let Some(ub) = units_b.iter().find(|u| u.maintype() == ua.maintype()) else {
            continue;
        };
        match ua.maintype() {
            MainType::Meta => result.meta_dist = Some(distance(ua, ub)?),
            MainType::Semantic => result.semantic_dist = Some(distance(ua, ub)?),
            MainType::Content => result.content_dist = Some(distance(ua, ub)?),
            MainType::Data => result.data_dist = Some(distance(ua, ub)?),
            MainType::Instance => {
                let n = ua.hash_bytes().len().min(ub.hash_bytes().len());
                result.instance_match = Some(ua.hash_bytes()[..n] == ub.hash_bytes()[..n]);
            }
            MainType::Id | MainType::Flake => result.id_match = Some(ua == ub),
            MainType::Iscc => (),
        }
    }
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::header::SubType;

    fn unit(mtype: MainType, stype: SubType, body: &[u8]) -> Code {
        Code::new(mtype, stype, 0, body.len() as u32 * 8, body).unwrap()
    }

    #[test]
    fn hamming() {
        assert_eq!(hamming_distance(&[0xFF], &[0x00]), 8);
        assert_eq!(hamming_distance(&[0b1010], &[0b0110]), 2);
        assert_eq!(hamming_distance(&[1, 2, 3], &[1, 2]), 0);
        assert_eq!(hamming_distance(&[], &[]), 0);
    }

    #[test]
    fn distance_properties() {
        let a = unit(MainType::Content, SubType::Image, &[0x0F; 8]);
        let b = unit(MainType::Content, SubType::Image, &[0xFF; 8]);
        assert_eq!(distance(&a, &a).unwrap(), 0);
        assert_eq!(distance(&a, &b).unwrap(), 32);
        assert_eq!(distance(&b, &a).unwrap(), 32);
        assert_eq!(similarity(&a, &b).unwrap(), 50);
        assert_eq!(similarity(&a, &a).unwrap(), 100);
        let c = unit(MainType::Content, SubType::Image, &[0xF0; 8]);
        assert_eq!(distance(&a, &c).unwrap(), 64);
        assert_eq!(similarity(&a, &c).unwrap(), 0);
    }

    #[test]
    fn common_prefix() {
        let short = unit(MainType::Data, SubType::None, &[0xAA; 8]);
        let mut long_body = vec![0xAA; 8];
        long_body.extend_from_slice(&[0x55; 8]);
        let long = unit(MainType::Data, SubType::None, &long_body);
        assert_eq!(distance(&short, &long).unwrap(), 0);
        assert_eq!(similarity(&short, &long).unwrap(), 100);
    }

    #[test]
    fn mismatched_headers() {
        let a = unit(MainType::Content, SubType::Image, &[0; 8]);
        let cases = [
            unit(MainType::Content, SubType::Text, &[0; 8]),
            unit(MainType::Data, SubType::None, &[0; 8]),
            unit(MainType::Meta, SubType::None, &[0; 8]),
        ];
        for b in cases {
            println!("Test with {}", b.type_id());
            assert!(matches!(
                distance(&a, &b).unwrap_err(),
                Error::TypeMismatch(_)
            ));
            assert!(similarity(&a, &b).is_err());
        }
    }

    #[test]
    fn id_v1_equality_only() {
        let a = Code::new(MainType::Id, SubType::Realm0, 1, 64, &[1; 8]).unwrap();
        assert!(matches!(
            distance(&a, &a).unwrap_err(),
            Error::TypeMismatch(_)
        ));
        let b = Code::new(MainType::Id, SubType::Realm0, 1, 64, &[2; 8]).unwrap();
        let cmp = compare(&a, &b).unwrap();
        assert_eq!(cmp.id_match, Some(false));
        assert_eq!(compare(&a, &a).unwrap().id_match, Some(true));
    }

    #[test]
    fn instance_equality_only() {
        let a = unit(MainType::Instance, SubType::None, &[0xAB; 8]);
        let b = unit(MainType::Instance, SubType::None, &[0xAC; 8]);
        for (x, y) in [(&a, &a), (&a, &b)] {
            assert!(matches!(distance(x, y).unwrap_err(), Error::TypeMismatch(_)));
            assert!(matches!(similarity(x, y).unwrap_err(), Error::TypeMismatch(_)));
        }
        assert_eq!(compare(&a, &a).unwrap().instance_match, Some(true));
        assert_eq!(compare(&a, &b).unwrap().instance_match, Some(false));
    }

    #[test]
    fn compare_composites() {
        let a: Code = "ISCC:KACYPXW445FTYNJ3CYSXHAFJMA2HUWULUNRFE3BLHRSCXYH2M5AEGQY"
            .parse()
            .unwrap();
        let same = compare(&a, &a).unwrap();
        assert_eq!(
            same,
            Comparison {
                meta_dist: Some(0),
                semantic_dist: None,
                content_dist: Some(0),
                data_dist: Some(0),
                instance_match: Some(true),
                id_match: None,
            }
        );

        let mut units = decompose_bytes(a.as_bytes()).unwrap();
        let mut data = units[2].hash_bytes().to_vec();
        data[0] ^= 0b0000_0111;
        units[2] = unit(MainType::Data, SubType::None, &data);
        units[3] = unit(MainType::Instance, SubType::None, &[0; 8]);
        let b = crate::compose::compose(&units).unwrap();
        let cmp = compare(&a, &b).unwrap();
        assert_eq!(cmp.data_dist, Some(3));
        assert_eq!(cmp.instance_match, Some(false));
        assert_eq!(cmp.meta_dist, Some(0));
    }

    #[test]
    fn compare_unit_with_composite() {
        let a: Code = "ISCC:KACYPXW445FTYNJ3CYSXHAFJMA2HUWULUNRFE3BLHRSCXYH2M5AEGQY"
            .parse()
            .unwrap();
        let meta: Code = "ISCC:AAAYPXW445FTYNJ3".parse().unwrap();
        let cmp = compare(&meta, &a).unwrap();
        assert_eq!(cmp.meta_dist, Some(0));
        assert_eq!(cmp.data_dist, None);
    }
}
