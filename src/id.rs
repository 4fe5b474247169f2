//! Minting of Flake-Codes and ISCC-IDs.
//!
//! Flake-Codes are time-ordered: a 48-bit millisecond timestamp followed by counter bits. The
//! counter state lives in a [`FlakeCounter`] owned by the caller, so independent minters never
//! share state by accident.

use byteorder::{BigEndian, WriteBytesExt};
use rand::Rng;
use tracing::trace;

use crate::code::Code;
use crate::error::{Error, Result};
use crate::header::{MainType, SubType, VERSION_0, VERSION_1};
#[cfg(feature = "getrandom")]
use crate::options::Options;
use crate::varint::UVarInt;

/// Bits of the millisecond timestamp at the front of a Flake-Code.
pub const FLAKE_TIMESTAMP_BITS: u32 = 48;

/// Largest microsecond timestamp an ISCC-ID v1 can hold.
pub const MAX_ID_TIMESTAMP: u64 = (1 << 52) - 1;
/// Largest server id an ISCC-ID v1 can hold.
pub const MAX_SERVER_ID: u16 = (1 << 12) - 1;

/// Largest counter that fits the 4 counter bytes an ID v0 may carry.
const MAX_ID_COUNTER: u64 = (1 << 28) - 1;

/// Per-millisecond counter state for minting Flake-Codes.
///
/// The first code in a millisecond starts its counter at a random value in the lower half of the
/// counter range. Further codes in the same millisecond increment it, so codes minted from one
/// counter always sort in minting order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlakeCounter {
    last: Option<(u64, u128)>,
}

impl FlakeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the counter value for a timestamp. Fails once the counter runs out of bits within
    /// one millisecond.
    pub fn next<R: Rng + ?Sized>(&mut self, ms: u64, counter_bits: u32, rng: &mut R) -> Result<u128> {
        let limit = 1u128 << counter_bits;
        let counter = match self.last {
            Some((last_ms, counter)) if last_ms == ms => {
                let next = counter + 1;
                if next >= limit {
                    return Err(Error::Range(format!(
                        "flake counter overflowed {} bits within millisecond {}",
                        counter_bits, ms
                    )));
                }
                next
            }
            _ => rng.gen::<u128>() & ((limit >> 1) - 1),
        };
        self.last = Some((ms, counter));
        Ok(counter)
    }
}

/// Mint a 64-bit or 128-bit Flake-Code for a millisecond timestamp.
pub fn gen_flake_code<R: Rng + ?Sized>(
    counter: &mut FlakeCounter,
    ms: u64,
    bits: u32,
    rng: &mut R,
) -> Result<Code> {
    if bits != 64 && bits != 128 {
        return Err(Error::Range(format!(
            "Flake-Codes are 64 or 128 bits, not {}",
            bits
        )));
    }
    if ms >> FLAKE_TIMESTAMP_BITS != 0 {
        return Err(Error::Range(format!(
            "timestamp {} doesn't fit in {} bits",
            ms, FLAKE_TIMESTAMP_BITS
        )));
    }
    let counter_bits = bits - FLAKE_TIMESTAMP_BITS;
    let count = counter.next(ms, counter_bits, rng)?;
    let mut body = Vec::with_capacity(bits as usize / 8);
    body.write_u48::<BigEndian>(ms)?;
    body.write_uint128::<BigEndian>(count, counter_bits as usize / 8)?;
    trace!(ms, counter = %count, "minted flake");
    Code::new(MainType::Flake, SubType::None, VERSION_0, bits, &body)
}

/// Mint a Flake-Code of `opts.flake_bits` bits for the current time, using the thread-local
/// RNG.
#[cfg(feature = "getrandom")]
pub fn gen_flake_code_now(counter: &mut FlakeCounter, opts: &Options) -> Result<Code> {
    use std::time::{SystemTime, UNIX_EPOCH};
    opts.check()?;
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| Error::Range("system clock is before the Unix epoch".to_string()))?
        .as_millis();
    let ms = u64::try_from(ms)
        .map_err(|_| Error::Range(format!("timestamp {} doesn't fit in 64 bits", ms)))?;
    gen_flake_code(counter, ms, opts.flake_bits, &mut rand::thread_rng())
}

/// Build a version 1 ISCC-ID from a microsecond timestamp and the id of the server minting it.
pub fn gen_iscc_id_v1(timestamp_us: u64, server_id: u16, realm: SubType) -> Result<Code> {
    if timestamp_us > MAX_ID_TIMESTAMP {
        return Err(Error::Range(format!(
            "timestamp {} doesn't fit in 52 bits",
            timestamp_us
        )));
    }
    if server_id > MAX_SERVER_ID {
        return Err(Error::Range(format!(
            "server id {} doesn't fit in 12 bits",
            server_id
        )));
    }
    let mut body = Vec::with_capacity(8);
    body.write_u64::<BigEndian>((timestamp_us << 12) | server_id as u64)?;
    Code::new(MainType::Id, realm, VERSION_1, 64, &body)
}

/// Derive the next ISCC-ID from a version 0 ID, incrementing the counter that follows its 64-bit
/// body. An ID without a counter gets the counter 1.
pub fn id_increment(code: &Code) -> Result<Code> {
    if code.maintype() != MainType::Id || code.version() != VERSION_0 {
        return Err(Error::TypeMismatch(format!(
            "only version 0 ISCC-IDs carry a counter, not {}",
            code.type_id()
        )));
    }
    let counter = match code.id_counter() {
        Some(counter) => counter? + 1,
        None => 1,
    };
    if counter > MAX_ID_COUNTER {
        return Err(Error::Range(format!(
            "ID counter {} doesn't fit in 4 bytes",
            counter
        )));
    }
    let counter = UVarInt::from_u64(counter);
    let mut body = Vec::with_capacity(8 + counter.size());
    body.extend_from_slice(&code.hash_bytes()[..8]);
    counter.write(&mut body);
    Code::new(
        MainType::Id,
        code.subtype(),
        VERSION_0,
        body.len() as u32 * 8,
        &body,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::header::Header;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn flake_layout() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut counter = FlakeCounter::new();
        let ms = 0x0123_4567_89AB;
        let code = gen_flake_code(&mut counter, ms, 64, &mut rng).unwrap();
        assert_eq!(code.maintype(), MainType::Flake);
        assert_eq!(code.bit_length(), 64);
        assert_eq!(&code.hash_bytes()[..6], &[0x01, 0x23, 0x45, 0x67, 0x89, 0xAB]);
        // Seeded into the lower half of the counter range
        assert!(code.hash_bytes()[6] < 0x80);

        let code = gen_flake_code(&mut counter, ms + 1, 128, &mut rng).unwrap();
        assert_eq!(code.hash_bytes().len(), 16);
        assert!(code.hash_bytes()[6] < 0x80);
    }

    #[test]
    fn flake_ordering() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut counter = FlakeCounter::new();
        let mut codes = Vec::new();
        for ms in [1000u64, 1000, 1000, 1001, 1001, 5000] {
            codes.push(gen_flake_code(&mut counter, ms, 64, &mut rng).unwrap());
        }
        for pair in codes.windows(2) {
            assert!(pair[0].hash_bytes() < pair[1].hash_bytes());
        }
        let first = u16::from_be_bytes([codes[0].hash_bytes()[6], codes[0].hash_bytes()[7]]);
        let third = u16::from_be_bytes([codes[2].hash_bytes()[6], codes[2].hash_bytes()[7]]);
        assert_eq!(third, first + 2);
    }

    #[test]
    fn flake_overflow() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut counter = FlakeCounter::new();
        let mut minted = 0u32;
        let err = loop {
            match gen_flake_code(&mut counter, 42, 64, &mut rng) {
                Ok(_) => minted += 1,
                Err(e) => break e,
            }
        };
        assert!(matches!(err, Error::Range(_)));
        assert!(minted > 1 << 15);
        // A new millisecond starts over
        gen_flake_code(&mut counter, 43, 64, &mut rng).unwrap();
    }

    #[test]
    fn flake_errors() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut counter = FlakeCounter::new();
        for bits in [0, 32, 96, 256] {
            assert!(gen_flake_code(&mut counter, 1, bits, &mut rng).is_err());
        }
        assert!(matches!(
            gen_flake_code(&mut counter, 1 << 48, 64, &mut rng).unwrap_err(),
            Error::Range(_)
        ));
    }

    #[cfg(feature = "getrandom")]
    #[test]
    fn flake_now() {
        let mut counter = FlakeCounter::new();
        let opts = Options::default();
        let a = gen_flake_code_now(&mut counter, &opts).unwrap();
        let b = gen_flake_code_now(&mut counter, &opts).unwrap();
        assert!(a.hash_bytes() < b.hash_bytes());
        assert_eq!(a.bit_length(), 64);

        let wide = gen_flake_code_now(&mut counter, &opts.clone().flake_bits(128)).unwrap();
        assert_eq!(wide.bit_length(), 128);
        assert_eq!(wide.hash_bytes().len(), 16);

        let bad = opts.flake_bits(96);
        assert!(matches!(
            gen_flake_code_now(&mut counter, &bad).unwrap_err(),
            Error::Range(_)
        ));
    }

    #[test]
    fn id_v1() {
        let code = gen_iscc_id_v1(0x000A_BCDE_F012_3456, 0x0FFF, SubType::Realm1).unwrap();
        assert_eq!(code.version(), 1);
        assert_eq!(code.subtype(), SubType::Realm1);
        assert_eq!(code.hash_hex(), "abcdef0123456fff");
        assert_eq!(code.explain(), "ID-REALM_1-V1-64-abcdef0123456fff");

        assert!(gen_iscc_id_v1(1 << 52, 0, SubType::Realm0).is_err());
        assert!(gen_iscc_id_v1(0, 4096, SubType::Realm0).is_err());
        assert!(matches!(
            gen_iscc_id_v1(0, 0, SubType::Private).unwrap_err(),
            Error::TypeMismatch(_)
        ));
    }

    #[test]
    fn increment() {
        let base = Code::new(MainType::Id, SubType::Ethereum, 0, 64, &[0x42; 8]).unwrap();
        let first = id_increment(&base).unwrap();
        assert_eq!(first.id_counter().unwrap().unwrap(), 1);
        assert_eq!(first.bit_length(), 72);
        assert_eq!(first.subtype(), SubType::Ethereum);
        assert_eq!(&first.hash_bytes()[..8], &[0x42; 8]);
        // The original is untouched
        assert!(base.id_counter().is_none());

        let mut code = first;
        for _ in 0..127 {
            code = id_increment(&code).unwrap();
        }
        assert_eq!(code.id_counter().unwrap().unwrap(), 128);
        assert_eq!(code.bit_length(), 80);
        assert!(validate_roundtrip(&code));
    }

    fn validate_roundtrip(code: &Code) -> bool {
        code.uri().parse::<Code>().map(|c| &c == code).unwrap_or(false)
    }

    #[test]
    fn increment_errors() {
        let meta = Code::new(MainType::Meta, SubType::None, 0, 64, &[0; 8]).unwrap();
        assert!(matches!(
            id_increment(&meta).unwrap_err(),
            Error::TypeMismatch(_)
        ));
        let v1 = gen_iscc_id_v1(1, 1, SubType::Realm0).unwrap();
        assert!(matches!(
            id_increment(&v1).unwrap_err(),
            Error::TypeMismatch(_)
        ));

        let mut body = vec![0u8; 8];
        body.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0x7F]);
        let header = Header::new(MainType::Id, SubType::Private, 0, 4).unwrap();
        let full = Code::from_header(header, &body).unwrap();
        assert_eq!(full.id_counter().unwrap().unwrap(), MAX_ID_COUNTER);
        assert!(matches!(
            id_increment(&full).unwrap_err(),
            Error::Range(_)
        ));
    }
}
