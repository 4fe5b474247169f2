//! MinHash over 32-bit features.
//!
//! Each of 64 universal hash functions `((a * f + b) mod p) & 0xFFFFFFFF` is applied to every
//! feature, and the smallest result is kept. Two feature sets agree on a given minimum with a
//! probability close to their Jaccard similarity. The minima are then compressed by taking their
//! lowest bits, yielding a 64-bit or 256-bit digest.

use crate::bits::BitWriter;

/// Number of permutations, and so of minima.
pub const PERMUTATIONS: usize = 64;

/// The Mersenne prime 2^61 - 1.
const MPRIME: u64 = (1 << 61) - 1;
const MAXH: u64 = 0xFFFF_FFFF;

const SEED: u64 = 0x4953_4343_4D48_0001;

/// One step of the SplitMix64 generator, returning the new state and the output.
pub(crate) const fn splitmix64(state: u64) -> (u64, u64) {
    let state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    (state, z ^ (z >> 31))
}

const fn coefficients() -> ([u64; PERMUTATIONS], [u64; PERMUTATIONS]) {
    let mut a = [0u64; PERMUTATIONS];
    let mut b = [0u64; PERMUTATIONS];
    let mut state = SEED;
    let mut i = 0;
    while i < PERMUTATIONS {
        let (s, x) = splitmix64(state);
        let (s, y) = splitmix64(s);
        state = s;
        // a must be non-zero
        a[i] = x % (MPRIME - 1) + 1;
        b[i] = y % MPRIME;
        i += 1;
    }
    (a, b)
}

const COEFFICIENTS: ([u64; PERMUTATIONS], [u64; PERMUTATIONS]) = coefficients();

/// Multipliers of the permutation functions.
pub const MPA: [u64; PERMUTATIONS] = COEFFICIENTS.0;
/// Offsets of the permutation functions.
pub const MPB: [u64; PERMUTATIONS] = COEFFICIENTS.1;

/// Compute the 64 minima. With no features at all, every minimum is `0xFFFFFFFF`.
pub fn minhash(features: &[u32]) -> [u32; PERMUTATIONS] {
    let mut out = [MAXH as u32; PERMUTATIONS];
    for (min, (a, b)) in out.iter_mut().zip(MPA.iter().zip(MPB.iter())) {
        for &f in features {
            let h = ((a.wrapping_mul(f as u64).wrapping_add(*b)) % MPRIME) & MAXH;
            *min = (*min).min(h as u32);
        }
    }
    out
}

/// Pack the lowest `lsb` bits of each minimum into bytes. Bit 0 of every minimum comes first,
/// then bit 1 of every minimum, and so on, most significant bit first.
pub fn minhash_compress(mhash: &[u32], lsb: u32) -> Vec<u8> {
    let mut bits = BitWriter::new();
    for bitpos in 0..lsb {
        for h in mhash {
            bits.push((h >> bitpos) & 1, 1);
        }
    }
    bits.into_bytes()
}

/// 64-bit MinHash digest: the lowest bit of every minimum.
pub fn minhash_64(features: &[u32]) -> Vec<u8> {
    minhash_compress(&minhash(features), 1)
}

/// 256-bit MinHash digest: the lowest 4 bits of every minimum.
pub fn minhash_256(features: &[u32]) -> Vec<u8> {
    minhash_compress(&minhash(features), 4)
}
