//! SimHash: a bitwise majority vote over equal-length digests.

use crate::error::{Error, Result};

/// Combine digests into one of the same length. Each output bit is set if at least half of the
/// inputs have it set.
pub fn simhash<D: AsRef<[u8]>>(digests: &[D]) -> Result<Vec<u8>> {
    let first = digests
        .first()
        .ok_or_else(|| Error::Malformed("simhash needs at least one digest".to_string()))?;
    let n_bytes = first.as_ref().len();
    let mut counts = vec![0usize; n_bytes * 8];
    for digest in digests {
        let digest = digest.as_ref();
        if digest.len() != n_bytes {
            return Err(Error::Malformed(format!(
                "simhash digests must all be {} bytes, got one of {}",
                n_bytes,
                digest.len()
            )));
        }
        for (i, byte) in digest.iter().enumerate() {
            for bit in 0..8 {
                counts[i * 8 + bit] += ((byte >> (7 - bit)) & 1) as usize;
            }
        }
    }
    let n = digests.len();
    let mut out = vec![0u8; n_bytes];
    for (i, count) in counts.iter().enumerate() {
        if count * 2 >= n {
            out[i / 8] |= 0x80 >> (i % 8);
        }
    }
    Ok(out)
}
