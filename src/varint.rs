use byteorder::ReadBytesExt;

use crate::error::{Error, Result};

/// Unsigned LEB128 integer, used for the counter trailing an ID body. Seven bits per byte, least
/// significant group first, high bit set on every byte but the last.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UVarInt {
    n: u64,
}

impl UVarInt {
    pub fn from_u64(n: u64) -> UVarInt {
        UVarInt { n }
    }

    pub fn to_u64(self) -> u64 {
        self.n
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        let bits = 64 - self.n.leading_zeros() as usize;
        bits.max(1).div_ceil(7)
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        let mut n = self.n;
        loop {
            let byte = (n & 0x7F) as u8;
            n >>= 7;
            if n == 0 {
                buf.push(byte);
                break;
            }
            buf.push(byte | 0x80);
        }
    }

    /// Read a varint, requiring it to use its shortest encoding.
    pub fn read(buf: &mut &[u8]) -> Result<UVarInt> {
        let mut n = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = buf.read_u8().map_err(|_| Error::LengthTooShort {
                step: "decode uvarint",
                actual: 0,
                expected: 1,
            })?;
            if shift >= 63 && byte > 1 {
                return Err(Error::Range("uvarint larger than a u64".to_string()));
            }
            n |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                if byte == 0 && shift > 0 {
                    return Err(Error::Malformed(
                        "uvarint is not the shortest encoding".to_string(),
                    ));
                }
                return Ok(UVarInt { n });
            }
            shift += 7;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_2() {
        for s in 0..=63 {
            let mut buf = Vec::new();
            let i = UVarInt::from_u64(1u64 << s);
            i.write(&mut buf);
            assert_eq!(buf.len(), i.size(), "Size should match encoding");
            let o = UVarInt::read(&mut &buf[..]).unwrap();
            assert_eq!(i, o, "UVarInt should match");
            assert_eq!(1u64 << s, o.to_u64(), "u64 results should match");
        }
    }

    #[test]
    fn spec() {
        let cases: Vec<(u64, Vec<u8>)> = vec![
            (0, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7F]),
            (128, vec![0x80, 0x01]),
            (300, vec![0xAC, 0x02]),
            (16384, vec![0x80, 0x80, 0x01]),
        ];
        for (n, enc) in cases {
            let mut buf = Vec::new();
            UVarInt::from_u64(n).write(&mut buf);
            assert_eq!(buf, enc);
            let mut raw = &enc[..];
            assert_eq!(UVarInt::read(&mut raw).unwrap().to_u64(), n);
            assert!(raw.is_empty());
        }
    }

    #[test]
    fn bad_encodings() {
        // Continuation bit set on the last byte
        assert!(UVarInt::read(&mut &[0x80u8][..]).is_err());
        // Trailing zero group
        assert!(UVarInt::read(&mut &[0x81u8, 0x00][..]).is_err());
        // Empty
        assert!(UVarInt::read(&mut &[][..]).is_err());
    }
}
