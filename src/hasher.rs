//! Incremental hashers for Data-Codes and Instance-Codes.
//!
//! Both hashers take data in pieces through `push` and are consumed by `finalize`, so a hasher
//! can't be finalized twice or fed after it's done.

use std::io::{self, Read};

use serde::{Deserialize, Serialize};
use tracing::debug;
use xxhash_rust::xxh32::xxh32;

use crate::cdc::{CdcParams, Chunks};
use crate::code::Code;
use crate::error::Result;
use crate::header::{MainType, SubType, VERSION_0};
use crate::minhash::minhash_256;
use crate::multibase::encode_base16;
use crate::options::Options;

/// Multihash prefix for a 32-byte BLAKE3 digest.
const BLAKE3_MULTIHASH: &str = "1e20";

/// Content-defined chunks of the data, each reduced to a 32-bit xxHash, then combined with
/// MinHash.
///
/// The last chunk seen is held back as a tail, since more data could still move its end. It's
/// chunked again together with the next push.
#[derive(Clone, Debug)]
pub struct DataHasher {
    params: CdcParams,
    features: Vec<u32>,
    tail: Option<Vec<u8>>,
}

impl DataHasher {
    pub fn new(params: CdcParams) -> Self {
        Self {
            params,
            features: Vec::new(),
            tail: None,
        }
    }

    /// Make a hasher using the chunk size from `opts`.
    pub fn with_options(opts: &Options) -> Result<Self> {
        Ok(Self::new(opts.cdc_params()?))
    }

    pub fn push(&mut self, data: &[u8]) {
        let joined;
        let data = match self.tail.take() {
            Some(mut tail) => {
                tail.extend_from_slice(data);
                joined = tail;
                &joined[..]
            }
            None => data,
        };
        let mut chunks = Chunks::new(data, self.params, false).peekable();
        while let Some(chunk) = chunks.next() {
            if chunks.peek().is_none() {
                self.tail = Some(chunk.to_vec());
            } else {
                self.features.push(xxh32(chunk, 0));
            }
        }
    }

    /// Number of chunk features collected so far, not counting the tail.
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Finish hashing and return the 256-bit digest.
    pub fn finalize(mut self) -> Vec<u8> {
        let tail = self.tail.take().unwrap_or_default();
        self.features.push(xxh32(&tail, 0));
        debug!(
            features = self.features.len(),
            avg_chunk_size = self.params.avg_size(),
            "data hash finalized"
        );
        minhash_256(&self.features)
    }

    /// Finish hashing and return a Data-Code of `bits` bits.
    pub fn code(self, bits: u32) -> Result<Code> {
        Code::new(MainType::Data, SubType::None, VERSION_0, bits, &self.finalize())
    }
}

impl Default for DataHasher {
    fn default() -> Self {
        Self::new(CdcParams::default())
    }
}

/// BLAKE3 over the exact bytes, along with their count.
#[derive(Clone, Debug, Default)]
pub struct InstanceHasher {
    hasher: blake3::Hasher,
    filesize: u64,
}

impl InstanceHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.filesize += data.len() as u64;
    }

    /// Finish hashing.
    pub fn finalize(self) -> InstanceDigest {
        let digest = *self.hasher.finalize().as_bytes();
        debug!(filesize = self.filesize, "instance hash finalized");
        InstanceDigest {
            digest,
            filesize: self.filesize,
        }
    }
}

/// The result of an [`InstanceHasher`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceDigest {
    pub digest: [u8; 32],
    pub filesize: u64,
}

impl InstanceDigest {
    /// The digest as a hex multihash.
    pub fn datahash(&self) -> String {
        format!("{}{}", BLAKE3_MULTIHASH, encode_base16(&self.digest))
    }

    /// An Instance-Code of `bits` bits.
    pub fn code(&self, bits: u32) -> Result<Code> {
        Code::new(MainType::Instance, SubType::None, VERSION_0, bits, &self.digest)
    }
}

/// Result of [`gen_instance_code`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceCode {
    pub iscc: Code,
    pub datahash: String,
    pub filesize: u64,
}

fn read_blocks<R: Read>(mut reader: R, size: usize, mut f: impl FnMut(&[u8])) -> Result<()> {
    let mut block = vec![0u8; size.max(1)];
    loop {
        match reader.read(&mut block) {
            Ok(0) => return Ok(()),
            Ok(n) => f(&block[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Read a stream to its end and build its Data-Code.
pub fn gen_data_code<R: Read>(reader: R, opts: &Options) -> Result<Code> {
    opts.check()?;
    let mut hasher = DataHasher::with_options(opts)?;
    read_blocks(reader, opts.io_read_size, |block| hasher.push(block))?;
    hasher.code(opts.data_bits)
}

/// Read a stream to its end and build its Instance-Code.
pub fn gen_instance_code<R: Read>(reader: R, opts: &Options) -> Result<InstanceCode> {
    opts.check()?;
    let mut hasher = InstanceHasher::new();
    read_blocks(reader, opts.io_read_size, |block| hasher.push(block))?;
    let digest = hasher.finalize();
    Ok(InstanceCode {
        iscc: digest.code(opts.instance_bits)?,
        datahash: digest.datahash(),
        filesize: digest.filesize,
    })
}
