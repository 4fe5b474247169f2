use educe::Educe;
use serde::{Deserialize, Serialize};

use crate::cdc::CdcParams;
use crate::error::{Error, Result};

/// Tunable parameters for the code generators.
///
/// Options are always passed in explicitly; nothing here is read from the environment. They can
/// be loaded from any serde format, with missing fields taking their defaults:
///
/// - data_avg_chunk_size: 1024
/// - data_bits: 64
/// - instance_bits: 64
/// - flake_bits: 64
/// - io_read_size: 2097152 (2 MiB)
///
#[derive(Educe, Clone, Debug, Serialize, Deserialize)]
#[educe(PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct Options {
    /// Target average chunk size for Data-Codes, in bytes.
    #[educe(Default = 1024)]
    pub data_avg_chunk_size: usize,
    /// Data-Code length in bits.
    #[educe(Default = 64)]
    pub data_bits: u32,
    /// Instance-Code length in bits.
    #[educe(Default = 64)]
    pub instance_bits: u32,
    /// Flake-Code length in bits. Either 64 or 128.
    #[educe(Default = 64)]
    pub flake_bits: u32,
    /// Bytes requested per read when streaming data in.
    #[educe(Default = 2_097_152)]
    pub io_read_size: usize,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the average chunk size for Data-Codes.
    pub fn data_avg_chunk_size(mut self, size: usize) -> Self {
        self.data_avg_chunk_size = size;
        self
    }

    pub fn data_bits(mut self, bits: u32) -> Self {
        self.data_bits = bits;
        self
    }

    pub fn instance_bits(mut self, bits: u32) -> Self {
        self.instance_bits = bits;
        self
    }

    pub fn flake_bits(mut self, bits: u32) -> Self {
        self.flake_bits = bits;
        self
    }

    pub fn io_read_size(mut self, size: usize) -> Self {
        self.io_read_size = size;
        self
    }

    /// Chunking parameters for Data-Codes.
    pub fn cdc_params(&self) -> Result<CdcParams> {
        CdcParams::new(self.data_avg_chunk_size)
    }

    /// Check that every option holds a usable value.
    pub fn check(&self) -> Result<()> {
        self.cdc_params()?;
        if !(64..=256).contains(&self.data_bits) || self.data_bits % 32 != 0 {
            return Err(Error::Range(format!(
                "data_bits must be a multiple of 32 from 64 to 256, got {}",
                self.data_bits
            )));
        }
        if !(64..=256).contains(&self.instance_bits) || self.instance_bits % 32 != 0 {
            return Err(Error::Range(format!(
                "instance_bits must be a multiple of 32 from 64 to 256, got {}",
                self.instance_bits
            )));
        }
        if self.flake_bits != 64 && self.flake_bits != 128 {
            return Err(Error::Range(format!(
                "flake_bits must be 64 or 128, got {}",
                self.flake_bits
            )));
        }
        if self.io_read_size == 0 {
            return Err(Error::Range("io_read_size can't be zero".to_string()));
        }
        Ok(())
    }
}
