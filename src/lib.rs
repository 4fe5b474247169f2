//! iscc-codec implements the core of the International Standard Content Code: compact,
//! similarity-preserving identifiers for digital content. It covers the parts that need to be
//! bit-exact across implementations:
//!
//! - A header format of four variable-length nibble fields (MainType, SubType, Version, Length),
//!     packed into 2 to 8 bytes
//! - Identifier values that can be built from digests, parsed from any of the accepted string
//!     forms, and rendered back out in canonical form
//! - Composite ISCC-CODEs, which fold several units under a single header
//!     - Units can be composed into a composite and decomposed back out
//!     - Any accepted input form can be normalized to its canonical composite
//! - Structural validation, and hamming distance / similarity between identifiers
//! - Content-defined chunking with a gear hash, over slices, readers, and async streams
//! - The similarity hashes used to build units from features: SimHash, MinHash, and WTA-Hash
//! - Incremental hashers for Data-Codes and Instance-Codes
//! - Minting of time-ordered Flake-Codes and ISCC-IDs, with caller-owned counter state
//!
//! Media-specific processing (text cleanup, image scaling, audio fingerprints) is left to the
//! caller, which hands this crate already-extracted features.
//!
//! # Example
//!
//! ```
//! use iscc_codec::{gen_iscc_code, normalize, Code};
//!
//! let code = gen_iscc_code(&[
//!     "ISCC:AAAYPXW445FTYNJ3",
//!     "ISCC:EAARMJLTQCUWAND2",
//!     "ISCC:GABVVC5DMJJGYKZ4ZBYVNYABFFYXG",
//!     "ISCC:IADWIK7A7JTUAQ2D6QARX7OBEIK3OOUAM42LOBLCZ4ZOGDLRHMDL6TQ",
//! ])
//! .unwrap();
//! assert_eq!(code, "ISCC:KACYPXW445FTYNJ3CYSXHAFJMA2HUWULUNRFE3BLHRSCXYH2M5AEGQY");
//!
//! let parsed: Code = code.parse().unwrap();
//! assert_eq!(parsed.type_id(), "ISCC-TEXT-V0-MCDI");
//! assert_eq!(normalize(&code.to_lowercase()).unwrap(), code);
//! ```

mod compose;
mod distance;
mod error;
mod gear;
mod hasher;
mod id;
mod options;
mod simhash;
mod validate;
mod varint;

pub mod bits;
pub mod cdc;
pub mod code;
pub mod header;
pub mod minhash;
pub mod multibase;
pub mod varnibble;
pub mod wtahash;

pub use self::cdc::{chunks, AsyncChunker, CdcParams, Chunker};
pub use self::code::{clean, encode_component, Code, SCHEME};
pub use self::compose::{compose, decompose, decompose_bytes, gen_iscc_code, normalize};
pub use self::distance::{compare, distance, hamming_distance, similarity, Comparison};
pub use self::error::{Error, Result};
pub use self::hasher::{
    gen_data_code, gen_instance_code, DataHasher, InstanceCode, InstanceDigest, InstanceHasher,
};
#[cfg(feature = "getrandom")]
pub use self::id::gen_flake_code_now;
pub use self::id::{gen_flake_code, gen_iscc_id_v1, id_increment, FlakeCounter};
pub use self::header::{decode_header, encode_header, Header, MainType, SubType};
pub use self::minhash::{minhash_256, minhash_64};
pub use self::multibase::Multibase;
pub use self::options::Options;
pub use self::simhash::simhash;
pub use self::validate::validate;
pub use self::wtahash::wtahash;
