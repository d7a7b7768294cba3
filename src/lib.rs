//! A family of 8-bit-era LZ77/LZSS and RLE compressors — MDK-RLE, LZF, Pletter v0.5, DAN1, DAN3,
//! ZX7, ZX0 and BitBuster v1.2 — with bit-exact stream formats and optimal-parse encoders.
//!
//! Every codec module exposes the same shape:
//!
//! ```ignore
//! pub fn compress(input: &[u8], options: &Options) -> Result<Vec<u8>>;
//! pub fn decompress(input: &[u8], options: &Options) -> Result<Vec<u8>>;
//! ```
//!
//! ```
//! use retrocodecs::mdkrle;
//!
//! let data = b"aaaaaaaaaabbbbbbbbbbcccccccccc";
//! let compressed = mdkrle::compress(data, &mdkrle::Options::default()).unwrap();
//! let restored = mdkrle::decompress(&compressed, &mdkrle::Options::default()).unwrap();
//! assert_eq!(restored, data);
//! ```
//!
//! [`codec::Codec`] gives a single enum spanning all eight, for callers that want to dispatch on
//! a format identifier instead of a module path.

pub mod bitbuster;
pub mod bitio;
pub mod codec;
pub mod dan1;
pub mod dan3;
pub mod error;
pub mod gamma;
pub mod lzf;
pub mod mdkrle;
pub mod parse;
pub mod pletter;
pub mod zx0;
pub mod zx7;

pub use codec::{Codec, CodecOptions};
pub use error::{CodecError, Result};
