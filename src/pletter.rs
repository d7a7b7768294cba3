//! Pletter v0.5: bit-packed LZ77 with a compile-time choice of "offset-subset" (`q` in `1..=7`)
//! selected by exhaustive trial during compression.
//!
//! Stream shape: a 3-bit header encoding `q - 1`, then the first input byte stored literally,
//! then a token stream. Each token starts with a tag bit: `0` selects a literal byte, `1`
//! selects a match of length `length >= 2`, coded as the interlaced Elias-gamma of
//! `length - 1` followed by an offset field. End of stream is a run of 34 continuation bits:
//! more than `MAX_INPUT` ever requires, so the decoder's gamma reader treats hitting that bound
//! (rather than a stop tag) as end-of-stream. `dsk2rom` mode instead signals end of stream with
//! a complete interlaced-gamma value, `131072`, since it has no header bit budget to spare.
//!
//! Offset field: one byte `b`. If `b < 128`, `offset = b + 1`. Otherwise the low 7 bits of
//! `offset - 1` are `b & 0x7F` and the remaining high bits are a `q - 1`-bit field read
//! straight from the bitstream (no second byte) immediately after `b`.

use crate::bitio::{BitReader, BitWriter};
use crate::error::{CodecError, Result};
use crate::gamma::{read_interlaced_gamma, write_interlaced_gamma};
use crate::parse::{extend_match, reconstruct_tokens, HashChain, ParseEntry, Token};

/// `dsk2rom`: decoder-side convenience matching the `.pck`-on-disk convention used by some
/// callers — assumes `q = 2` and recognises the dedicated end-of-stream sentinel described
/// below without needing the 3-bit header at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub dsk2rom: bool,
}

/// The encoder only ever searches `q` in `1..=6`; `q == 7` is decodable but never chosen, per
/// `spec.md` §4.6.
const MAX_SEARCHED_Q: u8 = 6;
const MIN_MATCH: usize = 2;

/// Chain-walk cutoff per position — a practical bound so compression stays roughly linear even
/// on pathological repeats, in the spirit of a real encoder's "max chain length".
const MAX_CHAIN_WALK: usize = 256;

pub const MAX_INPUT: usize = 65_536;

/// `dsk2rom`-mode end-of-stream sentinel: a `length - 1` value that can never arise from a real
/// match (matches are bounded by `MAX_INPUT`), encoded through the ordinary interlaced-gamma
/// path so the decoder needs no special-cased bit pattern. Named `131072` for `dsk2rom` in
/// `spec.md` §6.
const EOF_LENGTH_MINUS_ONE: u32 = 131_072;

/// Standard-mode end marker: a run of bits the interlaced-gamma reader (`backwards = true`, so
/// `0` is the stop tag) sees as continuation tags with no stop tag ever appearing. Half this
/// many continue/payload pairs (17) already exceeds the longest real match length `MAX_INPUT`
/// can produce, so `read_standard_length` bails out as end-of-stream on reaching it rather than
/// spending a whole extra terminated value the way `dsk2rom` mode does.
const STANDARD_EOF_CONTINUATION_BITS: u32 = 34;

fn write_standard_eof(w: &mut BitWriter) {
    for _ in 0..STANDARD_EOF_CONTINUATION_BITS {
        w.write_bit(true);
    }
}

/// Reads a match length in standard (non-`dsk2rom`) mode. Mirrors `read_interlaced_gamma` with
/// `backwards = true`, but returns `None` instead of looping forever once
/// `STANDARD_EOF_CONTINUATION_BITS` bits have passed without seeing a stop tag.
fn read_standard_length(r: &mut BitReader) -> Result<Option<u32>> {
    let mut value = 1u32;
    for _ in 0..STANDARD_EOF_CONTINUATION_BITS / 2 {
        let tag = r.read_bit()?;
        if !tag {
            return Ok(Some(value));
        }
        let bit = r.read_bit()?;
        value = (value << 1) | bit as u32;
    }
    Ok(None)
}

fn max_offset_for_q(q: u8) -> usize {
    128usize << (q - 1)
}

fn extra_width_for_q(q: u8) -> u32 {
    (q - 1) as u32
}

fn offset_cost_bits(off0: usize, q: u8) -> u32 {
    if off0 < 128 {
        8
    } else {
        8 + extra_width_for_q(q)
    }
}

fn gamma_bits(value: u32) -> u32 {
    crate::gamma::gamma_bits(value)
}

struct QResult {
    q: u8,
    total_bits: u32,
    tokens: Vec<Token>,
}

fn search_q(data: &[u8], q: u8) -> QResult {
    let m = data.len();
    let mut optimal = vec![ParseEntry::UNSET; m + 1];
    optimal[0] = ParseEntry {
        cost: 0,
        token: Token::Literal,
    };

    let max_offset = max_offset_for_q(q);
    let mut chain = HashChain::new(m);

    for i in 0..m {
        let base = optimal[i].cost;
        if base != u32::MAX {
            // Literal alternative.
            let lit_cost = base + 1 + 8;
            if lit_cost < optimal[i + 1].cost {
                optimal[i + 1] = ParseEntry {
                    cost: lit_cost,
                    token: Token::Literal,
                };
            }

            if i + 1 < m {
                let key = HashChain::key(data, i);
                let max_len = m - i;
                let mut walked = 0;
                for cand in chain.candidates(key) {
                    if walked >= MAX_CHAIN_WALK {
                        break;
                    }
                    walked += 1;
                    let offset = i - cand;
                    if offset > max_offset {
                        break;
                    }
                    if data[cand] != data[i] || data[cand + 1] != data[i + 1] {
                        continue;
                    }
                    let len = extend_match(data, cand, i, 2, max_len);
                    if len < MIN_MATCH {
                        continue;
                    }
                    let cost =
                        base + 1 + gamma_bits((len - 1) as u32) + offset_cost_bits(offset - 1, q);
                    let j = i + len;
                    if cost < optimal[j].cost {
                        optimal[j] = ParseEntry {
                            cost,
                            token: Token::Match { offset, length: len },
                        };
                    }
                }
            }
        }

        if i + 1 < m {
            let key = HashChain::key(data, i);
            chain.insert(key, i);
        }
    }

    QResult {
        q,
        total_bits: optimal[m].cost,
        tokens: reconstruct_tokens(&optimal),
    }
}

/// Compresses `input` with Pletter v0.5. In standard mode, searches `q` in `1..=6` for the
/// minimal encoding and writes the 3-bit header; in `dsk2rom` mode `q` is fixed at `2` and no
/// header is written, matching what `decompress` expects back.
pub fn compress(input: &[u8], options: &Options) -> Result<Vec<u8>> {
    if input.len() > MAX_INPUT {
        return Err(CodecError::InputTooLarge {
            len: input.len(),
            max: MAX_INPUT,
        });
    }

    if input.is_empty() {
        // There is no "first byte" to store literally and nothing to encode; an empty stream
        // round-trips to empty input without the header/first-byte/EOF dance below.
        return Ok(Vec::new());
    }

    let mut w = BitWriter::new();
    let rest = &input[1..];
    let best = if options.dsk2rom {
        search_q(rest, 2)
    } else {
        (1..=MAX_SEARCHED_Q)
            .map(|q| search_q(rest, q))
            .min_by_key(|r| r.total_bits)
            .expect("at least one q is always searched")
    };

    tracing::debug!(
        q = best.q,
        total_bits = best.total_bits,
        dsk2rom = options.dsk2rom,
        "pletter: selected q"
    );

    if !options.dsk2rom {
        w.write_bits((best.q - 1) as u32, 3);
    }
    w.write_byte(input[0]);
    let mut pos = 0usize;
    for token in &best.tokens {
        match *token {
            Token::Literal => {
                w.write_bit(false);
                w.write_byte(rest[pos]);
                pos += 1;
            }
            Token::Match { offset, length } => {
                w.write_bit(true);
                write_interlaced_gamma(&mut w, (length - 1) as u32, true, false);
                let off0 = offset - 1;
                if off0 < 128 {
                    w.write_byte(off0 as u8);
                } else {
                    let width = extra_width_for_q(best.q);
                    let extra = off0 >> 7;
                    let low7 = off0 & 0x7F;
                    w.write_byte(0x80 | low7 as u8);
                    w.write_bits(extra as u32, width);
                }
                pos += length;
            }
            Token::LiteralRun(_) => unreachable!("pletter's DP never emits LiteralRun"),
        }
    }
    w.write_bit(true);
    if options.dsk2rom {
        write_interlaced_gamma(&mut w, EOF_LENGTH_MINUS_ONE, true, false);
    } else {
        write_standard_eof(&mut w);
    }

    Ok(w.into_bytes())
}

/// Decompresses a Pletter v0.5 stream.
pub fn decompress(input: &[u8], options: &Options) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let mut r = BitReader::new(input);

    let q = if options.dsk2rom {
        2
    } else {
        let header = r.read_bits(3)? as u8;
        let q = header + 1;
        if q == 0 || q > 7 {
            return Err(CodecError::InvalidQValue(q));
        }
        q
    };
    let width = extra_width_for_q(q);

    let mut out = Vec::new();
    out.push(r.read_byte()?);

    loop {
        if r.read_bit()? {
            let length_minus_one = if options.dsk2rom {
                let v = read_interlaced_gamma(&mut r, true, false)?;
                if v == EOF_LENGTH_MINUS_ONE {
                    break;
                }
                v
            } else {
                match read_standard_length(&mut r)? {
                    Some(v) => v,
                    None => break,
                }
            };
            let length = length_minus_one as usize + 1;
            let b = r.read_byte()? as usize;
            let off0 = if b < 128 {
                b
            } else {
                let extra = r.read_bits(width)? as usize;
                (b & 0x7F) | (extra << 7)
            };
            let offset = off0 + 1;
            if offset > out.len() {
                return Err(CodecError::InvalidBackReference {
                    offset,
                    length,
                    cursor: out.len(),
                });
            }
            for _ in 0..length {
                let byte = out[out.len() - offset];
                out.push(byte);
            }
        } else {
            out.push(r.read_byte()?);
        }
    }

    Ok(out)
}
