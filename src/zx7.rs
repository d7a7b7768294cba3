//! ZX7: optimal-parse LZ77 with Elias-gamma lengths and a two-tier offset byte.
//!
//! First byte literal, then a tag-bit-per-token stream: `0` selects a literal byte, `1` selects
//! a match encoded as the gamma code of `length - 1` followed by an offset field. The stream
//! ends with a reserved length encoding (16 zero bits where a gamma code would never leave that
//! many leading zeros, given [`MAX_MATCH_LEN`]) followed by a closing `1` bit.

use crate::bitio::{BitReader, BitWriter};
use crate::error::{CodecError, Result};
use crate::gamma::{gamma_bits, write_gamma};
use crate::parse::{extend_match, reconstruct_tokens, HashChain, ParseEntry, Token};

/// ZX7 has no tunable options; kept for uniformity with the other codec modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options;

pub const MAX_OFFSET1: usize = 128;
pub const MAX_OFFSET2: usize = 2176;
pub const MIN_MATCH: usize = 2;

/// Match lengths must stay below this so the end marker's 16-zero-bit run can never be confused
/// with a legitimate gamma-coded `length - 1`.
const MAX_MATCH_LEN: usize = 65_535;

/// Limited only by the offset field and available memory, per `spec.md` §6.
pub const MAX_INPUT: usize = usize::MAX;

fn offset_cost_bits(offset: usize) -> u32 {
    if offset <= MAX_OFFSET1 {
        8
    } else {
        12
    }
}

fn write_offset(w: &mut BitWriter, offset: usize) {
    if offset <= MAX_OFFSET1 {
        w.write_byte((offset - 1) as u8);
    } else {
        let rel = offset - 1 - MAX_OFFSET1;
        let low = (rel & 0x7F) as u8;
        let high = (rel >> 7) as u32;
        w.write_byte(0x80 | low);
        w.write_bits(high, 4);
    }
}

fn read_offset(r: &mut BitReader) -> Result<usize> {
    let b = r.read_byte()?;
    if b & 0x80 == 0 {
        Ok(b as usize + 1)
    } else {
        let low = (b & 0x7F) as usize;
        let high = r.read_bits(4)? as usize;
        Ok(((high << 7) | low) + MAX_OFFSET1 + 1)
    }
}

enum LengthToken {
    Match(u32),
    End,
}

fn read_zx7_length(r: &mut BitReader) -> Result<LengthToken> {
    let mut k = 0u32;
    loop {
        if r.read_bit()? {
            break;
        }
        k += 1;
        if k == 16 {
            r.read_bit()?; // the closing "1" bit
            return Ok(LengthToken::End);
        }
    }
    let mut value = 1u32;
    for _ in 0..k {
        value = (value << 1) | r.read_bit()? as u32;
    }
    Ok(LengthToken::Match(value))
}

fn write_zx7_end(w: &mut BitWriter) {
    for _ in 0..16 {
        w.write_bit(false);
    }
    w.write_bit(true);
}

/// Compresses `input` with ZX7's optimal parse.
pub fn compress(input: &[u8], _options: &Options) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let rest = &input[1..];
    let m = rest.len();
    let mut optimal = vec![ParseEntry::UNSET; m + 1];
    optimal[0] = ParseEntry {
        cost: 0,
        token: Token::Literal,
    };

    let mut chain = HashChain::new(m);

    for i in 0..m {
        let base = optimal[i].cost;
        if base == u32::MAX {
            if i + 1 < m {
                let key = HashChain::key(rest, i);
                chain.insert(key, i);
            }
            continue;
        }

        let lit_cost = base + 1 + 8;
        if lit_cost < optimal[i + 1].cost {
            optimal[i + 1] = ParseEntry {
                cost: lit_cost,
                token: Token::Literal,
            };
        }

        if i + 1 < m {
            let key = HashChain::key(rest, i);
            let max_len = (m - i).min(MAX_MATCH_LEN);
            if max_len >= MIN_MATCH {
                for cand in chain.candidates(key) {
                    let offset = i - cand;
                    if offset > MAX_OFFSET2 {
                        break;
                    }
                    if rest[cand] != rest[i] || rest[cand + 1] != rest[i + 1] {
                        continue;
                    }
                    let len = extend_match(rest, cand, i, 2, max_len);
                    let cost = base + 1 + gamma_bits((len - 1) as u32) + offset_cost_bits(offset);
                    let j = i + len;
                    if cost < optimal[j].cost {
                        optimal[j] = ParseEntry {
                            cost,
                            token: Token::Match { offset, length: len },
                        };
                    }
                }
            }
            chain.insert(key, i);
        }
    }

    let tokens = reconstruct_tokens(&optimal);
    let mut w = BitWriter::new();
    w.write_byte(input[0]);
    let mut pos = 0usize;
    for token in tokens {
        match token {
            Token::Literal => {
                w.write_bit(false);
                w.write_byte(rest[pos]);
                pos += 1;
            }
            Token::Match { offset, length } => {
                w.write_bit(true);
                write_gamma(&mut w, (length - 1) as u32);
                write_offset(&mut w, offset);
                pos += length;
            }
            Token::LiteralRun(_) => unreachable!("ZX7's DP never emits LiteralRun"),
        }
    }
    w.write_bit(true);
    write_zx7_end(&mut w);

    Ok(w.into_bytes())
}

/// Decompresses a ZX7 stream.
pub fn decompress(input: &[u8], _options: &Options) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let mut r = BitReader::new(input);
    let mut out = Vec::new();
    out.push(r.read_byte()?);

    loop {
        if !r.read_bit()? {
            out.push(r.read_byte()?);
            continue;
        }
        match read_zx7_length(&mut r)? {
            LengthToken::End => break,
            LengthToken::Match(length_minus_one) => {
                let length = length_minus_one as usize + 1;
                let offset = read_offset(&mut r)?;
                if offset > out.len() {
                    return Err(CodecError::InvalidBackReference {
                        offset,
                        length,
                        cursor: out.len(),
                    });
                }
                for _ in 0..length {
                    let b = out[out.len() - offset];
                    out.push(b);
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(data: &[u8]) {
        let compressed = compress(data, &Options).unwrap();
        assert_eq!(decompress(&compressed, &Options).unwrap(), data);
    }

    #[test]
    fn empty_input_round_trips_to_nothing() {
        let compressed = compress(&[], &Options).unwrap();
        assert!(compressed.is_empty());
        assert_eq!(decompress(&compressed, &Options).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn single_byte_round_trips() {
        round_trip(&[0x41]);
    }

    #[test]
    fn constant_run_round_trips_and_is_small() {
        let data = vec![0x55u8; 300];
        let compressed = compress(&data, &Options).unwrap();
        assert!(compressed.len() < 320);
        round_trip(&data);
    }

    #[test]
    fn pathological_overlap_round_trips() {
        let data: Vec<u8> = (0..1024).map(|i| if i % 2 == 0 { 1 } else { 2 }).collect();
        round_trip(&data);
    }

    #[test]
    fn random_4kib_round_trips() {
        let mut state = 0xD1B54A32D192ED03u64 ^ 0x7;
        let data: Vec<u8> = (0..4096)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state % 256) as u8
            })
            .collect();
        round_trip(&data);
    }

    #[test]
    fn far_offset_uses_the_wide_tier() {
        let mut data = vec![0x9Au8; 6];
        data.extend(std::iter::repeat(0x11u8).take(2000));
        data.extend_from_slice(&[0x9A; 6][..]);
        round_trip(&data);
    }
}
