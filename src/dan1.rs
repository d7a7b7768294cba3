//! DAN1: LZ77 with length-tiered offset widths and a capped Elias-gamma length code.
//!
//! The first input byte is stored literally, outside the token stream (mirroring Pletter).
//! Every subsequent token starts with a tag bit: `1` selects a literal byte, `0` selects either
//! a match, a RAW block, or the end marker, disambiguated by how the following length code
//! reads.
//!
//! Match offsets fall into four tiers by width:
//!
//! | tier | offsets     | field width |
//! |---|---|---|
//! | 0 | 1..=2       | 1  |
//! | 1 | 3..=18      | 4  |
//! | 2 | 19..=274    | 8  |
//! | 3 | 275..=4370  | 12 |
//!
//! Which tiers are reachable depends on the match length: length 1 only reaches tiers 0-1,
//! length 2 reaches tiers 0-2, length >= 3 reaches all four — see "Open Question decisions" in
//! `DESIGN.md` for why, since `spec.md` §4.7 is not fully unambiguous on this point.

use crate::bitio::{BitReader, BitWriter};
use crate::error::{CodecError, Result};
use crate::gamma::{gamma_bits, write_gamma};
use crate::parse::{extend_match, reconstruct_tokens, HashChain, ParseEntry, Token};

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Enables RAW literal blocks as a DP alternative (off by default, per `spec.md` §6).
    pub rle: bool,
    /// Emits `tracing` diagnostics about the chosen parse. No effect on the encoded bytes.
    pub verbose: bool,
}

pub const MAX_INPUT: usize = 262_144;

const TIER_BOUNDS: [usize; 4] = [2, 18, 274, 4370];
const TIER_WIDTHS: [u32; 4] = [1, 4, 8, 12];

/// Match lengths must stay below this so the capped gamma reader's 16-zero-bit run can never be
/// confused with a legitimate length's leading-zero count.
const MAX_MATCH_LEN: usize = 65_535;
const RAW_MIN_LEN: usize = 27;
const RAW_MAX_LEN: usize = 27 + u8::MAX as usize;
const SHORT_SEARCH_MAX_OFFSET: usize = TIER_BOUNDS[1];

fn tier_base(tier: usize) -> usize {
    if tier == 0 {
        0
    } else {
        TIER_BOUNDS[tier - 1]
    }
}

fn tier_for_offset(offset: usize) -> Option<usize> {
    TIER_BOUNDS.iter().position(|&bound| offset <= bound)
}

fn max_tiers_for_length(length: usize) -> usize {
    match length {
        1 => 2,
        2 => 3,
        _ => 4,
    }
}

fn selector_bits(length: usize, tier: usize) -> u32 {
    match max_tiers_for_length(length) {
        2 => 1,
        3 => {
            if tier == 0 {
                1
            } else {
                2
            }
        }
        _ => match tier {
            0 => 1,
            1 => 2,
            _ => 3,
        },
    }
}

fn write_selector(w: &mut BitWriter, length: usize, tier: usize) {
    match max_tiers_for_length(length) {
        2 => w.write_bit(tier == 1),
        3 => match tier {
            0 => w.write_bit(false),
            1 => {
                w.write_bit(true);
                w.write_bit(false);
            }
            _ => {
                w.write_bit(true);
                w.write_bit(true);
            }
        },
        _ => match tier {
            0 => w.write_bit(false),
            1 => {
                w.write_bit(true);
                w.write_bit(false);
            }
            2 => {
                w.write_bit(true);
                w.write_bit(true);
                w.write_bit(false);
            }
            _ => {
                w.write_bit(true);
                w.write_bit(true);
                w.write_bit(true);
            }
        },
    }
}

fn read_selector(r: &mut BitReader, length: usize) -> Result<usize> {
    Ok(match max_tiers_for_length(length) {
        2 => {
            if r.read_bit()? {
                1
            } else {
                0
            }
        }
        3 => {
            if !r.read_bit()? {
                0
            } else if !r.read_bit()? {
                1
            } else {
                2
            }
        }
        _ => {
            if !r.read_bit()? {
                0
            } else if !r.read_bit()? {
                1
            } else if !r.read_bit()? {
                2
            } else {
                3
            }
        }
    })
}

/// Total bits for a match's offset field, or `None` if `length` cannot reach `offset`'s tier.
fn offset_cost_bits(length: usize, offset: usize) -> Option<u32> {
    let tier = tier_for_offset(offset)?;
    if tier >= max_tiers_for_length(length) {
        return None;
    }
    Some(selector_bits(length, tier) + TIER_WIDTHS[tier])
}

enum LengthToken {
    Match(u32),
    Raw,
    End,
}

/// Reads a capped Elias-gamma length: 16 leading zero bits with no terminating `1` selects the
/// RAW/END branch (next bit: `1` RAW, `0` END); otherwise it's an ordinary gamma value.
fn read_dan1_length(r: &mut BitReader) -> Result<LengthToken> {
    let mut k = 0u32;
    loop {
        if r.read_bit()? {
            break;
        }
        k += 1;
        if k == 16 {
            return Ok(if r.read_bit()? {
                LengthToken::Raw
            } else {
                LengthToken::End
            });
        }
    }
    let mut value = 1u32;
    for _ in 0..k {
        value = (value << 1) | r.read_bit()? as u32;
    }
    Ok(LengthToken::Match(value))
}

fn write_dan1_length(w: &mut BitWriter, value: u32) {
    debug_assert!((value as usize) < 1 << 16);
    write_gamma(w, value);
}

fn write_raw_sentinel(w: &mut BitWriter) {
    for _ in 0..16 {
        w.write_bit(false);
    }
    w.write_bit(true);
}

fn write_end_sentinel(w: &mut BitWriter) {
    for _ in 0..16 {
        w.write_bit(false);
    }
    w.write_bit(false);
}

/// Compresses `input` with DAN1's tiered-offset LZ77.
pub fn compress(input: &[u8], options: &Options) -> Result<Vec<u8>> {
    if input.len() > MAX_INPUT {
        return Err(CodecError::InputTooLarge {
            len: input.len(),
            max: MAX_INPUT,
        });
    }
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

        if options.rle {
            let max_raw = RAW_MAX_LEN.min(m - i);
            if max_raw >= RAW_MIN_LEN {
                for len in RAW_MIN_LEN..=max_raw {
                    let cost = base + 1 + 17 + 8 + len as u32 * 8;
                    let j = i + len;
                    if cost < optimal[j].cost {
                        optimal[j] = ParseEntry {
                            cost,
                            token: Token::LiteralRun(len),
                        };
                    }
                }
            }
        }

        // Length-1 matches: cheap enough to search directly rather than via the hash chain.
        for offset in 1..=SHORT_SEARCH_MAX_OFFSET.min(i) {
            if rest[i - offset] == rest[i] {
                if let Some(offbits) = offset_cost_bits(1, offset) {
                    let cost = base + 1 + gamma_bits(1) + offbits;
                    if cost < optimal[i + 1].cost {
                        optimal[i + 1] = ParseEntry {
                            cost,
                            token: Token::Match { offset, length: 1 },
                        };
                    }
                }
            }
        }

        if i + 1 < m {
            let key = HashChain::key(rest, i);
            let max_len = (m - i).min(MAX_MATCH_LEN);
            if max_len >= 2 {
                for cand in chain.candidates(key) {
                    let offset = i - cand;
                    if offset > TIER_BOUNDS[3] {
                        break;
                    }
                    if rest[cand] != rest[i] || rest[cand + 1] != rest[i + 1] {
                        continue;
                    }
                    let len = extend_match(rest, cand, i, 2, max_len);

                    // Try the full match, and (when it differs) the 2-byte prefix alone: a
                    // shorter length can reach a tier the full length cannot afford, or simply
                    // leave room for a better-fitting token right after it.
                    let candidates: &[usize] = if len > 2 { &[len, 2] } else { &[len] };
                    for &try_len in candidates {
                        let Some(offbits) = offset_cost_bits(try_len, offset) else {
                            continue;
                        };
                        let cost = base + 1 + gamma_bits(try_len as u32) + offbits;
                        let j = i + try_len;
                        if cost < optimal[j].cost {
                            optimal[j] = ParseEntry {
                                cost,
                                token: Token::Match {
                                    offset,
                                    length: try_len,
                                },
                            };
                        }
                    }
                }
            }
            chain.insert(key, i);
        }
    }

    let tokens = reconstruct_tokens(&optimal);
    if options.verbose {
        tracing::info!(tokens = tokens.len(), total_bits = optimal[m].cost, "dan1: parsed");
    }

    let mut w = BitWriter::new();
    w.write_byte(input[0]);
    let mut pos = 0usize;
    for token in tokens {
        match token {
            Token::Literal => {
                w.write_bit(true);
                w.write_byte(rest[pos]);
                pos += 1;
            }
            Token::LiteralRun(len) => {
                w.write_bit(false);
                write_raw_sentinel(&mut w);
                w.write_byte((len - RAW_MIN_LEN) as u8);
                for &b in &rest[pos..pos + len] {
                    w.write_byte(b);
                }
                pos += len;
            }
            Token::Match { offset, length } => {
                w.write_bit(false);
                write_dan1_length(&mut w, length as u32);
                let tier = tier_for_offset(offset).expect("offset within DAN1's max tier");
                write_selector(&mut w, length, tier);
                let field = offset - 1 - tier_base(tier);
                w.write_bits(field as u32, TIER_WIDTHS[tier]);
                pos += length;
            }
        }
    }
    w.write_bit(false);
    write_end_sentinel(&mut w);

    Ok(w.into_bytes())
}

/// Decompresses a DAN1 stream.
pub fn decompress(input: &[u8], _options: &Options) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let mut r = BitReader::new(input);
    let mut out = Vec::new();
    out.push(r.read_byte()?);

    loop {
        if r.read_bit()? {
            out.push(r.read_byte()?);
            continue;
        }
        match read_dan1_length(&mut r)? {
            LengthToken::End => break,
            LengthToken::Raw => {
                let len = r.read_byte()? as usize + RAW_MIN_LEN;
                for _ in 0..len {
                    out.push(r.read_byte()?);
                }
            }
            LengthToken::Match(length) => {
                let length = length as usize;
                let tier = read_selector(&mut r, length)?;
                let field = r.read_bits(TIER_WIDTHS[tier])? as usize;
                let offset = tier_base(tier) + field + 1;
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

    fn round_trip(data: &[u8], options: &Options) {
        let compressed = compress(data, options).unwrap();
        assert_eq!(decompress(&compressed, options).unwrap(), data);
    }

    #[test]
    fn empty_input_round_trips_to_nothing() {
        let compressed = compress(&[], &Options::default()).unwrap();
        assert!(compressed.is_empty());
        assert_eq!(decompress(&compressed, &Options::default()).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn single_byte_round_trips() {
        round_trip(&[0x41], &Options::default());
    }

    #[test]
    fn constant_run_round_trips_and_is_small() {
        let data = vec![0x55u8; 300];
        let compressed = compress(&data, &Options::default()).unwrap();
        assert!(compressed.len() < 320);
        round_trip(&data, &Options::default());
    }

    #[test]
    fn pathological_overlap_round_trips() {
        let data: Vec<u8> = (0..1024).map(|i| if i % 2 == 0 { 1 } else { 2 }).collect();
        round_trip(&data, &Options::default());
    }

    #[test]
    fn random_4kib_round_trips() {
        let mut state = 0x853C49E6748FEA9Bu64;
        let data: Vec<u8> = (0..4096)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state % 256) as u8
            })
            .collect();
        round_trip(&data, &Options::default());
    }

    #[test]
    fn raw_blocks_round_trip_when_enabled() {
        // Long enough to pay off as a RAW block, but with no internal repetition a hash-chain
        // match finder would exploit, so RAW is the only way to beat one-byte-at-a-time literals.
        let mut state = 0x243F6A8885A308D3u64;
        let data: Vec<u8> = (0..200)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state % 256) as u8
            })
            .collect();
        round_trip(&data, &Options { rle: true, verbose: false });
    }

    #[test]
    fn oversized_input_is_rejected() {
        let data = vec![0u8; MAX_INPUT + 1];
        assert_eq!(
            compress(&data, &Options::default()).unwrap_err(),
            CodecError::InputTooLarge {
                len: MAX_INPUT + 1,
                max: MAX_INPUT
            }
        );
    }

    #[test]
    fn each_offset_tier_round_trips() {
        // Force matches landing in each tier by repeating a block at increasing distances.
        for &gap in &[2usize, 18, 274, 4370] {
            let mut data = vec![0xAAu8; gap];
            data.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
            data.extend(std::iter::repeat(0xBBu8).take(gap.min(50)));
            data.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
            round_trip(&data, &Options::default());
        }
    }
}
