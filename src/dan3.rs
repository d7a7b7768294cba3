//! DAN3: DAN1's sibling, adding a per-compression "subset" choice (`0..=7`) that widens the
//! outermost offset tier, selected by exhaustive trial like Pletter's `q`.
//!
//! Stream shape: a unary preamble of `subset` one-bits terminated by a `0` bit (so `subset == 7`
//! writes exactly the 8 bits of `0xFE`, never overflowing — see "Open Question decisions" in
//! `DESIGN.md`), then the first byte literal, then a tag-bit-per-token stream. Tag `1` is a
//! literal byte; tag `0` reads a "nonzero" flag followed either by a gamma-coded length and an
//! offset (flag set), or a RAW/END selector bit (flag clear).

use crate::bitio::{BitReader, BitWriter};
use crate::error::{CodecError, Result};
use crate::gamma::{gamma_bits, read_gamma, write_gamma};
use crate::parse::{extend_match, reconstruct_tokens, HashChain, ParseEntry, Token};

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Emits `tracing` diagnostics about the chosen subset and parse. No effect on the encoded
    /// bytes.
    pub verbose: bool,
}

pub const MAX_INPUT: usize = 524_288;

const TIER0_MAX_OFFSET: usize = 32;
const TIER1_MAX_OFFSET: usize = 288;
const TIER1_BASE: usize = 32;
const TIER2_BASE: usize = 288;
const MAX_SUBSET: u8 = 7;
const RAW_MAX_LEN: usize = 256;

fn tier2_width(subset: u8) -> u32 {
    subset as u32 + 9
}

fn tier2_max_offset(subset: u8) -> usize {
    TIER2_BASE + (1usize << tier2_width(subset))
}

/// Offset tier for a length-`>= 2` match: `0` (5-bit field), `1` (8-bit field), or `2` (the
/// subset-widened extended field).
fn offset_tier(offset: usize, subset: u8) -> Option<usize> {
    if offset <= TIER0_MAX_OFFSET {
        Some(0)
    } else if offset <= TIER1_MAX_OFFSET {
        Some(1)
    } else if offset <= tier2_max_offset(subset) {
        Some(2)
    } else {
        None
    }
}

fn offset_field_width(tier: usize, subset: u8) -> u32 {
    match tier {
        0 => 5,
        1 => 8,
        _ => tier2_width(subset),
    }
}

fn offset_base(tier: usize) -> usize {
    match tier {
        0 => 0,
        1 => TIER1_BASE,
        _ => TIER2_BASE,
    }
}

fn offset_selector_bits(tier: usize) -> u32 {
    if tier == 0 {
        1
    } else {
        2
    }
}

fn write_offset_selector(w: &mut BitWriter, tier: usize) {
    match tier {
        0 => w.write_bit(false),
        1 => {
            w.write_bit(true);
            w.write_bit(false);
        }
        _ => {
            w.write_bit(true);
            w.write_bit(true);
        }
    }
}

fn read_offset_selector(r: &mut BitReader) -> Result<usize> {
    Ok(if !r.read_bit()? {
        0
    } else if !r.read_bit()? {
        1
    } else {
        2
    })
}

/// Length-1 matches use a separate, narrower two-tier scheme: offset `1` (no extra bits) or
/// offsets `2..=3` (one extra bit).
fn len1_offset_tier(offset: usize) -> Option<(usize, u32, usize)> {
    match offset {
        1 => Some((0, 0, 1)),
        2 | 3 => Some((1, 1, 2)),
        _ => None,
    }
}

fn write_len1_selector(w: &mut BitWriter, tier: usize) {
    w.write_bit(tier == 1);
}

fn read_len1_selector(r: &mut BitReader) -> Result<usize> {
    Ok(if r.read_bit()? { 1 } else { 0 })
}

fn match_cost_bits(length: usize, offset: usize, subset: u8) -> Option<u32> {
    if length == 1 {
        let (_, width, _) = len1_offset_tier(offset)?;
        Some(1 + gamma_bits(1) + 1 + width)
    } else {
        let tier = offset_tier(offset, subset)?;
        Some(1 + gamma_bits(length as u32) + offset_selector_bits(tier) + offset_field_width(tier, subset))
    }
}

fn write_preamble(w: &mut BitWriter, subset: u8) {
    for _ in 0..subset {
        w.write_bit(true);
    }
    w.write_bit(false);
}

fn read_preamble(r: &mut BitReader) -> Result<u8> {
    let mut subset = 0u8;
    loop {
        if !r.read_bit()? {
            break;
        }
        subset += 1;
        if subset > MAX_SUBSET {
            return Err(CodecError::InvalidHeader("dan3 subset preamble did not terminate"));
        }
    }
    Ok(subset)
}

enum LengthToken {
    Match(u32),
    Raw,
    End,
}

fn read_dan3_length(r: &mut BitReader) -> Result<LengthToken> {
    if !r.read_bit()? {
        return Ok(if r.read_bit()? {
            LengthToken::Raw
        } else {
            LengthToken::End
        });
    }
    Ok(LengthToken::Match(read_gamma(r)?))
}

fn write_dan3_length(w: &mut BitWriter, value: u32) {
    w.write_bit(true);
    write_gamma(w, value);
}

fn write_raw_selector(w: &mut BitWriter) {
    w.write_bit(false);
    w.write_bit(true);
}

fn write_end_selector(w: &mut BitWriter) {
    w.write_bit(false);
    w.write_bit(false);
}

struct SubsetResult {
    subset: u8,
    total_bits: u32,
    tokens: Vec<Token>,
}

fn search_subset(rest: &[u8], subset: u8) -> SubsetResult {
    let m = rest.len();
    let mut optimal = vec![ParseEntry::UNSET; m + 1];
    optimal[0] = ParseEntry {
        cost: 0,
        token: Token::Literal,
    };

    let mut chain = HashChain::new(m);
    let max_offset = tier2_max_offset(subset);

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

        let max_raw = RAW_MAX_LEN.min(m - i);
        for len in 1..=max_raw {
            let cost = base + 1 + 2 + 8 + len as u32 * 8;
            let j = i + len;
            if cost < optimal[j].cost {
                optimal[j] = ParseEntry {
                    cost,
                    token: Token::LiteralRun(len),
                };
            }
        }

        for offset in 1..=3usize.min(i) {
            if rest[i - offset] == rest[i] {
                if let Some(cost_bits) = match_cost_bits(1, offset, subset) {
                    let cost = base + 1 + cost_bits;
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
            let max_len = m - i;
            for cand in chain.candidates(key) {
                let offset = i - cand;
                if offset > max_offset {
                    break;
                }
                if rest[cand] != rest[i] || rest[cand + 1] != rest[i + 1] {
                    continue;
                }
                let len = extend_match(rest, cand, i, 2, max_len);

                let candidates: &[usize] = if len > 2 { &[len, 2] } else { &[len] };
                for &try_len in candidates {
                    let Some(cost_bits) = match_cost_bits(try_len, offset, subset) else {
                        continue;
                    };
                    let cost = base + 1 + cost_bits;
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
            chain.insert(key, i);
        }
    }

    SubsetResult {
        subset,
        total_bits: optimal[m].cost,
        tokens: reconstruct_tokens(&optimal),
    }
}

/// Compresses `input` with DAN3, searching `subset` in `0..=7` for the minimal encoding.
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
    let best = (0..=MAX_SUBSET)
        .map(|subset| search_subset(rest, subset))
        .min_by_key(|r| r.total_bits)
        .expect("subset 0 is always searched");

    if options.verbose {
        tracing::info!(subset = best.subset, total_bits = best.total_bits, "dan3: selected subset");
    }

    let mut w = BitWriter::new();
    write_preamble(&mut w, best.subset);
    w.write_byte(input[0]);
    let mut pos = 0usize;
    for token in &best.tokens {
        match *token {
            Token::Literal => {
                w.write_bit(true);
                w.write_byte(rest[pos]);
                pos += 1;
            }
            Token::LiteralRun(len) => {
                w.write_bit(false);
                write_raw_selector(&mut w);
                w.write_byte((len - 1) as u8);
                for &b in &rest[pos..pos + len] {
                    w.write_byte(b);
                }
                pos += len;
            }
            Token::Match { offset, length } => {
                w.write_bit(false);
                write_dan3_length(&mut w, length as u32);
                if length == 1 {
                    let (tier, width, base) = len1_offset_tier(offset).expect("offset within len-1 tiers");
                    write_len1_selector(&mut w, tier);
                    if width > 0 {
                        w.write_bits((offset - base) as u32, width);
                    }
                } else {
                    let tier = offset_tier(offset, best.subset).expect("offset within the chosen subset");
                    write_offset_selector(&mut w, tier);
                    let width = offset_field_width(tier, best.subset);
                    w.write_bits((offset - 1 - offset_base(tier)) as u32, width);
                }
                pos += length;
            }
        }
    }
    w.write_bit(false);
    write_end_selector(&mut w);

    Ok(w.into_bytes())
}

/// Decompresses a DAN3 stream.
pub fn decompress(input: &[u8], _options: &Options) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let mut r = BitReader::new(input);
    let subset = read_preamble(&mut r)?;
    let mut out = Vec::new();
    out.push(r.read_byte()?);

    loop {
        if r.read_bit()? {
            out.push(r.read_byte()?);
            continue;
        }
        match read_dan3_length(&mut r)? {
            LengthToken::End => break,
            LengthToken::Raw => {
                let len = r.read_byte()? as usize + 1;
                for _ in 0..len {
                    out.push(r.read_byte()?);
                }
            }
            LengthToken::Match(length) => {
                let length = length as usize;
                let offset = if length == 1 {
                    let tier = read_len1_selector(&mut r)?;
                    let width = if tier == 0 { 0 } else { 1 };
                    let base = if tier == 0 { 1 } else { 2 };
                    let field = if width == 0 { 0 } else { r.read_bits(width)? as usize };
                    base + field
                } else {
                    let tier = read_offset_selector(&mut r)?;
                    let width = offset_field_width(tier, subset);
                    let field = r.read_bits(width)? as usize;
                    offset_base(tier) + field + 1
                };
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
