//! LZF (simplified, end-marker variant): byte-aligned LZ77 with a literal control byte and two
//! match tiers.
//!
//! Control byte `B`, `control = B >> 5`:
//! - `control == 0`: literal run, `length = (B & 0x1F) + 1`, bytes follow.
//! - `control == 7`: long match, next byte is `length - 9`, then a byte with the low 8 bits of
//!   `offset - 1`; the high 5 bits of `offset - 1` are `B & 0x1F`.
//! - `control` in `1..=6`: short match, `length = control + 2`, next byte is the low 8 bits of
//!   `offset - 1`; the high 5 bits are `B & 0x1F`.
//!
//! The stream ends with the byte `0xFF` used as a sentinel control byte (a real literal control
//! byte's top 3 bits are always `0`, and a real match control byte's top 3 bits are `1..=7`, so
//! `0xFF` — top 3 bits `111` with all literal-run bits set too — never occurs as a genuine
//! control byte emitted by this encoder).

use crate::error::{CodecError, Result};
use crate::parse::{extend_match, reconstruct_tokens, HashChain, ParseEntry, Token};

/// LZF has no tunable options; kept for uniformity with the other codec modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options;

pub const MAX_OFFSET: usize = 7936;
pub const MIN_MATCH: usize = 3;
pub const MAX_SHORT_MATCH: usize = 8;
pub const MAX_LONG_MATCH: usize = 264;
const MAX_LITERAL_RUN: usize = 32;
const END_MARKER: u8 = 0xFF;

/// This codec does not bound its input itself (see `spec.md` §6).
pub const MAX_INPUT: usize = usize::MAX;

fn match_cost(len: usize) -> u32 {
    if len <= MAX_SHORT_MATCH {
        2
    } else {
        3
    }
}

fn literal_cost(len: usize) -> u32 {
    1 + len as u32
}

/// Compresses `input` with an optimal parse over literal-run and match alternatives.
pub fn compress(input: &[u8], _options: &Options) -> Result<Vec<u8>> {
    let n = input.len();
    let mut optimal = vec![ParseEntry::UNSET; n + 1];
    optimal[0] = ParseEntry {
        cost: 0,
        token: Token::Literal,
    };

    let mut chain = HashChain::new(n);

    for i in 0..n {
        let base = optimal[i].cost;
        if base == u32::MAX {
            chain_insert_if_possible(&mut chain, input, i);
            continue;
        }

        for len in 1..=MAX_LITERAL_RUN.min(n - i) {
            let cost = base + literal_cost(len);
            let j = i + len;
            if cost < optimal[j].cost {
                optimal[j] = ParseEntry {
                    cost,
                    token: Token::LiteralRun(len),
                };
            }
        }

        if i + 2 < n {
            let key = HashChain::key(input, i);
            let max_len = (n - i).min(MAX_LONG_MATCH);
            if max_len >= MIN_MATCH {
                let mut best_short: Option<(usize, usize)> = None;
                let mut best_long: Option<(usize, usize)> = None;

                for cand in chain.candidates(key) {
                    let offset = i - cand;
                    if offset > MAX_OFFSET {
                        break;
                    }
                    if input[cand] != input[i] || input[cand + 1] != input[i + 1] {
                        continue;
                    }
                    let len = extend_match(input, cand, i, 2, max_len);
                    if len < MIN_MATCH {
                        continue;
                    }
                    if len.min(MAX_SHORT_MATCH) > best_short.map_or(0, |(_, l)| l) {
                        best_short = Some((offset, len.min(MAX_SHORT_MATCH)));
                    }
                    if len > best_long.map_or(0, |(_, l)| l) {
                        best_long = Some((offset, len));
                    }
                }

                for candidate in [best_short, best_long].into_iter().flatten() {
                    let (offset, len) = candidate;
                    let cost = base + match_cost(len);
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
    let mut out = Vec::with_capacity(n + n / 8 + 4);
    let mut pos = 0usize;
    for token in tokens {
        match token {
            Token::LiteralRun(len) => {
                out.push((len - 1) as u8);
                out.extend_from_slice(&input[pos..pos + len]);
                pos += len;
            }
            Token::Match { offset, length } => {
                let off = offset - 1;
                if length <= MAX_SHORT_MATCH {
                    let control = (length - 2) as u8;
                    out.push((control << 5) | ((off >> 8) as u8 & 0x1F));
                    out.push((off & 0xFF) as u8);
                } else {
                    out.push((7u8 << 5) | ((off >> 8) as u8 & 0x1F));
                    out.push((length - 9) as u8);
                    out.push((off & 0xFF) as u8);
                }
                pos += length;
            }
            Token::Literal => unreachable!("LZF's DP only ever emits LiteralRun tokens"),
        }
    }
    out.push(END_MARKER);
    Ok(out)
}

fn chain_insert_if_possible(chain: &mut HashChain, input: &[u8], pos: usize) {
    if pos + 1 < input.len() {
        let key = HashChain::key(input, pos);
        chain.insert(key, pos);
    }
}

/// Decompresses an LZF stream.
pub fn decompress(input: &[u8], _options: &Options) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    loop {
        let control = *input.get(pos).ok_or(CodecError::TruncatedStream)?;
        pos += 1;
        if control == END_MARKER {
            break;
        }
        let hi = (control & 0x1F) as usize;
        let tier = control >> 5;
        if tier == 0 {
            let len = hi + 1;
            let end = pos + len;
            let bytes = input.get(pos..end).ok_or(CodecError::TruncatedStream)?;
            out.extend_from_slice(bytes);
            pos = end;
        } else {
            let length = if tier == 7 {
                let extra = *input.get(pos).ok_or(CodecError::TruncatedStream)? as usize;
                pos += 1;
                extra + 9
            } else {
                tier as usize + 2
            };
            let lo = *input.get(pos).ok_or(CodecError::TruncatedStream)? as usize;
            pos += 1;
            let offset = ((hi << 8) | lo) + 1;
            if offset > out.len() {
                return Err(CodecError::InvalidBackReference {
                    offset,
                    length,
                    cursor: out.len(),
                });
            }
            for k in 0..length {
                let byte = out[out.len() - offset];
                out.push(byte);
                let _ = k;
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
    fn empty_input_round_trips_to_just_the_end_marker() {
        let compressed = compress(&[], &Options).unwrap();
        assert_eq!(compressed, vec![END_MARKER]);
        assert_eq!(decompress(&compressed, &Options).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn single_byte_round_trips() {
        round_trip(&[0x41]);
    }

    #[test]
    fn constant_run_compresses_well() {
        let data = vec![0x55u8; 300];
        let compressed = compress(&data, &Options).unwrap();
        assert!(compressed.len() < 320);
        round_trip(&data);
    }

    #[test]
    fn pathological_overlap_compresses_to_few_tokens() {
        let data: Vec<u8> = (0..1024).map(|i| if i % 2 == 0 { 1 } else { 2 }).collect();
        let compressed = compress(&data, &Options).unwrap();
        assert!(compressed.len() < 64);
        round_trip(&data);
    }

    #[test]
    fn end_marker_appears_exactly_once_at_the_end() {
        let data: Vec<u8> = (0..300u32).map(|i| (i % 251) as u8).collect();
        let compressed = compress(&data, &Options).unwrap();
        assert_eq!(*compressed.last().unwrap(), END_MARKER);
        // 0xFF may appear inside literal payload bytes, but never as the byte that terminates
        // decoding before the stream has been fully consumed.
        assert_eq!(decompress(&compressed, &Options).unwrap(), data);
    }

    #[test]
    fn random_4kib_round_trips() {
        let mut state = 0x9E3779B97F4A7C15u64;
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
    fn truncated_match_errors() {
        let compressed = vec![0x20]; // short match control byte, missing the offset-low byte
        assert_eq!(
            decompress(&compressed, &Options).unwrap_err(),
            CodecError::TruncatedStream
        );
    }
}
