//! ZX0: "last-offset-reuse" LZ77 with interlaced Elias-gamma codes and a three-state decoder.
//!
//! Every token is preceded by one indicator bit. The bit's meaning is resolved by a three-state
//! machine tracking which kind of token produced the *current* state — `Literals`,
//! `LastOffset` (a reuse copy), or `NewOffset` (a freshly announced copy) — never by the bit
//! alone: out of `Literals`, `0` means "copy from the last-used offset again"; out of
//! `LastOffset` or `NewOffset`, `0` means "another literal run". A `1` always means "copy from a
//! brand new offset". This lets a run of repeated matches against the same distance — the common
//! case for tiling patterns — pay only a length code after the first occurrence, but only
//! directly after a literal run: a reuse can never immediately follow another copy, so the
//! optimal parse only prices that shortcut when its own arrival state is `Literals`, and two
//! adjacent literal runs (e.g. either side of `LITERAL_RUN_CAP`) are coalesced into one block
//! before emission since the grammar has no way to express literal-after-literal either.
//!
//! New-offset matches pack their length's first interlaced-gamma bit into the low bit of the
//! offset's LSB byte (the "backtrack" trick — see [`crate::bitio::BitWriter::backpatch_bit`]),
//! grounded directly in the reference encoder at
//! `examples/other_examples/8e8b98cb_thedjinn-zx0-rs__src-compress.rs.rs`.

use crate::bitio::{BitReader, BitWriter};
use crate::error::{CodecError, Result};
use crate::gamma::{gamma_bits, read_interlaced_gamma, write_interlaced_gamma};
use crate::parse::{extend_match, HashChain, Token};

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Disables inversion of the new-offset MSB's interlaced-gamma payload bits.
    pub classic: bool,
    /// Compresses/decompresses with the buffer reversed, and flips the interlaced-gamma
    /// continuation-tag sense throughout.
    pub backwards: bool,
    /// Caps `MaxOffset` at ZX7's value (2176) instead of this codec's wider default.
    pub quick: bool,
    /// Number of leading bytes forced into the initial literal run, skipping match search.
    pub skip: usize,
}

/// Limited only by the offset field and available memory, per `spec.md` §6.
pub const MAX_INPUT: usize = usize::MAX;

/// Keeps the new-offset MSB field at most `254`, leaving `255` spare and `256` free for the EOF
/// sentinel.
const MAX_OFFSET_DEFAULT: usize = 128 * 254;
const INITIAL_OFFSET: usize = 1;
const LITERAL_RUN_CAP: usize = 64;
const EOF_MSB: u32 = 256;

fn max_offset(options: &Options) -> usize {
    if options.quick {
        crate::zx7::MAX_OFFSET2
    } else {
        MAX_OFFSET_DEFAULT
    }
}

fn msb_of(offset: usize) -> u32 {
    ((offset - 1) / 128 + 1) as u32
}

fn new_offset_cost_bits(offset: usize, length: usize) -> u32 {
    1 + gamma_bits(msb_of(offset)) + 8 + gamma_bits((length - 1) as u32)
}

fn reuse_cost_bits(length: usize) -> u32 {
    1 + gamma_bits(length as u32)
}

fn literal_run_cost_bits(length: usize) -> u32 {
    1 + gamma_bits(length as u32) + length as u32 * 8
}

/// Writes an interlaced Elias-gamma code whose first tag bit is folded into the low bit of an
/// already-written byte (`backpatch_index`) instead of a fresh bit-holder byte.
fn write_length_backtracked(w: &mut BitWriter, backpatch_index: usize, value: u32, backwards: bool) {
    debug_assert!(value >= 1);
    let continue_tag = backwards;
    let stop_tag = !backwards;

    let mut i = 2u32;
    while i <= value {
        i <<= 1;
    }
    i >>= 1;

    let mut first = true;
    loop {
        i >>= 1;
        if i == 0 {
            break;
        }
        if first {
            w.backpatch_bit(backpatch_index, continue_tag);
            first = false;
        } else {
            w.write_bit(continue_tag);
        }
        w.write_bit(value & i != 0);
    }
    if first {
        w.backpatch_bit(backpatch_index, stop_tag);
    } else {
        w.write_bit(stop_tag);
    }
}

/// Mirrors [`write_length_backtracked`]: the first tag bit is supplied by the caller (read out of
/// the offset LSB byte's low bit) rather than pulled from the stream.
fn read_length_backtracked(r: &mut BitReader, first_tag: bool, backwards: bool) -> Result<u32> {
    let stop_tag = !backwards;
    let mut value = 1u32;
    let mut tag = first_tag;
    loop {
        if tag == stop_tag {
            break;
        }
        let bit = r.read_bit()?;
        value = (value << 1) | bit as u32;
        tag = r.read_bit()?;
    }
    Ok(value)
}

/// Which kind of token an `Entry` was reached by — the decoder's true three-state grammar,
/// tracked explicitly rather than collapsed to a literal-vs-match boolean, since a reuse copy is
/// only ever legal directly out of `Literals` (see the module doc comment).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenState {
    Literals,
    LastOffset,
    NewOffset,
}

#[derive(Clone, Copy)]
struct Entry {
    cost: u32,
    token: Token,
    last_offset: usize,
    state: TokenState,
}

impl Entry {
    const UNSET: Entry = Entry {
        cost: u32::MAX,
        token: Token::Literal,
        last_offset: INITIAL_OFFSET,
        state: TokenState::NewOffset,
    };
}

/// Two adjacent `LiteralRun` tokens can't be expressed by the grammar (literal never follows
/// literal); `run_parse` still chains them across `LITERAL_RUN_CAP` for tractable search, so
/// emission coalesces any run of consecutive `LiteralRun` tokens into one before writing bits.
fn merge_literal_runs(tokens: Vec<Token>) -> Vec<Token> {
    let mut merged: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let Token::LiteralRun(len) = token {
            if let Some(Token::LiteralRun(prev_len)) = merged.last_mut() {
                *prev_len += len;
                continue;
            }
        }
        merged.push(token);
    }
    merged
}

fn reconstruct(optimal: &[Entry]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = optimal.len() - 1;
    while i > 0 {
        let entry = &optimal[i];
        tokens.push(entry.token);
        i -= entry.token.len();
    }
    tokens.reverse();
    tokens
}

fn run_parse(data: &[u8], options: &Options) -> Vec<Token> {
    let m = data.len();
    let mut optimal = vec![Entry::UNSET; m + 1];
    optimal[0] = Entry {
        cost: 0,
        token: Token::Literal,
        last_offset: INITIAL_OFFSET,
        state: TokenState::NewOffset,
    };

    let max_off = max_offset(options);
    let mut chain = HashChain::new(m);
    let skip = options.skip.min(m);

    for i in 0..m {
        let base = optimal[i];
        if base.cost == u32::MAX {
            if i + 1 < m {
                chain.insert(HashChain::key(data, i), i);
            }
            continue;
        }

        for len in 1..=LITERAL_RUN_CAP.min(m - i) {
            let cost = base.cost + literal_run_cost_bits(len);
            let j = i + len;
            if cost < optimal[j].cost {
                optimal[j] = Entry {
                    cost,
                    token: Token::LiteralRun(len),
                    last_offset: base.last_offset,
                    state: TokenState::Literals,
                };
            }
        }

        if i >= skip {
            // Length-1 reuse of the active offset: cheap enough to check directly. Only legal
            // when this position was reached by a literal run — a reuse can't immediately
            // follow another copy.
            if base.state == TokenState::Literals
                && base.last_offset <= i
                && data[i - base.last_offset] == data[i]
            {
                let cost = base.cost + reuse_cost_bits(1);
                if cost < optimal[i + 1].cost {
                    optimal[i + 1] = Entry {
                        cost,
                        token: Token::Match {
                            offset: base.last_offset,
                            length: 1,
                        },
                        last_offset: base.last_offset,
                        state: TokenState::LastOffset,
                    };
                }
            }

            if i + 1 < m {
                let key = HashChain::key(data, i);
                let max_len = m - i;
                if max_len >= 2 {
                    for cand in chain.candidates(key) {
                        let offset = i - cand;
                        if offset > max_off {
                            break;
                        }
                        if data[cand] != data[i] || data[cand + 1] != data[i + 1] {
                            continue;
                        }
                        let len = extend_match(data, cand, i, 2, max_len);
                        let lens: &[usize] = if len > 2 { &[len, 2] } else { &[len] };
                        for &try_len in lens {
                            if base.state == TokenState::Literals && offset == base.last_offset {
                                let cost = base.cost + reuse_cost_bits(try_len);
                                let j = i + try_len;
                                if cost < optimal[j].cost {
                                    optimal[j] = Entry {
                                        cost,
                                        token: Token::Match {
                                            offset,
                                            length: try_len,
                                        },
                                        last_offset: offset,
                                        state: TokenState::LastOffset,
                                    };
                                }
                            }
                            let cost = base.cost + new_offset_cost_bits(offset, try_len);
                            let j = i + try_len;
                            if cost < optimal[j].cost {
                                optimal[j] = Entry {
                                    cost,
                                    token: Token::Match {
                                        offset,
                                        length: try_len,
                                    },
                                    last_offset: offset,
                                    state: TokenState::NewOffset,
                                };
                            }
                        }
                    }
                }
                chain.insert(key, i);
            }
        } else if i + 1 < m {
            chain.insert(HashChain::key(data, i), i);
        }
    }

    reconstruct(&optimal)
}

/// Compresses `input` with ZX0.
pub fn compress(input: &[u8], options: &Options) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let reversed;
    let data: &[u8] = if options.backwards {
        reversed = input.iter().rev().copied().collect::<Vec<u8>>();
        &reversed
    } else {
        input
    };

    let invert = !options.classic;
    let tokens = merge_literal_runs(run_parse(data, options));

    let mut w = BitWriter::new();
    let mut pos = 0usize;
    let mut last_offset = INITIAL_OFFSET;
    // Bootstrap as a non-literal predecessor: the very first token is always a literal run, and
    // `0` out of `LastOffset`/`NewOffset` is exactly what selects one.
    let mut state = TokenState::NewOffset;
    for token in tokens {
        match token {
            Token::LiteralRun(len) => {
                w.write_bit(false);
                write_interlaced_gamma(&mut w, len as u32, options.backwards, false);
                for &b in &data[pos..pos + len] {
                    w.write_byte(b);
                }
                pos += len;
                state = TokenState::Literals;
            }
            Token::Match { offset, length } => {
                if state == TokenState::Literals && offset == last_offset {
                    w.write_bit(false);
                    write_interlaced_gamma(&mut w, length as u32, options.backwards, false);
                    state = TokenState::LastOffset;
                } else {
                    w.write_bit(true);
                    write_interlaced_gamma(&mut w, msb_of(offset), options.backwards, invert);
                    let rel = (offset - 1) % 128;
                    let lsb = if options.backwards {
                        (rel << 1) as u8
                    } else {
                        ((127 - rel) << 1) as u8
                    };
                    w.write_byte(lsb);
                    let backpatch_index = w.next_index() - 1;
                    write_length_backtracked(&mut w, backpatch_index, (length - 1) as u32, options.backwards);
                    last_offset = offset;
                    state = TokenState::NewOffset;
                }
                pos += length;
            }
            Token::Literal => unreachable!("ZX0's DP only ever emits LiteralRun tokens"),
        }
    }
    w.write_bit(true);
    write_interlaced_gamma(&mut w, EOF_MSB, options.backwards, invert);

    Ok(w.into_bytes())
}

/// Decompresses a ZX0 stream.
pub fn decompress(input: &[u8], options: &Options) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let invert = !options.classic;
    let mut r = BitReader::new(input);
    let mut out = Vec::new();
    let mut last_offset = INITIAL_OFFSET;
    // Matches `compress`'s bootstrap: the first token is always a literal run.
    let mut state = TokenState::NewOffset;

    loop {
        if r.read_bit()? {
            let msb = read_interlaced_gamma(&mut r, options.backwards, invert)?;
            if msb == EOF_MSB {
                break;
            }
            let lsb = r.read_byte()?;
            let rel = (lsb as usize) >> 1;
            let offset = if options.backwards {
                (msb as usize - 1) * 128 + rel + 1
            } else {
                (msb as usize - 1) * 128 + (127 - rel) + 1
            };
            let first_tag = lsb & 1 != 0;
            let length = read_length_backtracked(&mut r, first_tag, options.backwards)? as usize + 1;
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
            last_offset = offset;
            state = TokenState::NewOffset;
        } else {
            match state {
                TokenState::Literals => {
                    let length = read_interlaced_gamma(&mut r, options.backwards, false)? as usize;
                    if last_offset > out.len() {
                        return Err(CodecError::InvalidBackReference {
                            offset: last_offset,
                            length,
                            cursor: out.len(),
                        });
                    }
                    for _ in 0..length {
                        let b = out[out.len() - last_offset];
                        out.push(b);
                    }
                    state = TokenState::LastOffset;
                }
                TokenState::LastOffset | TokenState::NewOffset => {
                    let length = read_interlaced_gamma(&mut r, options.backwards, false)? as usize;
                    for _ in 0..length {
                        out.push(r.read_byte()?);
                    }
                    state = TokenState::Literals;
                }
            }
        }
    }

    if options.backwards {
        out.reverse();
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
        let mut state = 0x2545F4914F6CDD1Du64 ^ 0x5A;
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
    fn classic_mode_round_trips() {
        let data = b"the quick brown fox the quick brown fox".to_vec();
        round_trip(&data, &Options { classic: true, ..Options::default() });
    }

    #[test]
    fn backwards_mode_round_trips() {
        let data = b"the quick brown fox the quick brown fox".to_vec();
        round_trip(&data, &Options { backwards: true, ..Options::default() });
    }

    #[test]
    fn quick_mode_round_trips() {
        let mut data = vec![0xAAu8; 6];
        data.extend(std::iter::repeat(0xBBu8).take(1500));
        data.extend_from_slice(&[0xAA; 6]);
        round_trip(&data, &Options { quick: true, ..Options::default() });
    }

    #[test]
    fn skip_option_round_trips() {
        let mut data = vec![1u8, 2, 3, 4, 5];
        data.extend(std::iter::repeat(9u8).take(50));
        round_trip(&data, &Options { skip: 3, ..Options::default() });
    }

    #[test]
    fn repeated_offset_reuses_last_offset() {
        // Three separated copies of the same 4-byte motif at the same relative offset: the
        // second and third should be cheap last-offset reuses, not full new-offset encodings.
        let motif = [1u8, 2, 3, 4];
        let mut data = Vec::new();
        for _ in 0..3 {
            data.extend_from_slice(&motif);
            data.extend(std::iter::repeat(0u8).take(4));
        }
        round_trip(&data, &Options::default());
    }
}
