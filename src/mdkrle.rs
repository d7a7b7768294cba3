//! MDK-RLE: byte-oriented run/raw packet RLE with an end marker.
//!
//! Control byte `C`:
//! - `0x00..=0x7F`: RAW packet, `length = C + 1` payload bytes follow verbatim.
//! - `0x80..=0xFE`: RLE packet, `length = (C & 0x7F) + 1`, followed by the single repeated byte.
//! - `0xFF`: end of data.

use crate::error::{CodecError, Result};

/// MDK-RLE has no tunable options; kept for uniformity with the other codec modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options;

/// RLE packets run at most 127 bytes (`(C & 0x7F) + 1` with `C <= 0xFE`).
const MAX_RLE_LEN: usize = 127;
/// RAW packets run at most 128 bytes (`C + 1` with `C <= 0x7F`).
const MAX_RAW_LEN: usize = 128;
/// A run of 3 or more identical bytes is worth encoding as RLE (2 bytes) over RAW (1 + n bytes).
const MIN_RUN_LEN: usize = 3;

/// This codec does not bound its input itself (see `spec.md` §6).
pub const MAX_INPUT: usize = usize::MAX;

/// Compresses `input` into the MDK-RLE format.
pub fn compress(input: &[u8], _options: &Options) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut raw_buf: Vec<u8> = Vec::new();

    let flush_raw = |raw_buf: &mut Vec<u8>, out: &mut Vec<u8>| {
        for chunk in raw_buf.chunks(MAX_RAW_LEN) {
            out.push((chunk.len() - 1) as u8);
            out.extend_from_slice(chunk);
        }
        raw_buf.clear();
    };

    let mut i = 0;
    while i < input.len() {
        let byte = input[i];
        let mut run_len = 1;
        while i + run_len < input.len() && input[i + run_len] == byte {
            run_len += 1;
        }

        if run_len >= MIN_RUN_LEN {
            flush_raw(&mut raw_buf, &mut out);
            let mut remaining = run_len;
            while remaining > 0 {
                let take = remaining.min(MAX_RLE_LEN);
                out.push(0x80 | (take - 1) as u8);
                out.push(byte);
                remaining -= take;
            }
            i += run_len;
        } else {
            raw_buf.extend(std::iter::repeat(byte).take(run_len));
            i += run_len;
        }
    }
    flush_raw(&mut raw_buf, &mut out);
    out.push(0xFF);
    Ok(out)
}

/// Decompresses an MDK-RLE stream.
pub fn decompress(input: &[u8], _options: &Options) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut pos = 0;
    loop {
        let control = *input.get(pos).ok_or(CodecError::TruncatedStream)?;
        pos += 1;
        match control {
            0xFF => break,
            0x00..=0x7F => {
                let len = control as usize + 1;
                let end = pos + len;
                let bytes = input.get(pos..end).ok_or(CodecError::TruncatedStream)?;
                out.extend_from_slice(bytes);
                pos = end;
            }
            0x80..=0xFE => {
                let len = (control & 0x7F) as usize + 1;
                let value = *input.get(pos).ok_or(CodecError::TruncatedStream)?;
                pos += 1;
                out.extend(std::iter::repeat(value).take(len));
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
        let decompressed = decompress(&compressed, &Options).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn empty_input_is_single_eof_byte() {
        let compressed = compress(&[], &Options).unwrap();
        assert_eq!(compressed, vec![0xFF]);
        assert_eq!(decompress(&compressed, &Options).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn single_byte() {
        let compressed = compress(&[0x41], &Options).unwrap();
        assert_eq!(compressed, vec![0x00, 0x41, 0xFF]);
        round_trip(&[0x41]);
    }

    #[test]
    fn constant_run_of_300() {
        let data = vec![0x55u8; 300];
        let compressed = compress(&data, &Options).unwrap();
        // 127 + 127 + 46, three RLE packets of 2 bytes each, plus EOF.
        assert_eq!(compressed.len(), 2 + 2 + 2 + 1);
        round_trip(&data);
    }

    #[test]
    fn short_runs_stay_raw() {
        let data = b"aabbccdd".to_vec();
        round_trip(&data);
        let compressed = compress(&data, &Options).unwrap();
        // No run reaches MIN_RUN_LEN, so the whole thing is one RAW packet.
        assert_eq!(compressed[0], (data.len() - 1) as u8);
    }

    #[test]
    fn mixed_raw_and_rle() {
        let mut data = b"xy".to_vec();
        data.extend(std::iter::repeat(b'z').take(10));
        data.extend(b"qr");
        round_trip(&data);
    }

    #[test]
    fn truncated_raw_packet_errors() {
        let compressed = vec![0x02, b'a', b'b']; // claims 3 bytes, only 2 present
        assert_eq!(
            decompress(&compressed, &Options).unwrap_err(),
            CodecError::TruncatedStream
        );
    }

    #[test]
    fn truncated_rle_packet_errors() {
        let compressed = vec![0x80]; // RLE packet missing the repeated byte
        assert_eq!(
            decompress(&compressed, &Options).unwrap_err(),
            CodecError::TruncatedStream
        );
    }

    #[test]
    fn random_4kib_round_trips() {
        let mut state = 0x2545F4914F6CDD1Du64;
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
}
