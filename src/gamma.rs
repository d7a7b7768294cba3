//! Elias-gamma and interlaced Elias-gamma value coders.
//!
//! Standard gamma is used by DAN1, DAN3, ZX7 and BitBuster for match lengths. Interlaced gamma
//! (the ZX0/Pletter variant) is used where the decoder needs to start consuming payload bits
//! before it knows the final magnitude, and supports an `inverted` flag (XORs every payload bit,
//! used on ZX0's new-offset MSB field) and a `backwards` flag (flips the sense of the
//! continuation tag, used when compressing with the input reversed).

use crate::bitio::{BitReader, BitWriter};
use crate::error::{CodecError, Result};

/// Number of bits `write_gamma` would emit for `value` (`value >= 1`).
pub fn gamma_bits(value: u32) -> u32 {
    debug_assert!(value >= 1);
    2 * (31 - value.leading_zeros()) + 1
}

/// Emits the standard Elias-gamma code for `value` (`value >= 1`): `k` zero bits followed by
/// the `k + 1`-bit binary representation of `value`, MSB-first.
pub fn write_gamma(w: &mut BitWriter, value: u32) {
    debug_assert!(value >= 1);
    let k = 31 - value.leading_zeros();
    for _ in 0..k {
        w.write_bit(false);
    }
    for i in (0..=k).rev() {
        w.write_bit((value >> i) & 1 != 0);
    }
}

/// Reads a standard Elias-gamma coded value. Returns `TruncatedStream`-flavoured errors bubble
/// up from the underlying reader; a run of more than 31 zero bits is rejected as an
/// `InvalidHeader` since it cannot correspond to any `u32` magnitude this crate emits.
pub fn read_gamma(r: &mut BitReader) -> Result<u32> {
    let mut k = 0u32;
    while !r.read_bit()? {
        k += 1;
        if k >= 32 {
            return Err(CodecError::InvalidHeader("elias-gamma magnitude overflow"));
        }
    }
    let mut value = 1u32;
    for _ in 0..k {
        value = (value << 1) | r.read_bit()? as u32;
    }
    Ok(value)
}

/// Emits the interlaced Elias-gamma code for `value` (`value >= 1`).
///
/// Each magnitude bit below the implicit leading `1` is preceded by a continuation tag (`0`
/// meaning "one more payload bit follows", unless `backwards` flips the sense), and the code is
/// closed with the opposite tag value. When `inverted` is set, every payload bit is written
/// complemented (used for ZX0's new-offset MSB field).
pub fn write_interlaced_gamma(w: &mut BitWriter, value: u32, backwards: bool, inverted: bool) {
    debug_assert!(value >= 1);
    let continue_tag = backwards;
    let stop_tag = !backwards;

    let mut i = 2u32;
    while i <= value {
        i <<= 1;
    }
    i >>= 1;

    loop {
        i >>= 1;
        if i == 0 {
            break;
        }
        w.write_bit(continue_tag);
        let bit = value & i != 0;
        w.write_bit(if inverted { !bit } else { bit });
    }

    w.write_bit(stop_tag);
}

/// Reads an interlaced Elias-gamma coded value written by [`write_interlaced_gamma`] with the
/// same `backwards`/`inverted` flags.
pub fn read_interlaced_gamma(r: &mut BitReader, backwards: bool, inverted: bool) -> Result<u32> {
    let stop_tag = !backwards;
    let mut value = 1u32;
    loop {
        let tag = r.read_bit()?;
        if tag == stop_tag {
            break;
        }
        let bit = r.read_bit()?;
        let bit = if inverted { !bit } else { bit };
        value = (value << 1) | bit as u32;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip_gamma(values: &[u32]) {
        let mut w = BitWriter::new();
        for &v in values {
            write_gamma(&mut w, v);
        }
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        for &v in values {
            assert_eq!(read_gamma(&mut r).unwrap(), v);
        }
    }

    #[test]
    fn gamma_round_trips() {
        round_trip_gamma(&[1, 2, 3, 4, 7, 8, 255, 256, 1_000_000]);
    }

    #[test]
    fn gamma_bits_counts_the_actual_bits_written() {
        for v in [1u32, 2, 3, 16, 17, 1000] {
            let mut w = BitWriter::new();
            write_gamma(&mut w, v);
            let bits = w.into_bytes().len() as u32 * 8;
            // write_gamma pads to a whole byte; the real bit count never exceeds that.
            assert!(gamma_bits(v) <= bits);
        }
    }

    fn round_trip_interlaced(values: &[u32], backwards: bool, inverted: bool) {
        let mut w = BitWriter::new();
        for &v in values {
            write_interlaced_gamma(&mut w, v, backwards, inverted);
        }
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        for &v in values {
            assert_eq!(read_interlaced_gamma(&mut r, backwards, inverted).unwrap(), v);
        }
    }

    #[test]
    fn interlaced_gamma_round_trips_forward() {
        round_trip_interlaced(&[1, 2, 3, 4, 100, 65535], false, false);
    }

    #[test]
    fn interlaced_gamma_round_trips_backwards() {
        round_trip_interlaced(&[1, 2, 3, 4, 100, 65535], true, false);
    }

    #[test]
    fn interlaced_gamma_round_trips_inverted() {
        round_trip_interlaced(&[1, 2, 3, 4, 100, 65535], false, true);
    }

    #[test]
    fn interlaced_gamma_single_bit_for_one() {
        let mut w = BitWriter::new();
        write_interlaced_gamma(&mut w, 1, false, false);
        assert_eq!(w.into_bytes(), vec![0x80]);
    }
}
