//! Integration tests exercising `spec.md` §8's "Concrete scenarios" across every codec: empty
//! input, a single byte, a 300-byte constant run, a random 4 KiB buffer, and a pathological
//! overlap pattern where `offset < length`.

use retrocodecs::{Codec, CodecOptions};

fn xorshift_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 256) as u8
        })
        .collect()
}

fn assert_round_trips(codec: Codec, options: &CodecOptions, data: &[u8]) {
    let compressed = codec
        .compress(data, options)
        .unwrap_or_else(|err| panic!("{codec:?} failed to compress {} bytes: {err}", data.len()));
    let restored = codec
        .decompress(&compressed, options)
        .unwrap_or_else(|err| panic!("{codec:?} failed to decompress its own output: {err}"));
    assert_eq!(restored, data, "{codec:?} round-trip mismatch");
}

#[test]
fn empty_input() {
    let options = CodecOptions::default();
    for codec in Codec::ALL {
        assert_round_trips(codec, &options, &[]);
    }
}

#[test]
fn single_byte() {
    let options = CodecOptions::default();
    for codec in Codec::ALL {
        assert_round_trips(codec, &options, &[0x42]);
    }
}

#[test]
fn constant_run_of_300() {
    let options = CodecOptions::default();
    let data = vec![0x55u8; 300];
    for codec in Codec::ALL {
        assert_round_trips(codec, &options, &data);
    }
}

#[test]
fn random_4kib() {
    let options = CodecOptions::default();
    let data = xorshift_bytes(0x1234_5678_9ABC_DEF0, 4096);
    for codec in Codec::ALL {
        assert_round_trips(codec, &options, &data);
    }
}

#[test]
fn pathological_overlap() {
    // offset = 1, length = 1023: every byte copies the one before it.
    let options = CodecOptions::default();
    let mut data = vec![0xAAu8];
    data.extend(std::iter::repeat(0xAAu8).take(1022));
    for codec in Codec::ALL {
        assert_round_trips(codec, &options, &data);
    }
}

#[test]
fn cross_codec_conversion() {
    // Decompressing with codec A, then recompressing with codec B, preserves the payload even
    // though the two wire formats share nothing.
    let options = CodecOptions::default();
    let data = xorshift_bytes(0xDEAD_BEEF_CAFE_F00D, 512);

    let via_mdkrle = Codec::MdkRle.compress(&data, &options).unwrap();
    let recovered = Codec::MdkRle.decompress(&via_mdkrle, &options).unwrap();
    let via_zx7 = Codec::Zx7.compress(&recovered, &options).unwrap();
    let final_result = Codec::Zx7.decompress(&via_zx7, &options).unwrap();

    assert_eq!(final_result, data);
}

#[test]
fn size_bound_respected() {
    let mut options = CodecOptions::default();
    options.bitbuster.max_input = 64;
    let data = vec![0u8; 64];
    assert!(Codec::BitBuster.compress(&data, &options).is_ok());

    let oversized = vec![0u8; 65];
    assert!(Codec::BitBuster.compress(&oversized, &options).is_err());
}
