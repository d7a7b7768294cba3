//! Property-based coverage of `spec.md` §8's "Universal properties": round trip and the
//! overlap-copy guarantee, across randomized inputs for every codec.

use proptest::prelude::*;
use retrocodecs::{Codec, CodecOptions};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn round_trip_holds_for_every_codec(data in prop::collection::vec(any::<u8>(), 0..2048)) {
        let options = CodecOptions::default();
        for codec in Codec::ALL {
            if data.len() > codec.max_input(&options) {
                continue;
            }
            let compressed = codec.compress(&data, &options).unwrap();
            let restored = codec.decompress(&compressed, &options).unwrap();
            prop_assert_eq!(&restored, &data, "{:?} round-trip mismatch", codec);
        }
    }

    #[test]
    fn overlap_heavy_inputs_round_trip(byte in any::<u8>(), len in 1usize..4096) {
        // A single repeated byte forces every codec's match search into offset < length
        // overlap copies almost immediately.
        let data = vec![byte; len];
        let options = CodecOptions::default();
        for codec in Codec::ALL {
            if data.len() > codec.max_input(&options) {
                continue;
            }
            let compressed = codec.compress(&data, &options).unwrap();
            let restored = codec.decompress(&compressed, &options).unwrap();
            prop_assert_eq!(&restored, &data, "{:?} failed on a repeated-byte overlap run", codec);
        }
    }

    #[test]
    fn short_periodic_patterns_round_trip(
        period in prop::collection::vec(any::<u8>(), 1..8),
        repeats in 1usize..256,
    ) {
        let data: Vec<u8> = period.iter().copied().cycle().take(period.len() * repeats).collect();
        let options = CodecOptions::default();
        for codec in Codec::ALL {
            if data.len() > codec.max_input(&options) {
                continue;
            }
            let compressed = codec.compress(&data, &options).unwrap();
            let restored = codec.decompress(&compressed, &options).unwrap();
            prop_assert_eq!(&restored, &data, "{:?} failed on a periodic pattern", codec);
        }
    }
}
