#![no_main]
use libfuzzer_sys::fuzz_target;
use retrocodecs::{Codec, CodecOptions};

fuzz_target!(|data: &[u8]| {
    let options = CodecOptions::default();
    for codec in Codec::ALL {
        let max_input = codec.max_input(&options);
        if data.len() > max_input {
            continue;
        }
        if let Ok(compressed) = codec.compress(data, &options) {
            match codec.decompress(&compressed, &options) {
                Ok(decompressed) => assert_eq!(decompressed, data, "{codec:?} round-trip mismatch"),
                Err(err) => panic!("{codec:?} failed to decompress its own output: {err}"),
            }
        }
    }
});
