//! Slab fuzz target: feed arbitrary bytes to the slab decoder and the text envelope.
//! Neither may panic; both return Ok or a CodecError.
//! Build with: cargo fuzz run slab_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    if let Ok(slab) = slabcodec::decode_slab(data) {
        // Padding is not kept, so compare values rather than bytes.
        let bytes = slabcodec::encode_slab(&slab).expect("re-encode decoded slab");
        assert_eq!(slabcodec::decode_slab(&bytes).expect("decode re-encoded slab"), slab);
    }
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = slabcodec::parse_slab(text);
        if let Ok(spine) = slabcodec::parse_spine(text) {
            let _ = slabcodec::value_from_spine(&spine);
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run slab_fuzz");
}
