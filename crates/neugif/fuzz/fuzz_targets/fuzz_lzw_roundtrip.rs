#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use neugif::{bitwriter::unblock, LzwEncoder};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    min_code_size: u8,
    indices: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let min_code_size = 2 + input.min_code_size % 7;
    let mask = ((1u16 << min_code_size) - 1) as u8;
    let indices: Vec<u8> = input.indices.iter().map(|&i| i & mask).collect();

    let blocks = LzwEncoder::new(min_code_size)
        .and_then(|mut lzw| lzw.encode(&indices))
        .expect("valid code size and indices");

    // Compressed output must decode back to the input exactly
    let payload = unblock(&blocks).expect("well-formed sub-blocks");
    let decoded = weezl::decode::Decoder::new(weezl::BitOrder::Lsb, min_code_size)
        .decode(&payload)
        .expect("valid LZW stream");
    assert_eq!(decoded, indices);
});
