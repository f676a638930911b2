#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use neugif::GifEncoder;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    width: u8,
    height: u8,
    quality: u8,
    repeat: i8,
    disposal: u8,
    transparent: Option<[u8; 3]>,
    frames: Vec<Vec<u8>>,
}

fuzz_target!(|input: FuzzInput| {
    let mut encoder = GifEncoder::new();

    // Setters may reject values; the encoder should never panic either way
    let _ = encoder.configure(input.width as u32, input.height as u32);
    let _ = encoder.set_quality(input.quality as u32);
    let _ = encoder.set_repeat(input.repeat as i32);
    let _ = encoder.set_disposal_method(input.disposal);
    if let Some(rgb) = input.transparent {
        let _ = encoder.set_transparent_color(rgb);
    }

    encoder.start();
    let mut written = 0;
    for frame in input.frames.iter().take(4) {
        if encoder.add_frame(frame).is_ok() {
            written += 1;
        }
    }
    encoder.finish();

    assert_eq!(encoder.frame_count(), written);
    assert!(encoder.bytes().starts_with(b"GIF89a"));
    assert_eq!(encoder.bytes().last(), Some(&0x3B));
});
