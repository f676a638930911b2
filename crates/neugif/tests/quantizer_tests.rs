use neugif::*;
use pretty_assertions::assert_eq;

fn gradient_rgb(width: usize, height: usize) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            rgb.push(((x * 255) / (width - 1)) as u8);
            rgb.push(((y * 255) / (height - 1)) as u8);
            rgb.push((255 - (x + y) * 255 / (width + height - 2)) as u8);
        }
    }
    rgb
}

/// Mean absolute per-channel difference between the frame and its
/// quantized reconstruction.
fn mean_error(rgb: &[u8], quality: u32) -> f64 {
    let nq = NeuQuant::new(rgb, quality).unwrap();
    let total: u64 = rgb
        .chunks_exact(3)
        .map(|px| {
            let c = nq.palette().color(nq.nearest(px[0], px[1], px[2]));
            (0..3).map(|i| px[i].abs_diff(c[i]) as u64).sum::<u64>()
        })
        .sum();
    total as f64 / rgb.len() as f64
}

#[test]
fn test_palette_always_256_entries() {
    for rgb in [vec![0u8, 0, 0], [12u8, 34, 56].repeat(1000), gradient_rgb(40, 40)] {
        let nq = NeuQuant::new(&rgb, 10).unwrap();
        assert_eq!(nq.palette().as_bytes().len(), 768);
        assert_eq!(nq.palette().iter().count(), PALETTE_SIZE);
    }
}

#[test]
fn test_lower_quality_factor_is_not_worse() {
    let rgb = gradient_rgb(128, 128);
    let fine = mean_error(&rgb, 1);
    let coarse = mean_error(&rgb, 30);
    assert!(fine <= coarse, "quality 1 error {fine} > quality 30 error {coarse}");
}

#[test]
fn test_gradient_error_is_small() {
    let rgb = gradient_rgb(128, 128);
    assert!(mean_error(&rgb, 1) < 16.0);
}

#[test]
fn test_independent_instances_agree() {
    let rgb = gradient_rgb(90, 70);
    let a = NeuQuant::new(&rgb, 3).unwrap();
    let _other = NeuQuant::new(&gradient_rgb(20, 20), 3).unwrap();
    let b = NeuQuant::new(&rgb, 3).unwrap();
    assert_eq!(a.palette(), b.palette());
}

#[test]
fn test_few_colors_are_reproduced_exactly() {
    let colors = [[255u8, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]];
    let rgb: Vec<u8> = (0..4096).flat_map(|i| colors[(i / 7) % 4]).collect();
    let nq = NeuQuant::new(&rgb, 1).unwrap();
    for c in colors {
        let found = nq.palette().color(nq.nearest(c[0], c[1], c[2]));
        let err: u32 = (0..3).map(|i| found[i].abs_diff(c[i]) as u32).sum();
        assert!(err <= 6, "{c:?} quantized to {found:?}");
    }
}

#[test]
fn test_lzw_lossless_on_quantized_frame() {
    let rgb = gradient_rgb(100, 60);
    let frame = FramePixels::new(&rgb, PixelLayout::Rgb, 100, 60).unwrap();
    let nq = NeuQuant::new(&frame.to_rgb(), 10).unwrap();
    let indexed = frame.index_with(&nq);

    let blocks = LzwEncoder::new(8).unwrap().encode(indexed.indices()).unwrap();
    let payload = bitwriter::unblock(&blocks).unwrap();
    let decoded = weezl::decode::Decoder::new(weezl::BitOrder::Lsb, 8)
        .decode(&payload)
        .unwrap();
    assert_eq!(decoded, indexed.indices().to_vec());
}
