use image::DynamicImage;
use img_fit::codec::Codec;
use img_fit::discovery::is_image_file;
use img_fit::processing::OptimizeOptions;
use img_fit::reencode::{
    initial_target, next_quality, quality_step, reencode, Dimensions, Limits, Termination,
};
use img_fit::Result;
use proptest::prelude::*;
use std::cell::RefCell;
use std::path::Path;

/// Codec whose output size is a simple function of pixels and quality.
struct SizeModelCodec {
    qualities: RefCell<Vec<u8>>,
}

impl SizeModelCodec {
    fn new() -> Self {
        Self {
            qualities: RefCell::new(Vec::new()),
        }
    }
}

impl Codec for SizeModelCodec {
    fn resize(&self, _image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        DynamicImage::new_luma8(width, height)
    }

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        self.qualities.borrow_mut().push(quality);
        let pixels = image.width() as usize * image.height() as usize;
        Ok(vec![0u8; 64 + pixels * quality as usize / 30])
    }
}

proptest! {
    #[test]
    fn quality_step_matches_proportional_law(
        max in 1u64..=10_000_000u64,
        over in 1u64..=10_000_000u64,
    ) {
        let current = max + over;
        let step = quality_step(current, max);

        // ceil(over / (max * 0.05)) == ceil(over * 20 / max)
        let exact = (over as u128 * 20).div_ceil(max as u128) as u64;
        prop_assert_eq!(step, exact.max(2));
        prop_assert!(step >= 2);
    }

    #[test]
    fn next_quality_stays_in_range(
        quality in 1u8..=90u8,
        max in 1u64..=1_000_000u64,
        over in 1u64..=1_000_000u64,
    ) {
        let next = next_quality(quality, max + over, max);
        prop_assert!(next >= 1);
        prop_assert!(next < quality || quality == 1);
    }

    #[test]
    fn initial_target_respects_width(
        width in 1u32..=20_000u32,
        height in 1u32..=20_000u32,
        max_width in 1u32..=5_000u32,
    ) {
        match initial_target(Dimensions::new(width, height), max_width) {
            Some(target) => {
                prop_assert!(width > max_width);
                prop_assert_eq!(target.width, max_width);
                prop_assert!(target.height >= 1);
                prop_assert!(target.height <= height);
            }
            None => prop_assert!(width <= max_width),
        }
    }

    #[test]
    fn is_image_file_recognizes_extensions(
        extension in prop::sample::select(&["jpg", "JPEG", "Png", "bmp", "GIF", "webp", "tiff", "txt", "pdf"])
    ) {
        let filename = format!("test.{}", extension);
        let expected = matches!(
            extension.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "bmp" | "gif"
        );
        prop_assert_eq!(is_image_file(Path::new(&filename)), expected);
    }

    #[test]
    fn options_accept_positive_values(
        width in 1u32..=100_000u32,
        size_kb in 1u64..=1_000_000u64,
        threads in prop::option::of(0usize..64),
    ) {
        let options = OptimizeOptions::new(Some(width), Some(size_kb), threads).unwrap();
        prop_assert_eq!(options.limits.max_width, width);
        prop_assert_eq!(options.limits.max_size_bytes, size_kb * 1024);
        prop_assert_eq!(options.threads, threads.filter(|&n| n > 0));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn reencode_invariants_hold(
        width in 1u32..=1_500u32,
        height in 1u32..=1_500u32,
        max_width in 1u32..=1_300u32,
        max_size in 100u64..=400_000u64,
    ) {
        let codec = SizeModelCodec::new();
        let limits = Limits::new(max_width, max_size).unwrap();

        let result = reencode(DynamicImage::new_luma8(width, height), &limits, &codec, |_| {})
            .unwrap();
        let report = &result.report;

        prop_assert!(report.width <= max_width);
        prop_assert_eq!(report.size_bytes, result.bytes.len() as u64);
        match report.termination {
            Termination::WithinBudget => prop_assert!(report.size_bytes <= max_size),
            Termination::Exhausted(_) => prop_assert!(report.size_bytes > max_size),
        }

        let qualities = codec.qualities.borrow();
        prop_assert_eq!(qualities[0], 90);
        prop_assert!(qualities.iter().all(|&q| (2..=90).contains(&q)));
        prop_assert_eq!(qualities.len(), report.iterations);
    }

    #[test]
    fn fitting_images_are_left_alone(
        width in 1u32..=200u32,
        height in 1u32..=200u32,
    ) {
        let codec = SizeModelCodec::new();
        // 200x200 at quality 90 is 64 + 120_000 bytes under this model.
        let limits = Limits::new(200, 200_000).unwrap();

        let result = reencode(DynamicImage::new_luma8(width, height), &limits, &codec, |_| {})
            .unwrap();

        prop_assert!(result.report.resize_events.is_empty());
        prop_assert_eq!(result.report.dimensions(), Dimensions::new(width, height));
        prop_assert_eq!(result.report.quality, 90);
        prop_assert_eq!(result.report.iterations, 1);
    }
}
