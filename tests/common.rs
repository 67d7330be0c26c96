#![allow(dead_code)]

use image::{Rgb, RgbImage};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Smooth gradient; compresses well at any quality.
pub fn write_gradient_image(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    img.save(path).unwrap();
}

/// Deterministic pseudo-random noise; compresses badly.
pub fn write_noise_image(path: &Path, width: u32, height: u32, seed: u32) {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    let img = RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xFF) as u8
        };
        Rgb([next(), next(), next()])
    });
    img.save(path).unwrap();
}

pub fn write_corrupt_file(path: &Path) {
    File::create(path)
        .unwrap()
        .write_all(b"this is not really an image")
        .unwrap();
}

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}

pub fn create_input_directory(temp_dir: &Path) -> PathBuf {
    let input_dir = temp_dir.join("input");
    std::fs::create_dir(&input_dir).unwrap();
    input_dir
}
