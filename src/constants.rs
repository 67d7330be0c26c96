pub const DEFAULT_MAX_WIDTH: u32 = 1300;
pub const DEFAULT_MAX_SIZE_KB: u64 = 300;
pub const BYTES_PER_KB: u64 = 1024;

pub const INITIAL_QUALITY: u8 = 90;
pub const FALLBACK_QUALITY: u8 = 80;
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

/// Smallest quality drop applied per oversized attempt.
pub const MIN_QUALITY_STEP: u64 = 2;
/// Each quality step unit is this fraction of the byte budget (5%), as a divisor.
pub const STEP_BUDGET_DIVISOR: u64 = 20;
/// Dimension fallback shrinks both sides to 90%.
pub const FALLBACK_SCALE: f64 = 0.9;
/// Hard ceiling on encode attempts for a single image.
pub const MAX_ENCODE_ATTEMPTS: usize = 250;

pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const LIBDEFLATER_LOW_LEVEL: u8 = 8;
pub const PNG_HIGH_EFFORT_QUALITY: u8 = 70;
pub const OXIPNG_PRESET: u8 = 2;

pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 32_768;

pub const MIN_AVAILABLE_MEMORY_MIB: u64 = 256;

pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
pub const PROGRESS_CHARS: &str = "=>-";

pub const CANCELLED_EXIT_CODE: u8 = 130;
