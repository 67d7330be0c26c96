use crate::codec::ImageCodec;
use crate::constants::{
    BYTES_PER_KB, DEFAULT_MAX_SIZE_KB, DEFAULT_MAX_WIDTH, MAX_FILE_SIZE, MAX_IMAGE_DIMENSION,
};
use crate::error::{OptimizeError, Result};
use crate::formats::OutputFormat;
use crate::reencode::{reencode, Limits, ReencodeResult, ResizeEvent};
use image::{DynamicImage, GenericImageView, ImageReader};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Run-wide settings, resolved from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeOptions {
    pub limits: Limits,
    /// Worker threads; `None` means one per CPU.
    pub threads: Option<usize>,
}

impl OptimizeOptions {
    pub fn new(
        max_width: Option<u32>,
        max_size_kb: Option<u64>,
        threads: Option<usize>,
    ) -> Result<Self> {
        let max_width = max_width.unwrap_or(DEFAULT_MAX_WIDTH);
        let max_size_kb = max_size_kb.unwrap_or(DEFAULT_MAX_SIZE_KB);
        if max_size_kb == 0 {
            return Err(OptimizeError::InvalidSize(max_size_kb));
        }
        let max_size_bytes = max_size_kb
            .checked_mul(BYTES_PER_KB)
            .ok_or(OptimizeError::InvalidSize(max_size_kb))?;

        Ok(Self {
            limits: Limits::new(max_width, max_size_bytes)?,
            threads: threads.filter(|&n| n > 0),
        })
    }
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            limits: Limits {
                max_width: DEFAULT_MAX_WIDTH,
                max_size_bytes: DEFAULT_MAX_SIZE_KB * BYTES_PER_KB,
            },
            threads: None,
        }
    }
}

/// One source image and where its output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub limits: Limits,
}

impl ImageTask {
    /// Output keeps the source file name, placed flat in `output_dir`.
    pub fn for_source(source: &Path, output_dir: &Path, limits: Limits) -> Result<Self> {
        let file_name = source.file_name().ok_or_else(|| {
            OptimizeError::UnsupportedFormat(format!("invalid file name: {:?}", source))
        })?;
        Ok(Self {
            source: source.to_path_buf(),
            destination: output_dir.join(file_name),
            limits,
        })
    }
}

/// Validates that a file exists at the given path.
///
/// # Example
/// ```
/// use std::path::Path;
/// use img_fit::processing::validate_file_exists;
///
/// let result = validate_file_exists(Path::new("nonexistent.jpg"));
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(OptimizeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file not found: {}", path.display()),
        )));
    }
    Ok(())
}

/// Loads an image file and returns it along with its size on disk.
///
/// Rejects files over [`MAX_FILE_SIZE`] before decoding and images with a
/// side over [`MAX_IMAGE_DIMENSION`] after. The format is sniffed from the
/// content, not the extension.
pub fn load_image(path: &Path) -> Result<(DynamicImage, u64)> {
    validate_file_exists(path)?;

    let file_size = fs::metadata(path)?.len();
    if file_size > MAX_FILE_SIZE {
        return Err(OptimizeError::FileTooLarge(file_size, MAX_FILE_SIZE));
    }

    let img = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(OptimizeError::Decode)?;

    let (width, height) = img.dimensions();
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(OptimizeError::InvalidDimensions(
            width,
            height,
            MAX_IMAGE_DIMENSION,
        ));
    }

    Ok((img, file_size))
}

/// Writes `bytes` to `destination` through a temp file in the same
/// directory, so a failed run never leaves a truncated output behind.
pub fn write_output(destination: &Path, bytes: &[u8]) -> Result<()> {
    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(destination).map_err(|e| OptimizeError::Io(e.error))?;
    Ok(())
}

/// Load -> fit to budget -> write for a single task.
///
/// Returns the source file size alongside the re-encode result.
pub fn process_task<F>(task: &ImageTask, on_resize: F) -> Result<(u64, ReencodeResult)>
where
    F: FnMut(&ResizeEvent),
{
    let format = OutputFormat::from_path(&task.source)?;
    let (img, original_size) = load_image(&task.source)?;

    let codec = ImageCodec::new(format);
    let result = reencode(img, &task.limits, &codec, on_resize)?;

    write_output(&task.destination, &result.bytes)?;
    Ok((original_size, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn test_options_defaults() {
        let options = OptimizeOptions::new(None, None, None).unwrap();
        assert_eq!(options.limits.max_width, 1300);
        assert_eq!(options.limits.max_size_bytes, 300 * 1024);
        assert_eq!(options.threads, None);
        assert_eq!(options, OptimizeOptions::default());
    }

    #[test]
    fn test_options_convert_kilobytes() {
        let options = OptimizeOptions::new(Some(800), Some(50), Some(2)).unwrap();
        assert_eq!(options.limits.max_width, 800);
        assert_eq!(options.limits.max_size_bytes, 51_200);
        assert_eq!(options.threads, Some(2));
    }

    #[test]
    fn test_options_invalid_values() {
        assert!(matches!(
            OptimizeOptions::new(Some(0), None, None),
            Err(OptimizeError::InvalidWidth(0))
        ));
        assert!(matches!(
            OptimizeOptions::new(None, Some(0), None),
            Err(OptimizeError::InvalidSize(0))
        ));
        assert!(matches!(
            OptimizeOptions::new(None, Some(u64::MAX), None),
            Err(OptimizeError::InvalidSize(_))
        ));
        assert_eq!(OptimizeOptions::new(None, None, Some(0)).unwrap().threads, None);
    }

    #[test]
    fn test_task_keeps_file_name() {
        let limits = OptimizeOptions::default().limits;
        let task =
            ImageTask::for_source(Path::new("/in/Photo.JPG"), Path::new("/out"), limits).unwrap();
        assert_eq!(task.destination, PathBuf::from("/out/Photo.JPG"));
        assert_eq!(task.source, PathBuf::from("/in/Photo.JPG"));
    }

    #[test]
    fn test_load_image_not_found() {
        let result = load_image(Path::new("nonexistent.jpg"));
        assert!(matches!(result, Err(OptimizeError::Io(_))));
    }

    #[test]
    fn test_load_image_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.jpg");
        fs::write(&path, b"definitely not a jpeg").unwrap();

        assert!(matches!(
            load_image(&path),
            Err(OptimizeError::Decode(_))
        ));
    }

    #[test]
    fn test_write_output_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.bin");
        fs::write(&path, b"old contents that are longer").unwrap();

        write_output(&path, b"new").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_process_task_writes_fitting_png() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("wide.png");
        let img = RgbImage::from_fn(400, 100, |x, _| Rgb([(x % 256) as u8, 10, 200]));
        img.save(&source).unwrap();

        let out_dir = temp_dir.path().join("out");
        fs::create_dir(&out_dir).unwrap();
        let limits = Limits::new(200, 300 * 1024).unwrap();
        let task = ImageTask::for_source(&source, &out_dir, limits).unwrap();

        let mut events = Vec::new();
        let (original_size, result) = process_task(&task, |e| events.push(*e)).unwrap();

        assert!(original_size > 0);
        assert_eq!(events.len(), 1);
        assert_eq!(result.report.dimensions().width, 200);
        assert_eq!(result.report.height, 50);

        let written = image::open(&task.destination).unwrap();
        assert_eq!(written.dimensions(), (200, 50));
        assert_eq!(
            fs::metadata(&task.destination).unwrap().len(),
            result.report.size_bytes
        );
    }
}
