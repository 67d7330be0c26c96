use crate::constants::SUPPORTED_IMAGE_EXTENSIONS;
use crate::error::{OptimizeError, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Lists the images directly inside `dir`, sorted and without duplicates.
///
/// Subdirectories are not descended into and hidden entries are skipped.
/// An existing directory without images yields an empty list; a missing
/// path (or one that is not a directory) is an error.
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(OptimizeError::InputDirectoryNotFound(dir.to_path_buf()));
    }

    let mut images = BTreeSet::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        // `is_file` follows symlinks; a dangling link is simply not a file.
        if path.is_file() && is_image_file(path) {
            images.insert(path.to_path_buf());
        }
    }

    Ok(images.into_iter().collect())
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            SUPPORTED_IMAGE_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

// The walk root sits at depth 0 and is never filtered, so a hidden input
// directory still gets scanned.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn test_is_image_file() {
        for name in ["a.jpg", "a.jpeg", "a.png", "a.bmp", "a.gif"] {
            assert!(is_image_file(Path::new(name)), "{}", name);
        }
        for name in ["a.JPG", "a.Png", "a.GIF", "a.JpEg"] {
            assert!(is_image_file(Path::new(name)), "{}", name);
        }
        for name in ["a.webp", "a.tiff", "a.txt", "jpg", "a.jpg.bak", ""] {
            assert!(!is_image_file(Path::new(name)), "{}", name);
        }
    }

    #[test]
    fn test_discover_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["b.png", "A.JPG", "c.txt", "d.gif", ".hidden.jpg", "e.Bmp"] {
            File::create(temp_dir.path().join(name)).unwrap();
        }

        let found = discover_images(temp_dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["A.JPG", "b.png", "d.gif", "e.Bmp"]);
    }

    #[test]
    fn test_discover_is_not_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        File::create(nested.join("deep.jpg")).unwrap();
        File::create(temp_dir.path().join("top.jpg")).unwrap();
        // A directory with an image-like name is not an image.
        fs::create_dir(temp_dir.path().join("folder.png")).unwrap();

        let found = discover_images(temp_dir.path()).unwrap();
        assert_eq!(found, vec![temp_dir.path().join("top.jpg")]);
    }

    #[test]
    fn test_discover_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        File::create(temp_dir.path().join("notes.txt")).unwrap();

        assert!(discover_images(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_discover_hidden_root_is_scanned() {
        let temp_dir = TempDir::new().unwrap();
        let hidden_root = temp_dir.path().join(".photos");
        fs::create_dir(&hidden_root).unwrap();
        File::create(hidden_root.join("x.jpg")).unwrap();

        assert_eq!(discover_images(&hidden_root).unwrap().len(), 1);
    }

    #[test]
    fn test_discover_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        assert!(matches!(
            discover_images(&missing),
            Err(OptimizeError::InputDirectoryNotFound(p)) if p == missing
        ));
    }

    #[test]
    fn test_discover_rejects_file_path() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("single.jpg");
        File::create(&file).unwrap();

        assert!(matches!(
            discover_images(&file),
            Err(OptimizeError::InputDirectoryNotFound(_))
        ));
    }
}
