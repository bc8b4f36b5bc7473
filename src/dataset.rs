//! Dataset discovery and sample decoding.
//!
//! A dataset is a folder with one sub-folder per category, each holding
//! image samples. Nested folders are walked recursively; a file belongs to
//! the category named by its parent folder.

use crate::error::NetworkError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File extensions recognised as samples
pub const FORMATS: [&str; 3] = ["png", "jpeg", "jpg"];

/// Samples of every discovered category, in configured category order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetIndex {
    entries: Vec<(String, Vec<PathBuf>)>,
}

impl DatasetIndex {
    /// Enumerate `root`, keeping only folders named after one of `categories`
    /// and files with a recognised extension.
    pub fn scan(root: &Path, categories: &[String]) -> Result<Self, NetworkError> {
        if !root.is_dir() {
            return Err(NetworkError::FolderNotFound(root.to_path_buf()));
        }

        let mut found: HashMap<String, Vec<PathBuf>> = HashMap::new();
        walk(root, categories, &mut found)?;

        let entries = categories
            .iter()
            .filter_map(|category| {
                found.remove(category).map(|mut samples| {
                    samples.sort();
                    (category.clone(), samples)
                })
            })
            .collect();

        Ok(Self { entries })
    }

    /// Number of discovered categories
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.entries.iter().map(|(c, s)| (c.as_str(), s.as_slice()))
    }

    /// Total number of samples across categories
    pub fn sample_count(&self) -> usize {
        self.entries.iter().map(|(_, s)| s.len()).sum()
    }
}

fn walk(
    dir: &Path,
    categories: &[String],
    found: &mut HashMap<String, Vec<PathBuf>>,
) -> Result<(), NetworkError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let name = file_name(&path);

        if path.is_dir() {
            if categories.iter().any(|c| *c == name) {
                found.entry(name).or_default();
            } else {
                log::warn!(
                    "Folder {} is not among categories: {}",
                    name,
                    categories.join(" ")
                );
            }
            walk(&path, categories, found)?;
            continue;
        }

        let category = path.parent().map(file_name).unwrap_or_default();
        let Some(samples) = found.get_mut(&category) else {
            continue;
        };

        if is_supported(&path) {
            samples.push(path);
        } else {
            log::warn!(
                "Image {} is not in a supported format: {}",
                name,
                FORMATS.join(" ")
            );
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// True if `path` has one of the recognised extensions
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| FORMATS.contains(&e.as_str()))
}

/// Turns a sample identifier into a pixel vector
pub trait SampleDecoder {
    /// Row-major values in `[0, 1]`, or `None` if the sample cannot be decoded
    fn decode(&self, sample: &Path) -> Option<Vec<f64>>;
}

/// Decodes image files to 8-bit grayscale, one value per pixel
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageDecoder;

impl SampleDecoder for ImageDecoder {
    fn decode(&self, sample: &Path) -> Option<Vec<f64>> {
        match image::open(sample) {
            Ok(img) => Some(
                img.to_luma8()
                    .into_raw()
                    .into_iter()
                    .map(|p| p as f64 / 255.0)
                    .collect(),
            ),
            Err(e) => {
                log::debug!("Could not decode {}: {}", sample.display(), e);
                None
            }
        }
    }
}

impl<F> SampleDecoder for F
where
    F: Fn(&Path) -> Option<Vec<f64>>,
{
    fn decode(&self, sample: &Path) -> Option<Vec<f64>> {
        self(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_gray(path: &Path, pixels: &[u8], width: u32) {
        let height = pixels.len() as u32 / width;
        image::GrayImage::from_raw(width, height, pixels.to_vec())
            .unwrap()
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_scan_filters_categories_and_formats() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for folder in ["dog", "cat", "bird"] {
            std::fs::create_dir(root.join(folder)).unwrap();
        }
        write_gray(&root.join("cat/b.png"), &[0, 0, 0, 0], 2);
        write_gray(&root.join("cat/a.png"), &[0, 0, 0, 0], 2);
        write_gray(&root.join("dog/a.png"), &[0, 0, 0, 0], 2);
        write_gray(&root.join("bird/a.png"), &[0, 0, 0, 0], 2);
        std::fs::write(root.join("dog/notes.txt"), "hi").unwrap();
        std::fs::write(root.join("config.json"), "{}").unwrap();

        let categories = vec!["cat".to_string(), "dog".to_string()];
        let index = DatasetIndex::scan(root, &categories).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.categories().collect::<Vec<_>>(), vec!["cat", "dog"]);
        let (_, cats) = index.iter().next().unwrap();
        assert_eq!(cats, &[root.join("cat/a.png"), root.join("cat/b.png")]);
        assert_eq!(index.sample_count(), 3);
    }

    #[test]
    fn test_scan_missing_root() {
        let err = DatasetIndex::scan(Path::new("/definitely/not/here"), &[]).unwrap_err();
        assert!(matches!(err, NetworkError::FolderNotFound(_)));
    }

    #[test]
    fn test_empty_category_folder_counts() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("cat")).unwrap();
        let index = DatasetIndex::scan(dir.path(), &["cat".to_string()]).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.sample_count(), 0);
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported(Path::new("a.png")));
        assert!(is_supported(Path::new("a.JPG")));
        assert!(is_supported(Path::new("a.jpeg")));
        assert!(!is_supported(Path::new("a.bmp")));
        assert!(!is_supported(Path::new("png")));
    }

    #[test]
    fn test_image_decoder() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.png");
        write_gray(&path, &[0, 255, 51, 204], 2);

        let pixels = ImageDecoder.decode(&path).unwrap();
        assert_eq!(pixels, vec![0.0, 1.0, 0.2, 0.8]);

        std::fs::write(dir.path().join("broken.png"), b"not an image").unwrap();
        assert!(ImageDecoder.decode(&dir.path().join("broken.png")).is_none());
    }

    #[test]
    fn test_closure_decoder() {
        let decoder = |_: &Path| Some(vec![0.5; 4]);
        assert_eq!(decoder.decode(Path::new("x.png")), Some(vec![0.5; 4]));
    }
}
