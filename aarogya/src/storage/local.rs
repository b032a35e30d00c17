use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use super::ImageStore;
use crate::config::StorageConfig;
use crate::error::{AppError, Result};

/// Images on the local filesystem, served back under `public_base_url`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
    public_base_url: String,
}

impl LocalImageStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.image_dir),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        let extension = file_extension(file_name, bytes);
        let name = format!("{}.{extension}", Uuid::new_v4());

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create image directory: {e}")))?;
        tokio::fs::write(self.dir.join(&name), bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write image: {e}")))?;

        tracing::debug!(name = %name, size = bytes.len(), "Image stored");

        Ok(format!("{}/{name}", self.public_base_url))
    }
}

/// Extensions the image directory may be served under. Anything else could
/// make `ServeDir` hand out active content such as HTML or SVG.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff"];

/// Extension of the sniffed image type, otherwise the client's extension
/// when it names an image type, otherwise `bin`.
fn file_extension(file_name: &str, bytes: &[u8]) -> String {
    let sniffed = infer::get(bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.extension().to_ascii_lowercase())
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));

    let declared = || {
        Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
    };

    sniffed
        .or_else(declared)
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    const JPEG_MAGIC: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

    fn png_with_markup() -> Vec<u8> {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.extend_from_slice(b"<html><script>alert(document.cookie)</script></html>");
        bytes
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("Scan.JPG", b""), "jpg");
        assert_eq!(file_extension("report.pdf.jpg", b""), "jpg");
        assert_eq!(file_extension("../../etc/passwd", &PNG_MAGIC), "png");
        assert_eq!(file_extension("x.j/pg", b""), "bin");
        assert_eq!(file_extension("noext", b"plain"), "bin");
    }

    #[test]
    fn test_sniffed_type_beats_declared_extension() {
        assert_eq!(file_extension("scan.png", &JPEG_MAGIC), "jpg");
        assert_eq!(file_extension("evil.html", &png_with_markup()), "png");
    }

    #[test]
    fn test_non_image_extensions_are_never_kept() {
        assert_eq!(file_extension("evil.html", b"<script>alert(1)</script>"), "bin");
        assert_eq!(file_extension("logo.svg", b"<svg onload=alert(1)>"), "bin");
        assert_eq!(file_extension("page.htm", b""), "bin");
    }

    #[tokio::test]
    async fn test_markup_named_upload_is_stored_as_image() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalImageStore::new(&StorageConfig {
            image_dir: temp_dir.path().display().to_string(),
            public_base_url: "/api/v1/images".to_string(),
        });

        let url = store.save("evil.html", &png_with_markup()).await.unwrap();

        assert!(url.ends_with(".png"), "{url}");
        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ends_with(".png"));
    }

    #[tokio::test]
    async fn test_save_writes_file_and_returns_url() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalImageStore::new(&StorageConfig {
            image_dir: temp_dir.path().join("images").display().to_string(),
            public_base_url: "http://localhost:8000/api/v1/images/".to_string(),
        });

        let url = store.save("pill.png", &PNG_MAGIC).await.unwrap();

        let name = url
            .strip_prefix("http://localhost:8000/api/v1/images/")
            .unwrap();
        assert!(name.ends_with(".png"));
        assert!(!name.contains('/'));
        let written = std::fs::read(store.dir().join(name)).unwrap();
        assert_eq!(written, PNG_MAGIC);
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalImageStore::new(&StorageConfig {
            image_dir: temp_dir.path().display().to_string(),
            public_base_url: "/images".to_string(),
        });

        let a = store.save("same.jpg", b"a").await.unwrap();
        let b = store.save("same.jpg", b"b").await.unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("/images/"));
    }
}
