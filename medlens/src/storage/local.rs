use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use tracing::{debug, warn};

use crate::config::StorageConfig;
use crate::error::{MedlensError, Result};

/// Filesystem object store. Files land under `{root}/{folder}` and are
/// served by the router at `/uploads`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    folder: String,
    public_base_url: String,
    max_dimension: u32,
    quality: u8,
}

impl LocalStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.local_dir),
            folder: config.folder.trim_matches('/').to_string(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            max_dimension: config.max_dimension,
            quality: config.quality.clamp(1, 100),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resize to fit `max_dimension`, re-encode as JPEG, write to disk and
    /// return the public URL.
    ///
    /// Bytes that do not decode as an image are stored unchanged under the
    /// caller's extension.
    pub async fn upload(&self, bytes: &[u8], filename: Option<&str>) -> Result<String> {
        let owned = bytes.to_vec();
        let max_dimension = self.max_dimension;
        let quality = self.quality;

        let encoded = tokio::task::spawn_blocking(move || {
            reencode_jpeg(&owned, max_dimension, quality)
        })
        .await
        .map_err(|e| MedlensError::Internal(format!("Image encoding task panicked: {e}")))?;

        let (data, extension) = match encoded {
            Ok(jpeg) => (jpeg, "jpg".to_string()),
            Err(error) => {
                warn!(error = %error, "Stored upload without re-encoding");
                (bytes.to_vec(), raw_extension(filename))
            }
        };

        let key = format!("{}/{}.{extension}", self.folder, nanoid::nanoid!());
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;

        debug!(path = %path.display(), size = data.len(), "Stored upload on local disk");

        Ok(format!("{}/uploads/{key}", self.public_base_url))
    }
}

fn reencode_jpeg(bytes: &[u8], max_dimension: u32, quality: u8) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    let img = resize_to_fit(img, max_dimension);
    let rgb = img.to_rgb8();

    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, quality).encode_image(&rgb)?;
    Ok(output)
}

fn resize_to_fit(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return img;
    }
    // resize() keeps the aspect ratio inside the bounding box.
    img.resize(
        max_dimension,
        max_dimension,
        image::imageops::FilterType::Lanczos3,
    )
}

fn raw_extension(filename: Option<&str>) -> String {
    filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackendKind;
    use image::ImageFormat;

    fn store_in(dir: &Path) -> LocalStore {
        LocalStore::new(&StorageConfig {
            backend: StorageBackendKind::Local,
            local_dir: dir.to_string_lossy().into_owned(),
            public_base_url: "http://localhost:8000/".to_string(),
            cloudinary: None,
            folder: "medical_images".to_string(),
            max_dimension: 64,
            quality: 85,
        })
    }

    fn create_test_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut output = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
            .unwrap();
        output
    }

    fn stored_path(dir: &Path, url: &str) -> PathBuf {
        let key = url
            .strip_prefix("http://localhost:8000/uploads/")
            .expect("url should point at /uploads");
        dir.join(key)
    }

    #[tokio::test]
    async fn test_large_image_is_resized_to_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let url = store
            .upload(&create_test_png(200, 100), Some("scan.png"))
            .await
            .unwrap();
        assert!(url.ends_with(".jpg"));

        let saved = std::fs::read(stored_path(dir.path(), &url)).unwrap();
        let img = image::load_from_memory(&saved).unwrap();
        assert_eq!(img.dimensions(), (64, 32));
    }

    #[tokio::test]
    async fn test_small_image_keeps_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let url = store.upload(&create_test_png(20, 10), None).await.unwrap();

        let saved = std::fs::read(stored_path(dir.path(), &url)).unwrap();
        let img = image::load_from_memory(&saved).unwrap();
        assert_eq!(img.dimensions(), (20, 10));
    }

    #[tokio::test]
    async fn test_undecodable_bytes_are_stored_raw() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let url = store
            .upload(b"not really a tiff", Some("report.TIFF"))
            .await
            .unwrap();
        assert!(url.ends_with(".tiff"));

        let saved = std::fs::read(stored_path(dir.path(), &url)).unwrap();
        assert_eq!(saved, b"not really a tiff");
    }

    #[test]
    fn test_raw_extension_fallback() {
        assert_eq!(raw_extension(Some("a.PNG")), "png");
        assert_eq!(raw_extension(Some("noext")), "bin");
        assert_eq!(raw_extension(None), "bin");
    }
}
