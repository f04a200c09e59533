//! Screenshot payloads and their inline encoding.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use crate::ai::error::SolveError;

/// Screenshot handed to a provider.
#[derive(Debug, Clone)]
pub enum ImagePayload {
    /// Screenshot stored on disk.
    Path(PathBuf),
    /// Screenshot already held in memory.
    Bytes(Vec<u8>),
}

impl ImagePayload {
    /// Loads the screenshot and encodes it for inline transport.
    pub async fn encode(&self) -> Result<EncodedImage, SolveError> {
        let bytes = match self {
            ImagePayload::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|e| SolveError::ImageRead {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?
            }
            ImagePayload::Bytes(bytes) => bytes.clone(),
        };

        if bytes.is_empty() {
            return Err(SolveError::ImageRead {
                path: self.display_path(),
                reason: "image is empty".to_string(),
            });
        }

        let media_type = sniff_media_type(&bytes);
        debug!(
            image_bytes = bytes.len(),
            media_type, "Encoding screenshot for provider request"
        );

        Ok(EncodedImage {
            media_type,
            data: STANDARD.encode(&bytes),
        })
    }

    fn display_path(&self) -> PathBuf {
        match self {
            ImagePayload::Path(path) => path.clone(),
            ImagePayload::Bytes(_) => PathBuf::from("<memory>"),
        }
    }
}

impl From<PathBuf> for ImagePayload {
    fn from(path: PathBuf) -> Self {
        ImagePayload::Path(path)
    }
}

impl From<Vec<u8>> for ImagePayload {
    fn from(bytes: Vec<u8>) -> Self {
        ImagePayload::Bytes(bytes)
    }
}

/// Base64 image with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// MIME type, e.g. `image/png`.
    pub media_type: &'static str,
    /// Standard base64 data without a prefix.
    pub data: String,
}

impl EncodedImage {
    /// Renders the image as a `data:` URL.
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Detects the image format from its leading bytes, defaulting to PNG.
pub(crate) fn sniff_media_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/png",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn sniffs_known_formats() {
        assert_eq!(sniff_media_type(PNG_HEADER), "image/png");
        assert_eq!(sniff_media_type(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_media_type(b"GIF89a"), "image/gif");
        assert_eq!(sniff_media_type(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_media_type(b"???"), "image/png");
    }

    #[tokio::test]
    async fn encodes_bytes() {
        let encoded = ImagePayload::Bytes(PNG_HEADER.to_vec()).encode().await.unwrap();
        assert_eq!(encoded.media_type, "image/png");
        assert_eq!(encoded.data, "iVBORw0KGgo=");
        assert_eq!(encoded.data_url(), "data:image/png;base64,iVBORw0KGgo=");
    }

    #[tokio::test]
    async fn encodes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xDB]).unwrap();

        let encoded = ImagePayload::Path(path).encode().await.unwrap();
        assert_eq!(encoded.media_type, "image/jpeg");
    }

    #[tokio::test]
    async fn missing_file_is_image_read_failure() {
        let err = ImagePayload::Path(PathBuf::from("/no/such/file.png"))
            .encode()
            .await
            .unwrap_err();
        match err {
            SolveError::ImageRead { path, .. } => {
                assert_eq!(path, PathBuf::from("/no/such/file.png"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_buffer_is_image_read_failure() {
        let err = ImagePayload::Bytes(Vec::new()).encode().await.unwrap_err();
        assert!(matches!(err, SolveError::ImageRead { .. }));
    }
}
