//! 프레임 소스: 업로드 이미지를 디코더 입력으로 변환
//!
//! 카메라 프레임은 [`VideoStream::capture_frame`](tracelink_core::pipeline::VideoStream)에서
//! 직접 오고, 업로드 이미지는 이 모듈이 packed RGB8 [`Frame`]으로 변환합니다.
//! PNG, JPEG 등 `image` crate가 인식하는 형식을 받습니다.

use std::path::Path;

use tracing::debug;

use tracelink_core::types::Frame;

use crate::error::QrScannerError;

/// 업로드된 정지 이미지
pub struct UploadedImage;

impl UploadedImage {
    /// 메모리에 있는 이미지 바이트를 RGB8 프레임으로 디코딩합니다.
    ///
    /// # Errors
    ///
    /// - `max_bytes`를 넘으면 `ImageTooLarge`
    /// - 빈 입력이나 인식할 수 없는 형식이면 `InvalidImage`
    pub fn from_bytes(bytes: &[u8], max_bytes: usize) -> Result<Frame, QrScannerError> {
        if bytes.len() > max_bytes {
            return Err(QrScannerError::ImageTooLarge {
                size: bytes.len(),
                max: max_bytes,
            });
        }
        if bytes.is_empty() {
            return Err(QrScannerError::InvalidImage("empty file".to_owned()));
        }

        let img = image::load_from_memory(bytes)
            .map_err(|e| QrScannerError::InvalidImage(e.to_string()))?;
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(QrScannerError::InvalidImage(
                "image has zero width or height".to_owned(),
            ));
        }

        debug!(width, height, size = bytes.len(), "decoded uploaded image");
        Ok(Frame::rgb(rgb.into_raw(), width, height))
    }

    /// 파일에서 이미지를 읽어 RGB8 프레임으로 디코딩합니다.
    ///
    /// 파일 읽기와 디코딩은 `spawn_blocking`에서 수행합니다.
    pub async fn from_path(
        path: impl AsRef<Path>,
        max_bytes: usize,
    ) -> Result<Frame, QrScannerError> {
        let path = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || read_and_decode(&path, max_bytes))
            .await
            .map_err(|e| QrScannerError::Channel(format!("spawn_blocking failed: {e}")))?
    }
}

/// 파일 크기를 먼저 확인한 뒤 읽고 디코딩합니다 (동기 I/O).
fn read_and_decode(path: &Path, max_bytes: usize) -> Result<Frame, QrScannerError> {
    let io_err = |source| QrScannerError::Io {
        path: path.display().to_string(),
        source,
    };

    let metadata = std::fs::metadata(path).map_err(io_err)?;
    let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
    if size > max_bytes {
        return Err(QrScannerError::ImageTooLarge {
            size,
            max: max_bytes,
        });
    }

    let bytes = std::fs::read(path).map_err(io_err)?;
    UploadedImage::from_bytes(&bytes, max_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn png_decodes_to_rgb_frame() {
        let frame = UploadedImage::from_bytes(&png_bytes(4, 3), 1024 * 1024).unwrap();
        assert_eq!(frame.width, 4);
        assert_eq!(frame.height, 3);
        assert!(frame.is_well_formed());
        // 첫 픽셀은 검정
        assert_eq!(&frame.data[..3], &[0, 0, 0]);
    }

    #[test]
    fn oversized_upload_is_rejected_before_decoding() {
        let bytes = png_bytes(8, 8);
        let err = UploadedImage::from_bytes(&bytes, 10).unwrap_err();
        assert!(matches!(err, QrScannerError::ImageTooLarge { max: 10, .. }));
    }

    #[test]
    fn garbage_bytes_are_invalid_image() {
        let err = UploadedImage::from_bytes(b"definitely not an image", 1024).unwrap_err();
        assert!(matches!(err, QrScannerError::InvalidImage(_)));
    }

    #[test]
    fn empty_upload_is_invalid_image() {
        let err = UploadedImage::from_bytes(&[], 1024).unwrap_err();
        assert!(matches!(err, QrScannerError::InvalidImage(_)));
    }

    #[tokio::test]
    async fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code.png");
        std::fs::write(&path, png_bytes(5, 5)).unwrap();

        let frame = UploadedImage::from_path(&path, 1024 * 1024).await.unwrap();
        assert_eq!((frame.width, frame.height), (5, 5));
    }

    #[tokio::test]
    async fn from_path_missing_file_is_io_error() {
        let err = UploadedImage::from_path("/nonexistent/code.png", 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, QrScannerError::Io { .. }));
    }

    #[tokio::test]
    async fn from_path_checks_size_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, png_bytes(16, 16)).unwrap();

        let err = UploadedImage::from_path(&path, 8).await.unwrap_err();
        assert!(matches!(err, QrScannerError::ImageTooLarge { .. }));
    }
}
