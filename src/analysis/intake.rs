use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::AppError;
use crate::gemini::ImagePart;

/// A single uploaded food photo, held in memory for the session's lifetime.
/// Replaced wholesale when the user uploads a new file.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl UploadedImage {
    /// Validates and wraps an upload. The MIME type is resolved from the
    /// filename extension; only the types the file picker offers are
    /// accepted.
    pub fn from_upload(filename: &str, data: Vec<u8>, max_bytes: usize) -> Result<Self, AppError> {
        let ext = filename
            .rsplit('.')
            .next()
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let mime_type = match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            _ => return Err(AppError::UnsupportedImage(ext)),
        };

        if data.len() > max_bytes {
            return Err(AppError::ImageTooLarge {
                size: data.len(),
                limit: max_bytes,
            });
        }

        Ok(Self {
            data,
            mime_type: mime_type.to_string(),
        })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Packages the session's image as the single-element part list the model
/// client expects. Fails with [`AppError::NoUpload`] when no image was ever
/// uploaded; the chat path deliberately passes an empty list instead of
/// calling this when the session has no image.
pub fn image_parts(image: Option<&UploadedImage>) -> Result<Vec<ImagePart>, AppError> {
    match image {
        Some(img) => Ok(vec![ImagePart {
            mime_type: img.mime_type.clone(),
            data: STANDARD.encode(&img.data),
        }]),
        None => Err(AppError::NoUpload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_picker_extensions() {
        let img = UploadedImage::from_upload("dinner.JPG", vec![1, 2, 3], 1024).unwrap();
        assert_eq!(img.mime_type, "image/jpeg");
        let img = UploadedImage::from_upload("salad.png", vec![0xff], 1024).unwrap();
        assert_eq!(img.mime_type, "image/png");
    }

    #[test]
    fn rejects_other_extensions() {
        let err = UploadedImage::from_upload("notes.pdf", vec![1], 1024).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedImage(_)));
    }

    #[test]
    fn rejects_oversized_upload() {
        let err = UploadedImage::from_upload("big.png", vec![0; 2048], 1024).unwrap_err();
        assert!(matches!(err, AppError::ImageTooLarge { size: 2048, .. }));
    }

    #[test]
    fn parts_is_single_element_base64() {
        let img = UploadedImage::from_upload("x.png", vec![1, 2, 3], 1024).unwrap();
        let parts = image_parts(Some(&img)).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].mime_type, "image/png");
        assert_eq!(parts[0].data, STANDARD.encode([1u8, 2, 3]));
    }

    #[test]
    fn no_file_raises_no_upload() {
        assert!(matches!(image_parts(None), Err(AppError::NoUpload)));
    }
}
