use crate::error::BackgroundError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, RgbaImage};
use std::fs;
use std::path::Path;

/// A chat background image, kept as a `data:` URL so it fits in one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Background {
    data_url: String,
}

impl Background {
    pub fn from_data_url(data_url: impl Into<String>) -> Result<Self, BackgroundError> {
        let data_url = data_url.into();
        split_data_url(&data_url)?;
        Ok(Self { data_url })
    }

    pub fn from_file(path: &Path) -> Result<Self, BackgroundError> {
        let bytes = fs::read(path).map_err(|source| BackgroundError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BackgroundError> {
        let format = image::guess_format(bytes).map_err(|_| BackgroundError::UnknownFormat)?;
        let mime = mime_for(format).ok_or(BackgroundError::UnknownFormat)?;
        Ok(Self {
            data_url: format!("data:{mime};base64,{}", STANDARD.encode(bytes)),
        })
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn decode(&self) -> Result<RgbaImage, BackgroundError> {
        let (_, payload) = split_data_url(&self.data_url)?;
        let bytes = STANDARD.decode(payload)?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }
}

fn mime_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        _ => None,
    }
}

fn split_data_url(data_url: &str) -> Result<(&str, &str), BackgroundError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or(BackgroundError::MalformedDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(BackgroundError::MalformedDataUrl)?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(BackgroundError::MalformedDataUrl)?;
    if !mime.starts_with("image/") {
        return Err(BackgroundError::MalformedDataUrl);
    }
    Ok((mime, payload))
}

#[cfg(test)]
mod tests {
    use super::Background;
    use crate::error::BackgroundError;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn tiny_png() -> Vec<u8> {
        let image = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, ImageFormat::Png)
            .expect("png should encode");
        bytes.into_inner()
    }

    #[test]
    fn file_becomes_png_data_url_and_decodes() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("bg.png");
        std::fs::write(&path, tiny_png()).expect("fixture should write");

        let background = Background::from_file(&path).expect("png should load");
        assert!(background.data_url().starts_with("data:image/png;base64,"));

        let decoded = background.decode().expect("data url should decode");
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn non_image_bytes_are_rejected() {
        let error = Background::from_bytes(b"definitely not an image")
            .expect_err("text should not be accepted");
        assert!(matches!(error, BackgroundError::UnknownFormat));
    }

    #[test]
    fn malformed_data_urls_are_rejected() {
        for url in ["", "image/png;base64,AAAA", "data:text/plain;base64,AAAA", "data:image/png,AAAA"] {
            assert!(
                Background::from_data_url(url).is_err(),
                "{url:?} should be rejected"
            );
        }
    }

    #[test]
    fn corrupt_payload_fails_to_decode() {
        let background =
            Background::from_data_url("data:image/png;base64,!!!!").expect("shape is valid");
        assert!(matches!(background.decode(), Err(BackgroundError::Base64(_))));
    }
}
