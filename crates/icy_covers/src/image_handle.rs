use std::{fmt, sync::Arc};

use crate::{CoverError, CoverResult};

/// Decoded image ready to be placed in a cell.
///
/// Pixel data is RGBA8, row major. The handle is replaced wholesale when a cell
/// changes; it is never mutated in place.
///
/// Cloning shares the pixel buffer read-only, which is what grid snapshots rely on.
/// Every handle a source produces has its own buffer, so two cells never hold the same one.
#[derive(Clone)]
pub struct ImageHandle {
    /// Locator the image was resolved from (file path or URL)
    locator: String,
    /// Raw RGBA pixel data (Arc for cheap snapshots)
    data: Arc<Vec<u8>>,
    width: u32,
    height: u32,
}

impl ImageHandle {
    /// Decode PNG/JPEG/etc bytes.
    pub fn decode(locator: impl Into<String>, bytes: &[u8]) -> CoverResult<Self> {
        let locator = locator.into();
        let img = image::load_from_memory(bytes).map_err(|err| CoverError::Decode {
            locator: locator.clone(),
            message: err.to_string(),
        })?;
        Ok(Self::from_rgba(locator, img.to_rgba8()))
    }

    /// Decode on the blocking pool so large covers don't stall the async workers.
    pub async fn decode_async(locator: String, bytes: Vec<u8>) -> CoverResult<Self> {
        let fallback = locator.clone();
        tokio::task::spawn_blocking(move || Self::decode(locator, &bytes))
            .await
            .map_err(|err| CoverError::Decode {
                locator: fallback,
                message: err.to_string(),
            })?
    }

    pub fn from_rgba(locator: impl Into<String>, rgba: image::RgbaImage) -> Self {
        let (width, height) = rgba.dimensions();
        Self {
            locator: locator.into(),
            data: Arc::new(rgba.into_raw()),
            width,
            height,
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Natural width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Natural height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether both handles point at the same pixel buffer
    pub fn shares_pixels(&self, other: &ImageHandle) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn rgba(&self) -> &[u8] {
        &self.data
    }

    /// Copy the pixels back into an `image` buffer.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_raw(self.width, self.height, self.data.to_vec()).unwrap_or_else(|| image::RgbaImage::new(1, 1))
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.locator == other.locator && self.data == other.data
    }
}

impl Eq for ImageHandle {}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("locator", &self.locator)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let handle = ImageHandle::decode("cover.png", &png_bytes(4, 3)).unwrap();
        assert_eq!(handle.width(), 4);
        assert_eq!(handle.height(), 3);
        assert_eq!(handle.rgba().len(), 4 * 3 * 4);
        assert_eq!(handle.locator(), "cover.png");
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = ImageHandle::decode("notes.txt", b"not an image").unwrap_err();
        assert!(matches!(err, CoverError::Decode { ref locator, .. } if locator == "notes.txt"));
    }

    #[test]
    fn test_clone_shares_buffer_decode_does_not() {
        let bytes = png_bytes(2, 2);
        let first = ImageHandle::decode("a.png", &bytes).unwrap();
        let second = ImageHandle::decode("a.png", &bytes).unwrap();
        assert!(first.shares_pixels(&first.clone()));
        assert!(!first.shares_pixels(&second));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_decode_async() {
        let handle = ImageHandle::decode_async("a.png".to_string(), png_bytes(2, 2)).await.unwrap();
        assert_eq!(handle.to_rgba_image().dimensions(), (2, 2));
    }
}
