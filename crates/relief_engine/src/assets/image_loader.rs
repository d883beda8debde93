//! Image loading utilities for texture data
//!
//! Decodes PNG, JPEG and the other formats of the `image` crate into tightly
//! packed RGBA8 pixels ready for [`GraphicsDevice::create_texture`].
//!
//! [`GraphicsDevice::create_texture`]: crate::render::device::GraphicsDevice::create_texture

use std::path::Path;

use crate::assets::AssetError;
use crate::render::device::TextureDesc;

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load an image from a file path
    ///
    /// Rows are flipped when `flip_vertically` is set so that the first row
    /// in memory is the bottom of the picture, as texture coordinates expect.
    pub fn from_file<P: AsRef<Path>>(path: P, flip_vertically: bool) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();

        log::debug!("Loading image from: {:?}", path_ref);

        let mut img = image::open(path_ref)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image {}: {}", path_ref.display(), e)))?;
        if flip_vertically {
            img = img.flipv();
        }

        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        log::info!("Loaded image {}x{} from {:?}", width, height, path_ref);

        Ok(Self {
            data: rgba_img.into_raw(),
            width,
            height,
        })
    }

    /// Create a solid color image (placeholders and tests)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        let data = color.iter().copied().cycle().take(pixel_count * 4).collect();

        Self { data, width, height }
    }

    /// Description of a mipmapped, linearly filtered texture holding this image
    pub fn texture_desc(&self) -> TextureDesc {
        TextureDesc::sampled(self.width, self.height)
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::{TextureFilter, TextureFormat};

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.width, 4);
        assert_eq!(img.height, 4);
        assert_eq!(img.size_bytes(), 4 * 4 * 4);

        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
        assert_eq!(&img.data[60..64], &[255, 0, 0, 255]);
    }

    #[test]
    fn texture_desc_is_sampled_rgba() {
        let desc = ImageData::solid_color(2, 8, [0, 0, 0, 255]).texture_desc();

        assert_eq!((desc.width, desc.height), (2, 8));
        assert_eq!(desc.format, TextureFormat::Rgba8);
        assert_eq!(desc.filter, TextureFilter::Linear);
        assert!(desc.mipmaps);
    }

    #[test]
    fn missing_file_fails_to_load() {
        let result = ImageData::from_file("does/not/exist.png", true);
        assert!(matches!(result, Err(AssetError::LoadFailed(_))));
    }
}
