//! Resolved poster images: the renderable surface and its portable copy.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageError, Rgb, RgbImage, RgbaImage};

/// Aspect ratio (width / height) of every synthesized placeholder.
pub const PLACEHOLDER_ASPECT_RATIO: f32 = 3.0 / 4.0;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceOrigin {
    /// Decoded from the poster's thumbnail asset.
    Asset,
    /// Generated because the asset could not be resolved.
    Placeholder,
}

/// A renderable poster image plus its aspect ratio. Immutable once built and
/// shared by every tile that asked for the same filename.
#[derive(Clone)]
pub struct Surface {
    image: Arc<RgbaImage>,
    aspect_ratio: f32,
    origin: SurfaceOrigin,
}

impl Surface {
    /// Assets report their pixel aspect ratio; placeholders always report 3:4.
    pub fn from_image(image: RgbaImage, origin: SurfaceOrigin) -> Self {
        let aspect_ratio = match origin {
            SurfaceOrigin::Asset => {
                let (w, h) = image.dimensions();
                w.max(1) as f32 / h.max(1) as f32
            }
            SurfaceOrigin::Placeholder => PLACEHOLDER_ASPECT_RATIO,
        };
        Self {
            image: Arc::new(image),
            aspect_ratio,
            origin,
        }
    }

    pub fn from_asset(image: RgbaImage) -> Self {
        Self::from_image(image, SurfaceOrigin::Asset)
    }

    pub fn placeholder(image: RgbaImage) -> Self {
        Self::from_image(image, SurfaceOrigin::Placeholder)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn origin(&self) -> SurfaceOrigin {
        self.origin
    }

    pub fn is_placeholder(&self) -> bool {
        self.origin == SurfaceOrigin::Placeholder
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        f.debug_struct("Surface")
            .field("width", &width)
            .field("height", &height)
            .field("aspect_ratio", &self.aspect_ratio)
            .field("origin", &self.origin)
            .finish()
    }
}

/// JPEG data URL of a resolved surface, kept for the modal's last-resort path.
#[derive(Clone, PartialEq, Eq)]
pub struct PortableImage(Arc<str>);

impl PortableImage {
    pub fn encode(image: &RgbaImage, quality: u8) -> Result<Self, ImageError> {
        // JPEG has no alpha channel.
        let rgb = RgbImage::from_fn(image.width(), image.height(), |x, y| {
            let p = image.get_pixel(x, y);
            Rgb([p[0], p[1], p[2]])
        });
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100)).encode_image(&rgb)?;
        let mut url = String::with_capacity(DATA_URL_PREFIX.len() + jpeg.len() * 4 / 3 + 4);
        url.push_str(DATA_URL_PREFIX);
        BASE64.encode_string(&jpeg, &mut url);
        Ok(Self(url.into()))
    }

    pub fn as_data_url(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> Result<RgbaImage> {
        let payload = self
            .0
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or_else(|| anyhow!("portable image is not a JPEG data URL"))?;
        let bytes = BASE64
            .decode(payload)
            .context("portable image payload is not valid base64")?;
        let img = image::load_from_memory(&bytes).context("failed to decode portable image")?;
        Ok(img.to_rgba8())
    }
}

impl fmt::Debug for PortableImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PortableImage")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn asset_aspect_follows_pixels() {
        let surface = Surface::from_asset(RgbaImage::new(800, 400));
        assert!((surface.aspect_ratio() - 2.0).abs() < f32::EPSILON);
        assert!(!surface.is_placeholder());
    }

    #[test]
    fn placeholder_aspect_is_fixed() {
        let surface = Surface::placeholder(RgbaImage::new(360, 480));
        assert_eq!(surface.aspect_ratio(), PLACEHOLDER_ASPECT_RATIO);
        assert_eq!(surface.origin(), SurfaceOrigin::Placeholder);
    }

    #[test]
    fn portable_copy_decodes_to_same_size() {
        let img = RgbaImage::from_pixel(12, 16, Rgba([180, 120, 60, 255]));
        let portable = PortableImage::encode(&img, 90).unwrap();
        assert!(portable.as_data_url().starts_with("data:image/jpeg;base64,"));

        let back = portable.decode().unwrap();
        assert_eq!(back.dimensions(), (12, 16));
        let px = back.get_pixel(6, 8);
        assert!((i32::from(px[0]) - 180).abs() <= 4);
        assert!((i32::from(px[2]) - 60).abs() <= 4);
    }
}
