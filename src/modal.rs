//! Close-up viewer: picks the best available image for one poster and sizes
//! it for the viewport.

use std::path::PathBuf;

use anyhow::{Context, Result};
use image::RgbaImage;
use tracing::debug;

use crate::assets::{AssetDirs, decode_rgba8_apply_exif, probe_decodes};
use crate::catalog::PosterEntry;
use crate::config::ModalSettings;
use crate::processing::fit::{center_offset, contain_size};
use crate::surface::PortableImage;
use crate::tasks::loader::LoaderHandle;

/// Where the close-up image comes from, in priority order.
#[derive(Debug, Clone)]
pub enum ModalSource {
    Full(PathBuf),
    Thumbnail(PathBuf),
    /// Copy kept by the loader when the tile texture was resolved.
    Portable(PortableImage),
}

impl ModalSource {
    pub fn kind(&self) -> &'static str {
        match self {
            ModalSource::Full(_) => "full",
            ModalSource::Thumbnail(_) => "thumbnail",
            ModalSource::Portable(_) => "portable",
        }
    }

    /// Decode the chosen source. Blocking.
    pub fn load_image(&self) -> Result<RgbaImage> {
        match self {
            ModalSource::Full(path) | ModalSource::Thumbnail(path) => decode_rgba8_apply_exif(path)
                .with_context(|| format!("failed to decode {}", path.display())),
            ModalSource::Portable(copy) => copy.decode(),
        }
    }
}

/// Probe full-size, then thumbnail, then the loader's portable copy.
/// `None` means nothing is displayable yet.
pub async fn resolve_source(
    dirs: &AssetDirs,
    loader: &LoaderHandle,
    filename: &str,
) -> Option<ModalSource> {
    let full = dirs.full_path(filename);
    if probe(full.clone()).await {
        return Some(ModalSource::Full(full));
    }
    let thumb = dirs.thumb_path(filename);
    if probe(thumb.clone()).await {
        return Some(ModalSource::Thumbnail(thumb));
    }
    match loader.portable(filename).await {
        Ok(Some(copy)) => Some(ModalSource::Portable(copy)),
        Ok(None) => {
            debug!(%filename, "no modal image available");
            None
        }
        Err(err) => {
            debug!(%filename, "portable lookup failed: {err}");
            None
        }
    }
}

async fn probe(path: PathBuf) -> bool {
    tokio::task::spawn_blocking(move || probe_decodes(&path))
        .await
        .unwrap_or(false)
}

/// Box the close-up may occupy, in viewport pixels.
pub fn modal_box(viewport: (f32, f32), mobile: bool, settings: &ModalSettings) -> (f32, f32) {
    let (vw, vh) = viewport;
    if mobile {
        (vw * settings.mobile_max_width, vh * settings.mobile_height)
    } else {
        (vw * settings.max_width, vh * settings.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModalRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Contain-fit `image_size` into the modal box, centred in the viewport.
pub fn fit_in_modal(
    viewport: (f32, f32),
    mobile: bool,
    settings: &ModalSettings,
    image_size: (u32, u32),
) -> ModalRect {
    let (box_w, box_h) = modal_box(viewport, mobile, settings);
    let (width, height) = contain_size(box_w, box_h, image_size.0 as f32, image_size.1 as f32);
    let (x, y) = center_offset(width, height, viewport.0, viewport.1);
    ModalRect {
        x,
        y,
        width,
        height,
    }
}

/// Caption lines shown under the close-up: lowercase title, then date.
pub fn caption(entry: &PosterEntry) -> (String, &str) {
    (entry.title.to_lowercase(), entry.date.as_str())
}
