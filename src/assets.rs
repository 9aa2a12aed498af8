//! Asset Resolver: maps a poster filename onto its files and decodes them.

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::{debug, trace};

use crate::error::ResolveError;

/// The two parallel directories written by the offline asset pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDirs {
    thumb_dir: PathBuf,
    full_dir: PathBuf,
}

impl AssetDirs {
    pub fn new(thumb_dir: impl Into<PathBuf>, full_dir: impl Into<PathBuf>) -> Self {
        Self {
            thumb_dir: thumb_dir.into(),
            full_dir: full_dir.into(),
        }
    }

    /// `{thumbDir}/{filename}`
    pub fn thumb_path(&self, filename: &str) -> PathBuf {
        self.thumb_dir.join(filename)
    }

    /// `{fullDir}/{filename}`
    pub fn full_path(&self, filename: &str) -> PathBuf {
        self.full_dir.join(filename)
    }
}

/// Turns a poster filename into decoded pixels for the tile texture path.
///
/// Implementations are called from the blocking pool, once per admitted
/// request, and must not retry: any error means "asset does not exist" and
/// the loader substitutes a placeholder.
pub trait AssetResolver: Send + Sync + 'static {
    fn resolve(&self, filename: &str) -> Result<RgbaImage, ResolveError>;
}

/// Resolves posters from the thumbnail directory on disk.
#[derive(Debug, Clone)]
pub struct FsAssetResolver {
    dirs: AssetDirs,
}

impl FsAssetResolver {
    pub fn new(dirs: AssetDirs) -> Self {
        Self { dirs }
    }
}

impl AssetResolver for FsAssetResolver {
    fn resolve(&self, filename: &str) -> Result<RgbaImage, ResolveError> {
        let path = self.dirs.thumb_path(filename);
        trace!(path = %path.display(), "resolving thumbnail");
        decode_rgba8_apply_exif(&path).map_err(|err| match err {
            ResolveError::Io(io) if io.kind() == ErrorKind::NotFound => {
                ResolveError::Missing(path.display().to_string())
            }
            ResolveError::Decode { source, .. } => ResolveError::Decode {
                filename: filename.to_string(),
                source,
            },
            other => other,
        })
    }
}

/// `true` when `path` exists and decodes as an image. Used by the modal's
/// full → thumbnail probing, which only needs the success signal.
pub fn probe_decodes(path: &Path) -> bool {
    match image::ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(ResolveError::from)
        .and_then(|r| {
            r.decode().map_err(|source| ResolveError::Decode {
                filename: path.display().to_string(),
                source,
            })
        }) {
        Ok(_) => true,
        Err(err) => {
            debug!(path = %path.display(), "probe failed: {err}");
            false
        }
    }
}

// Decodes an image to RGBA8 and applies EXIF orientation if available.
pub(crate) fn decode_rgba8_apply_exif(path: &Path) -> Result<RgbaImage, ResolveError> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|source| ResolveError::Decode {
            filename: path.display().to_string(),
            source,
        })?;
    let img = img.to_rgba8();

    let orientation = read_orientation(path).unwrap_or(1);
    Ok(apply_orientation(img, orientation))
}

fn apply_orientation(img: RgbaImage, orientation: u16) -> RgbaImage {
    use image::imageops::{flip_horizontal, flip_vertical, rotate90, rotate180, rotate270};
    match orientation {
        2 => flip_horizontal(&img),
        3 => rotate180(&img),
        4 => flip_vertical(&img),
        // transpose
        5 => flip_horizontal(&rotate90(&img)),
        6 => rotate90(&img),
        // transverse
        7 => flip_horizontal(&rotate270(&img)),
        8 => rotate270(&img),
        _ => img,
    }
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = field.value.get_uint(0)? as u16;
    debug!("exif orientation {} for {}", o, path.display());
    Some(o)
}
