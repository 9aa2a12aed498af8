use std::sync::Arc;
use std::time::Instant;

use tokio::sync::oneshot;

use crate::error::LoaderError;
use crate::gallery::layout::TileId;
use crate::surface::{PortableImage, Surface};
use crate::tasks::tiles::fade_in_opacity;

pub type SurfaceReply = oneshot::Sender<Result<Arc<Surface>, LoaderError>>;

/// Messages accepted by the texture loader task.
#[derive(Debug)]
pub enum LoaderCommand {
    Request {
        filename: String,
        poster_index: usize,
        reply: SurfaceReply,
    },
    Portable {
        filename: String,
        reply: oneshot::Sender<Option<PortableImage>>,
    },
    Reset {
        reply: oneshot::Sender<usize>,
    },
    Stats {
        reply: oneshot::Sender<LoaderStats>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    pub in_flight: usize,
    pub pending: usize,
    pub cached: usize,
    pub portable: usize,
    pub resolver_calls: usize,
    pub placeholders: usize,
}

/// A tile's texture arrived; `width`/`height` are world units for the mesh.
#[derive(Debug, Clone)]
pub struct TileReady {
    pub id: TileId,
    pub poster_index: usize,
    pub filename: String,
    pub surface: Arc<Surface>,
    pub width: f32,
    pub height: f32,
    pub arrived: Instant,
    pub fade_in_speed: f32,
}

impl TileReady {
    /// Mesh opacity at `now`, ramping in from the moment the texture arrived.
    pub fn opacity(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.arrived).as_secs_f32();
        fade_in_opacity(elapsed, self.fade_in_speed)
    }
}
