use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::LoaderError;
use crate::config::Configuration;
use crate::events::TileReady;
use crate::gallery::layout::TilePlacement;
use crate::surface::Surface;
use crate::tasks::loader::LoaderHandle;

/// Per-tile mesh parameters shared by every mounted consumer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileMesh {
    pub poster_height: f32,
    /// Opacity ramp rate once a texture arrives (1/seconds).
    pub fade_in_speed: f32,
}

impl TileMesh {
    pub fn from_config(cfg: &Configuration) -> Self {
        Self {
            poster_height: cfg.cylinder.poster_height,
            fade_in_speed: cfg.navigation.fade_in_speed,
        }
    }
}

type Reply = Result<Result<Arc<Surface>, LoaderError>, oneshot::error::RecvError>;

/// Mount one consumer per tile. Requests are submitted strictly in
/// placement order; each tile is reported on `to_view` as its surface
/// arrives. Returns the number of tiles delivered.
pub async fn mount(
    placements: Vec<TilePlacement>,
    mesh: TileMesh,
    loader: LoaderHandle,
    to_view: mpsc::Sender<TileReady>,
    cancel: CancellationToken,
) -> Result<usize> {
    let total = placements.len();
    let mut waiting: JoinSet<(TilePlacement, Reply)> = JoinSet::new();

    for placement in placements {
        if cancel.is_cancelled() {
            break;
        }
        let rx = loader
            .enqueue(placement.filename.clone(), placement.poster_index)
            .await?;
        waiting.spawn(async move { (placement, rx.await) });
    }
    debug!(tiles = total, "tile requests submitted");

    let mut delivered = 0usize;
    loop {
        select! {
            _ = cancel.cancelled() => break,
            joined = waiting.join_next() => {
                let Some(joined) = joined else { break };
                let (placement, reply) = joined?;
                match reply {
                    Ok(Ok(surface)) => {
                        let (width, height) = mesh_size(mesh.poster_height, surface.aspect_ratio());
                        let ready = TileReady {
                            id: placement.id,
                            poster_index: placement.poster_index,
                            filename: placement.filename,
                            surface,
                            width,
                            height,
                            arrived: Instant::now(),
                            fade_in_speed: mesh.fade_in_speed,
                        };
                        if to_view.send(ready).await.is_err() {
                            debug!("tile receiver dropped; unmounting");
                            break;
                        }
                        delivered += 1;
                    }
                    Ok(Err(err)) => debug!(tile = %placement.id, "tile load dropped: {err}"),
                    Err(_) => debug!(tile = %placement.id, "loader stopped before replying"),
                }
            }
        }
    }

    info!(delivered, tiles = total, "tiles mounted");
    Ok(delivered)
}

/// Mesh size for a tile: fixed height, width from the surface aspect ratio.
pub fn mesh_size(poster_height: f32, aspect_ratio: f32) -> (f32, f32) {
    (poster_height * aspect_ratio, poster_height)
}

/// Cubic ease-in of a tile's opacity after its texture arrives.
pub fn fade_in_opacity(elapsed_secs: f32, speed: f32) -> f32 {
    let t = (elapsed_secs.max(0.0) * speed).min(1.0);
    t * t * t
}
