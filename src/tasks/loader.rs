//! Texture loader task: owns the bounded load queue and both caches, runs
//! asset resolution on the blocking pool and answers every request with a
//! surface, substituting a placeholder when the asset cannot be resolved.

use std::collections::HashMap;
use std::sync::Arc;

use ab_glyph::FontArc;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, Id, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::assets::AssetResolver;
use crate::cache::PortableCache;
use crate::config::LoaderSettings;
use crate::error::LoaderError;
use crate::events::{LoaderCommand, LoaderStats, SurfaceReply};
use crate::placeholder::{blank, synthesize};
use crate::processing::fonts::load_title_font;
use crate::queue::{Admission, Dropped, LoadQueue, Requested};
use crate::surface::{PortableImage, Surface};

const COMMAND_BUFFER: usize = 256;

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub max_concurrent_loads: usize,
    pub placeholder_seed: Option<u64>,
    pub placeholder_text: bool,
    pub portable_quality: u8,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self::from(&LoaderSettings::default())
    }
}

impl From<&LoaderSettings> for LoaderOptions {
    fn from(settings: &LoaderSettings) -> Self {
        Self {
            max_concurrent_loads: settings.max_concurrent_loads,
            placeholder_seed: settings.placeholder_seed,
            placeholder_text: settings.placeholder_text,
            portable_quality: settings.portable_quality,
        }
    }
}

/// Cheap, cloneable front end to the loader task.
#[derive(Debug, Clone)]
pub struct LoaderHandle {
    tx: mpsc::Sender<LoaderCommand>,
}

impl LoaderHandle {
    /// Resolve `filename` to a surface. Every caller asking for the same
    /// filename gets the same `Arc`.
    pub async fn request(
        &self,
        filename: impl Into<String>,
        poster_index: usize,
    ) -> Result<Arc<Surface>, LoaderError> {
        let rx = self.enqueue(filename, poster_index).await?;
        rx.await.map_err(|_| LoaderError::Closed)?
    }

    /// Submit a request and return the receiver for its reply without
    /// waiting. Requests enter the queue in the order this is awaited.
    pub async fn enqueue(
        &self,
        filename: impl Into<String>,
        poster_index: usize,
    ) -> Result<oneshot::Receiver<Result<Arc<Surface>, LoaderError>>, LoaderError> {
        let (reply, rx) = oneshot::channel();
        self.send(LoaderCommand::Request {
            filename: filename.into(),
            poster_index,
            reply,
        })
        .await?;
        Ok(rx)
    }

    /// Portable copy written when `filename` was resolved, if it has been.
    pub async fn portable(&self, filename: impl Into<String>) -> Result<Option<PortableImage>, LoaderError> {
        let (reply, rx) = oneshot::channel();
        self.send(LoaderCommand::Portable {
            filename: filename.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| LoaderError::Closed)
    }

    /// Clear the pending sequence and the admission count. Returns how many
    /// waiting requests were dropped. Their callers receive a placeholder
    /// that is not cached, so a later request still tries the asset.
    pub async fn reset(&self) -> Result<usize, LoaderError> {
        let (reply, rx) = oneshot::channel();
        self.send(LoaderCommand::Reset { reply }).await?;
        rx.await.map_err(|_| LoaderError::Closed)
    }

    pub async fn stats(&self) -> Result<LoaderStats, LoaderError> {
        let (reply, rx) = oneshot::channel();
        self.send(LoaderCommand::Stats { reply }).await?;
        rx.await.map_err(|_| LoaderError::Closed)
    }

    async fn send(&self, cmd: LoaderCommand) -> Result<(), LoaderError> {
        self.tx.send(cmd).await.map_err(|_| LoaderError::Closed)
    }
}

/// Start the loader task on the current runtime.
pub fn spawn<R: AssetResolver>(
    resolver: Arc<R>,
    options: LoaderOptions,
    cancel: CancellationToken,
) -> (LoaderHandle, JoinHandle<Result<()>>) {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let join = tokio::spawn(run(rx, resolver, options, cancel));
    (LoaderHandle { tx }, join)
}

// Everything a blocking resolution needs, detached from the actor state.
#[derive(Clone)]
struct Job {
    filename: String,
    poster_index: usize,
    grain_seed: u64,
    font: Option<FontArc>,
    quality: u8,
}

struct Resolved {
    filename: String,
    surface: Arc<Surface>,
    portable: Option<PortableImage>,
}

pub async fn run<R: AssetResolver>(
    mut commands: mpsc::Receiver<LoaderCommand>,
    resolver: Arc<R>,
    options: LoaderOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let mut queue: LoadQueue<SurfaceReply> = LoadQueue::new(options.max_concurrent_loads);
    let mut portable = PortableCache::new();
    let mut tasks: JoinSet<Resolved> = JoinSet::new();
    let mut running: HashMap<Id, Admission> = HashMap::new();
    let mut stand_ins: JoinSet<()> = JoinSet::new();
    let mut rng = match options.placeholder_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let font = if options.placeholder_text {
        title_font().await
    } else {
        None
    };
    let mut stats = LoaderStats::default();
    let mut commands_open = true;

    info!(limit = queue.limit(), "texture loader started");

    loop {
        if !commands_open && tasks.is_empty() && stand_ins.is_empty() {
            break;
        }

        select! {
            _ = cancel.cancelled() => break,

            cmd = commands.recv(), if commands_open => match cmd {
                Some(cmd) => {
                    for dropped in handle_command(cmd, &mut queue, &portable, &stats) {
                        let Dropped { filename, poster_index, waiters } = dropped;
                        let admission = Admission { filename, poster_index };
                        let job = job_for(admission, &mut rng, font.clone(), options.portable_quality);
                        spawn_stand_in(&mut stand_ins, job, waiters);
                    }
                }
                None => {
                    debug!("all loader handles dropped");
                    commands_open = false;
                }
            },

            Some(joined) = tasks.join_next_with_id() => match joined {
                Ok((id, resolved)) => {
                    running.remove(&id);
                    if resolved.surface.is_placeholder() {
                        stats.placeholders += 1;
                    }
                    complete(resolved, &mut queue, &mut portable);
                }
                // Resolver panics are absorbed inside the task; only aborts and
                // panics in the fallback itself land here.
                Err(err) => match running.remove(&err.id()) {
                    Some(admission) => {
                        warn!(filename = %admission.filename, "texture load task failed: {err}");
                        stats.placeholders += 1;
                        abandon(admission, &mut queue);
                    }
                    None => warn!("texture load task failed: {err}"),
                },
            },

            Some(joined) = stand_ins.join_next() => {
                if let Err(err) = joined {
                    warn!("placeholder task for a dropped request failed: {err}");
                }
            },
        }

        for admission in queue.admit() {
            stats.resolver_calls += 1;
            trace!(
                filename = %admission.filename,
                poster_index = admission.poster_index,
                in_flight = queue.in_flight(),
                "admitted"
            );
            let job = job_for(admission.clone(), &mut rng, font.clone(), options.portable_quality);
            let task = spawn_resolution(&mut tasks, Arc::clone(&resolver), job);
            running.insert(task.id(), admission);
        }
    }

    tasks.shutdown().await;
    stand_ins.shutdown().await;
    info!(
        cached = queue.cached_len(),
        resolver_calls = stats.resolver_calls,
        placeholders = stats.placeholders,
        "texture loader stopped"
    );
    Ok(())
}

fn handle_command(
    cmd: LoaderCommand,
    queue: &mut LoadQueue<SurfaceReply>,
    portable: &PortableCache,
    stats: &LoaderStats,
) -> Vec<Dropped<SurfaceReply>> {
    match cmd {
        LoaderCommand::Request {
            filename,
            poster_index,
            reply,
        } => match queue.request(&filename, poster_index, reply) {
            Requested::Cached(surface, reply) => {
                let _ = reply.send(Ok(surface));
                Vec::new()
            }
            Requested::Queued => {
                trace!(%filename, poster_index, pending = queue.pending_len(), "queued");
                Vec::new()
            }
            Requested::Attached => {
                trace!(%filename, poster_index, "attached to outstanding load");
                Vec::new()
            }
        },
        LoaderCommand::Portable { filename, reply } => {
            let _ = reply.send(portable.get(&filename));
            Vec::new()
        }
        LoaderCommand::Reset { reply } => {
            let dropped = queue.reset();
            info!(dropped = dropped.len(), cached = queue.cached_len(), "texture queue reset");
            let _ = reply.send(dropped.len());
            dropped
        }
        LoaderCommand::Stats { reply } => {
            let _ = reply.send(LoaderStats {
                in_flight: queue.in_flight(),
                pending: queue.pending_len(),
                cached: queue.cached_len(),
                portable: portable.len(),
                ..*stats
            });
            Vec::new()
        }
    }
}

fn complete(resolved: Resolved, queue: &mut LoadQueue<SurfaceReply>, portable: &mut PortableCache) {
    let Resolved {
        filename,
        surface,
        portable: copy,
    } = resolved;
    if let Some(copy) = copy {
        portable.insert(&filename, copy);
    }
    let (surface, waiters) = queue.complete(&filename, surface);
    debug!(
        %filename,
        recipients = waiters.len(),
        placeholder = surface.is_placeholder(),
        in_flight = queue.in_flight(),
        "texture resolved"
    );
    for waiter in waiters {
        // A dropped receiver means the tile went away; the result stays cached.
        let _ = waiter.send(Ok(Arc::clone(&surface)));
    }
}

// Frees the slot of a resolution that died and answers its waiters with a
// flat stand-in. Nothing is cached, so the filename can be requested again.
fn abandon(admission: Admission, queue: &mut LoadQueue<SurfaceReply>) {
    let waiters = queue.abandon(&admission.filename);
    let surface = Arc::new(Surface::placeholder(blank(admission.poster_index)));
    for waiter in waiters {
        let _ = waiter.send(Ok(Arc::clone(&surface)));
    }
}

fn spawn_stand_in(stand_ins: &mut JoinSet<()>, job: Job, waiters: Vec<SurfaceReply>) {
    stand_ins.spawn(async move {
        let poster_index = job.poster_index;
        let surface = tokio::task::spawn_blocking(move || placeholder_surface(&job))
            .await
            .unwrap_or_else(|_| Surface::placeholder(blank(poster_index)));
        let surface = Arc::new(surface);
        for waiter in waiters {
            let _ = waiter.send(Ok(Arc::clone(&surface)));
        }
    });
}

fn job_for(admission: Admission, rng: &mut StdRng, font: Option<FontArc>, quality: u8) -> Job {
    Job {
        filename: admission.filename,
        poster_index: admission.poster_index,
        grain_seed: rng.random(),
        font,
        quality,
    }
}

fn spawn_resolution<R: AssetResolver>(
    tasks: &mut JoinSet<Resolved>,
    resolver: Arc<R>,
    job: Job,
) -> AbortHandle {
    tasks.spawn(async move {
        let blocking_job = job.clone();
        match tokio::task::spawn_blocking(move || resolve_blocking(resolver.as_ref(), &blocking_job))
            .await
        {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(filename = %job.filename, "resolver task failed: {err}");
                finish(&job, placeholder_surface(&job))
            }
        }
    })
}

fn resolve_blocking<R: AssetResolver + ?Sized>(resolver: &R, job: &Job) -> Resolved {
    let surface = match resolver.resolve(&job.filename) {
        Ok(image) => Surface::from_asset(image),
        Err(err) => {
            debug!(
                filename = %job.filename,
                poster_index = job.poster_index,
                "asset unavailable, using placeholder: {err}"
            );
            placeholder_surface(job)
        }
    };
    finish(job, surface)
}

fn placeholder_surface(job: &Job) -> Surface {
    let mut rng = StdRng::seed_from_u64(job.grain_seed);
    Surface::placeholder(synthesize(job.poster_index, &mut rng, job.font.as_ref()))
}

fn finish(job: &Job, surface: Surface) -> Resolved {
    let portable = match PortableImage::encode(surface.image(), job.quality) {
        Ok(copy) => Some(copy),
        Err(err) => {
            warn!(filename = %job.filename, "failed to encode portable copy: {err}");
            None
        }
    };
    Resolved {
        filename: job.filename.clone(),
        surface: Arc::new(surface),
        portable,
    }
}

async fn title_font() -> Option<FontArc> {
    match tokio::task::spawn_blocking(load_title_font).await {
        Ok(Ok(font)) => Some(font),
        Ok(Err(err)) => {
            warn!("placeholder titles disabled: {err:#}");
            None
        }
        Err(err) => {
            warn!("font lookup task failed: {err}");
            None
        }
    }
}
