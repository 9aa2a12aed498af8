//! Poster gallery runner: resolves every tile texture for the configured
//! catalog and optionally opens one poster in the close-up viewer.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use poster_gallery::assets::FsAssetResolver;
use poster_gallery::catalog::Catalog;
use poster_gallery::config::Configuration;
use poster_gallery::events::TileReady;
use poster_gallery::gallery::CylinderLayout;
use poster_gallery::modal::{self, ModalSource};
use poster_gallery::placeholder;
use poster_gallery::processing::fonts::load_title_font;
use poster_gallery::tasks::{loader, tiles};

/// Viewport assumed when sizing the close-up outside a window.
const REFERENCE_VIEWPORT: (f32, f32) = (1920.0, 1080.0);

#[derive(Debug, Parser)]
#[command(
    name = "poster-gallery",
    version,
    about = "cylindrical poster gallery texture pipeline"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Print tile placements in mount order and exit
    #[arg(long = "layout-dry-run")]
    layout_dry_run: bool,
    /// Open this poster in the close-up viewer after tiles are loaded
    #[arg(long, value_name = "FILENAME")]
    open: Option<String>,
    /// Write the close-up image chosen for --open as PNG
    #[arg(long, value_name = "PATH", requires = "open")]
    export: Option<PathBuf>,
    /// Render the placeholder for this poster index and exit (needs --out)
    #[arg(long, value_name = "INDEX")]
    placeholder: Option<usize>,
    /// Output path for --placeholder
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
    /// Deterministic seed for placeholder grain
    #[arg(long = "placeholder-seed", value_name = "SEED")]
    placeholder_seed: Option<u64>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("warn,poster_gallery={level}"))),
        )
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        layout_dry_run,
        open,
        export,
        placeholder,
        out,
        placeholder_seed,
        verbose,
    } = Args::parse();
    init_tracing(verbose);

    let mut cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    if placeholder_seed.is_some() {
        cfg.loader.placeholder_seed = placeholder_seed;
    }
    tracing::debug!("Loaded configuration from {}:\n{:#?}", config.display(), cfg);

    if let Some(index) = placeholder {
        let out = out.context("--placeholder requires --out")?;
        return render_placeholder(&cfg, index, &out);
    }

    let catalog = Catalog::load(&cfg)?;
    let layout = CylinderLayout::from_config(&cfg, catalog.len());
    let placements = layout.placements(catalog.as_slice());

    if layout_dry_run {
        println!(
            "# layout dry run\n# posters: {}\n# columns: {}\n# rows: {}\n# tiles: {}\n",
            catalog.len(),
            layout.columns(),
            layout.rows(),
            placements.len()
        );
        for (order, p) in placements.iter().enumerate() {
            println!(
                "  {:>5}: {:<10} y={:>9.1} rot={:.4} #{:<3} {}",
                order, p.id, p.position[1], p.rotation, p.poster_index, p.filename
            );
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let dirs = cfg.asset_dirs();
    let resolver = Arc::new(FsAssetResolver::new(dirs.clone()));
    let (handle, loader_task) = loader::spawn(
        resolver,
        loader::LoaderOptions::from(&cfg.loader),
        cancel.child_token(),
    );

    let (tile_tx, tile_rx) = mpsc::channel::<TileReady>(64);
    let mut tasks = JoinSet::new();

    tasks.spawn({
        let handle = handle.clone();
        let cancel = cancel.clone();
        let mesh = tiles::TileMesh::from_config(&cfg);
        async move {
            tiles::mount(placements, mesh, handle, tile_tx, cancel)
                .await
                .context("tile mount failed")
                .map(|_| ())
        }
    });

    tasks.spawn(async move { consume_tiles(tile_rx).await });

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!("task error: {err:?}"),
            Err(err) => tracing::error!("task join error: {err}"),
        }
    }

    match handle.stats().await {
        Ok(stats) => tracing::info!(
            cached = stats.cached,
            portable = stats.portable,
            resolver_calls = stats.resolver_calls,
            placeholders = stats.placeholders,
            "texture loading finished"
        ),
        Err(err) => tracing::warn!("loader stats unavailable: {err}"),
    }

    if let Some(filename) = open.filter(|_| !cancel.is_cancelled()) {
        open_poster(&cfg, &catalog, &dirs, &handle, &filename, export.as_deref()).await?;
    }

    cancel.cancel();
    loader_task
        .await
        .context("loader task panicked")?
        .context("loader task failed")?;
    Ok(())
}

async fn consume_tiles(mut rx: mpsc::Receiver<TileReady>) -> Result<()> {
    let mut tiles = Vec::new();
    while let Some(tile) = rx.recv().await {
        tracing::debug!(
            tile = %tile.id,
            poster_index = tile.poster_index,
            filename = %tile.filename,
            width = tile.width,
            height = tile.height,
            "tile ready"
        );
        tiles.push(tile);
    }
    let now = Instant::now();
    let shown = tiles.len();
    let placeholders = tiles.iter().filter(|t| t.surface.is_placeholder()).count();
    let fading = tiles.iter().filter(|t| t.opacity(now) < 1.0).count();
    tracing::info!(shown, placeholders, fading, "all tiles received");
    Ok(())
}

async fn open_poster(
    cfg: &Configuration,
    catalog: &Catalog,
    dirs: &poster_gallery::assets::AssetDirs,
    handle: &loader::LoaderHandle,
    filename: &str,
    export: Option<&Path>,
) -> Result<()> {
    let Some(entry) = catalog.position(filename).and_then(|i| catalog.get(i)) else {
        bail!("{filename} is not in the poster catalog");
    };
    let Some(source) = modal::resolve_source(dirs, handle, filename).await else {
        tracing::warn!(%filename, "no image available for the close-up viewer");
        return Ok(());
    };

    let kind = source.kind();
    let image = load_modal_image(source).await?;
    let rect = modal::fit_in_modal(REFERENCE_VIEWPORT, cfg.mobile, &cfg.modal, image.dimensions());
    let (title, date) = modal::caption(entry);
    tracing::info!(
        %filename,
        source = kind,
        width = rect.width,
        height = rect.height,
        x = rect.x,
        y = rect.y,
        "opened {title} ({date})"
    );

    if let Some(path) = export {
        image
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "close-up image exported");
    }
    Ok(())
}

async fn load_modal_image(source: ModalSource) -> Result<image::RgbaImage> {
    tokio::task::spawn_blocking(move || source.load_image())
        .await
        .context("modal decode task panicked")?
}

fn render_placeholder(cfg: &Configuration, index: usize, out: &Path) -> Result<()> {
    let mut rng = match cfg.loader.placeholder_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let font = if cfg.loader.placeholder_text {
        load_title_font()
            .map_err(|err| tracing::warn!("rendering without titles: {err:#}"))
            .ok()
    } else {
        None
    };
    let img = placeholder::synthesize(index, &mut rng, font.as_ref());
    img.save(out)
        .with_context(|| format!("failed to write {}", out.display()))?;
    tracing::info!(index, path = %out.display(), "placeholder written");
    Ok(())
}
