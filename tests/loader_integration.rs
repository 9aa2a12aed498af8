use std::fs;
use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use poster_gallery::assets::{AssetDirs, FsAssetResolver};
use poster_gallery::catalog::{Catalog, PosterEntry};
use poster_gallery::config::CylinderSettings;
use poster_gallery::events::TileReady;
use poster_gallery::gallery::CylinderLayout;
use poster_gallery::tasks::{loader, tiles};
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn options() -> loader::LoaderOptions {
    loader::LoaderOptions {
        max_concurrent_loads: 6,
        placeholder_seed: Some(11),
        placeholder_text: false,
        portable_quality: 85,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mixed_catalog_resolves_assets_and_placeholders() {
    let tmp = tempdir().unwrap();
    let thumb = tmp.path().join("thumb");
    let full = tmp.path().join("full");
    fs::create_dir_all(&thumb).unwrap();
    fs::create_dir_all(&full).unwrap();

    // Even posters exist as 200x100 thumbnails, odd ones are missing.
    let entries: Vec<PosterEntry> = (0..10)
        .map(|i| PosterEntry {
            filename: format!("poster-{i}.png"),
            title: format!("Poster {i}"),
            date: "2024".into(),
        })
        .collect();
    for entry in entries.iter().step_by(2) {
        RgbaImage::from_pixel(200, 100, Rgba([10, 20, 30, 255]))
            .save(thumb.join(&entry.filename))
            .unwrap();
    }
    let catalog = Catalog::new(entries).unwrap();

    let resolver = Arc::new(FsAssetResolver::new(AssetDirs::new(&thumb, &full)));
    let cancel = CancellationToken::new();
    let (handle, join) = loader::spawn(resolver, options(), cancel.clone());

    for (index, entry) in catalog.as_slice().iter().enumerate() {
        let surface = handle.request(entry.filename.clone(), index).await.unwrap();
        if index % 2 == 0 {
            assert!(!surface.is_placeholder());
            assert!((surface.aspect_ratio() - 2.0).abs() < f32::EPSILON);
        } else {
            assert!(surface.is_placeholder());
            assert!((surface.aspect_ratio() - 0.75).abs() < f32::EPSILON);
            assert_eq!(surface.dimensions(), (360, 480));
        }
        assert!(handle.portable(entry.filename.clone()).await.unwrap().is_some());
    }

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.resolver_calls, 10);
    assert_eq!(stats.placeholders, 5);
    assert_eq!(stats.cached, 10);

    cancel.cancel();
    join.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mounting_repeated_tiles_resolves_each_poster_once() {
    let tmp = tempdir().unwrap();
    let entries: Vec<PosterEntry> = (0..30)
        .map(|i| PosterEntry {
            filename: format!("missing-{i:02}.jpg"),
            title: format!("Missing {i}"),
            date: String::new(),
        })
        .collect();
    let catalog = Catalog::new(entries).unwrap();

    let settings = CylinderSettings::default();
    let mesh = tiles::TileMesh {
        poster_height: settings.poster_height,
        fade_in_speed: 4.0,
    };
    let layout = CylinderLayout::new(&settings, 12, catalog.len());
    let placements = layout.placements(catalog.as_slice());
    let tile_count = placements.len();
    assert_eq!(tile_count, 3 * 12 * 11);

    let resolver = Arc::new(FsAssetResolver::new(AssetDirs::new(tmp.path(), tmp.path())));
    let cancel = CancellationToken::new();
    let (handle, join) = loader::spawn(resolver, options(), cancel.clone());

    let (tx, mut rx) = mpsc::channel::<TileReady>(tile_count);
    let mounted = tokio::spawn(tiles::mount(
        placements,
        mesh,
        handle.clone(),
        tx,
        cancel.clone(),
    ));

    let mut received = Vec::new();
    while let Some(tile) = tokio::time::timeout(Duration::from_secs(30), rx.recv())
        .await
        .expect("timeout waiting for tiles")
    {
        assert!(tile.surface.is_placeholder());
        assert!((tile.height - settings.poster_height).abs() < f32::EPSILON);
        assert!((tile.width - settings.poster_height * 0.75).abs() < 1e-3);
        assert_eq!(tile.fade_in_speed, 4.0);
        assert_eq!(tile.opacity(tile.arrived), 0.0);
        assert_eq!(tile.opacity(tile.arrived + Duration::from_millis(250)), 1.0);
        received.push(tile);
    }
    assert_eq!(mounted.await.unwrap().unwrap(), tile_count);
    assert_eq!(received.len(), tile_count);

    // Tiles showing the same poster share one surface.
    let first: Vec<_> = received.iter().filter(|t| t.poster_index == 3).collect();
    assert!(first.len() > 1);
    assert!(first.iter().all(|t| Arc::ptr_eq(&t.surface, &first[0].surface)));

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.resolver_calls, 30);
    assert_eq!(stats.placeholders, 30);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.pending, 0);

    cancel.cancel();
    join.await.unwrap().unwrap();
}
