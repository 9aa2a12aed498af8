//! Session-lifetime caches keyed by poster filename.
//!
//! Entries are written once per filename and never evicted.

use std::collections::HashMap;
use std::sync::Arc;

use crate::surface::{PortableImage, Surface};

#[derive(Debug, Default)]
pub struct SurfaceCache {
    entries: HashMap<String, Arc<Surface>>,
}

impl SurfaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, filename: &str) -> Option<Arc<Surface>> {
        self.entries.get(filename).cloned()
    }

    /// Store `surface` unless the filename already has one; returns the entry
    /// that is cached afterwards.
    pub fn insert(&mut self, filename: &str, surface: Arc<Surface>) -> Arc<Surface> {
        self.entries
            .entry(filename.to_string())
            .or_insert(surface)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// JPEG data URLs of every surface the loader produced.
#[derive(Debug, Default)]
pub struct PortableCache {
    entries: HashMap<String, PortableImage>,
}

impl PortableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, filename: &str) -> Option<PortableImage> {
        self.entries.get(filename).cloned()
    }

    pub fn insert(&mut self, filename: &str, image: PortableImage) {
        self.entries.entry(filename.to_string()).or_insert(image);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn first_surface_wins() {
        let mut cache = SurfaceCache::new();
        let first = Arc::new(Surface::from_asset(RgbaImage::new(2, 3)));
        let second = Arc::new(Surface::from_asset(RgbaImage::new(5, 5)));

        let stored = cache.insert("a.jpg", first.clone());
        assert!(Arc::ptr_eq(&stored, &first));
        let stored = cache.insert("a.jpg", second);
        assert!(Arc::ptr_eq(&stored, &first));
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&cache.get("a.jpg").unwrap(), &first));
        assert!(cache.get("b.jpg").is_none());
    }

    #[test]
    fn portable_entries_are_keyed_by_filename() {
        let mut cache = PortableCache::new();
        assert!(cache.is_empty());
        let img = RgbaImage::new(4, 4);
        cache.insert("a.jpg", PortableImage::encode(&img, 80).unwrap());
        assert!(cache.get("a.jpg").is_some());
        assert!(cache.get("other.jpg").is_none());
    }
}
