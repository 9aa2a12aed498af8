pub mod assets;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod gallery;
pub mod modal;
pub mod placeholder;
pub mod queue;
pub mod scan;
pub mod surface;
pub mod processing {
    pub mod draw;
    pub mod fit;
    pub mod fonts;
}
pub mod tasks {
    pub mod loader;
    pub mod tiles;
}
