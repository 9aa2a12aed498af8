//! Cylinder gallery geometry and pointer navigation.

pub mod layout;
pub mod navigation;

pub use layout::{CylinderLayout, TileId, TilePlacement};
pub use navigation::{DragNavigation, NavigationFrame};
