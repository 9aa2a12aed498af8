use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::assets::AssetDirs;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Optional JSON poster list; when absent posters are discovered from the thumbnail directory.
    pub catalog: Option<PathBuf>,
    /// Where thumbnail and full-resolution poster files live.
    pub assets: AssetSettings,
    /// Texture loader tuning.
    pub loader: LoaderSettings,
    /// Cylinder geometry used by the gallery layout.
    pub cylinder: CylinderSettings,
    /// Drag, wheel and edge-drift behaviour.
    pub navigation: NavigationSettings,
    /// Close-up viewer sizing.
    pub modal: ModalSettings,
    /// Use the narrower mobile column count and modal sizing.
    pub mobile: bool,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        self.assets.validate().context("invalid asset configuration")?;
        self.loader.validate().context("invalid loader configuration")?;
        self.cylinder
            .validate()
            .context("invalid cylinder configuration")?;
        self.navigation
            .validate()
            .context("invalid navigation configuration")?;
        self.modal.validate().context("invalid modal configuration")?;
        Ok(self)
    }

    /// Column count for the active form factor.
    pub fn columns(&self) -> usize {
        if self.mobile {
            self.cylinder.columns_mobile
        } else {
            self.cylinder.columns
        }
    }

    pub fn asset_dirs(&self) -> AssetDirs {
        AssetDirs::new(&self.assets.thumb_dir, &self.assets.full_dir)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            catalog: None,
            assets: AssetSettings::default(),
            loader: LoaderSettings::default(),
            cylinder: CylinderSettings::default(),
            navigation: NavigationSettings::default(),
            modal: ModalSettings::default(),
            mobile: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AssetSettings {
    pub thumb_dir: PathBuf,
    pub full_dir: PathBuf,
}

impl AssetSettings {
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.thumb_dir.as_os_str().is_empty(),
            "assets.thumb-dir must not be empty"
        );
        ensure!(
            !self.full_dir.as_os_str().is_empty(),
            "assets.full-dir must not be empty"
        );
        Ok(())
    }
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            thumb_dir: PathBuf::from("public/posters/thumb"),
            full_dir: PathBuf::from("public/posters/full"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LoaderSettings {
    /// Maximum number of poster resolutions running at once.
    pub max_concurrent_loads: usize,
    /// Optional deterministic seed for placeholder grain.
    pub placeholder_seed: Option<u64>,
    /// Render poster titles into placeholders when a system font is available.
    pub placeholder_text: bool,
    /// JPEG quality of the portable copy kept for the modal.
    pub portable_quality: u8,
}

impl LoaderSettings {
    pub const DEFAULT_MAX_CONCURRENT_LOADS: usize = 6;

    const fn default_portable_quality() -> u8 {
        90
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.max_concurrent_loads > 0,
            "loader.max-concurrent-loads must be greater than zero"
        );
        ensure!(
            (1..=100).contains(&self.portable_quality),
            "loader.portable-quality must be within 1..=100"
        );
        Ok(())
    }
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_concurrent_loads: Self::DEFAULT_MAX_CONCURRENT_LOADS,
            placeholder_seed: None,
            placeholder_text: true,
            portable_quality: Self::default_portable_quality(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CylinderSettings {
    pub radius: f32,
    pub columns: usize,
    pub columns_mobile: usize,
    pub poster_width: f32,
    pub poster_height: f32,
    pub gap_y: f32,
    /// How many times the poster rows are stacked vertically for seamless wrap.
    pub tile_repeats: usize,
}

impl CylinderSettings {
    fn validate(&self) -> Result<()> {
        ensure!(self.radius > 0.0, "cylinder.radius must be positive");
        ensure!(
            self.columns > 0 && self.columns_mobile > 0,
            "cylinder.columns and cylinder.columns-mobile must be greater than zero"
        );
        ensure!(
            self.poster_height > 0.0 && self.poster_width > 0.0,
            "cylinder poster dimensions must be positive"
        );
        ensure!(self.gap_y >= 0.0, "cylinder.gap-y must not be negative");
        ensure!(
            self.tile_repeats > 0,
            "cylinder.tile-repeats must be greater than zero"
        );
        Ok(())
    }

    pub fn row_height(&self) -> f32 {
        self.poster_height + self.gap_y
    }
}

impl Default for CylinderSettings {
    fn default() -> Self {
        Self {
            radius: 350.0,
            columns: 12,
            columns_mobile: 8,
            poster_width: 90.0,
            poster_height: 122.0,
            gap_y: 28.0,
            tile_repeats: 11,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct NavigationSettings {
    pub drag_sensitivity_x: f32,
    pub drag_sensitivity_y: f32,
    pub momentum_x: f32,
    pub momentum_y: f32,
    /// Per-frame velocity multiplier applied while not dragging.
    pub damping: f32,
    pub wheel_speed: f32,
    /// Normalized distance from the centre (0..1) beyond which edge drift starts.
    pub edge_zone: f32,
    pub edge_drift_speed: f32,
    /// Pointer travel in pixels that turns a press into a drag instead of a click.
    pub drag_threshold: f32,
    /// Tile fade-in rate once a texture arrives (1/seconds).
    pub fade_in_speed: f32,
}

impl NavigationSettings {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.damping > 0.0 && self.damping <= 1.0,
            "navigation.damping must be within (0, 1]"
        );
        ensure!(
            (0.0..1.0).contains(&self.edge_zone),
            "navigation.edge-zone must be within [0, 1)"
        );
        ensure!(
            self.drag_threshold >= 0.0,
            "navigation.drag-threshold must not be negative"
        );
        ensure!(
            self.fade_in_speed > 0.0,
            "navigation.fade-in-speed must be positive"
        );
        Ok(())
    }
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            drag_sensitivity_x: 0.0012,
            drag_sensitivity_y: 0.15,
            momentum_x: 0.0008,
            momentum_y: 0.12,
            damping: 0.975,
            wheel_speed: 0.004,
            edge_zone: 0.85,
            edge_drift_speed: 0.08,
            drag_threshold: 4.0,
            fade_in_speed: 4.0,
        }
    }
}

/// Fractions of the viewport the close-up poster may occupy.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ModalSettings {
    pub height: f32,
    pub max_width: f32,
    pub mobile_height: f32,
    pub mobile_max_width: f32,
}

impl ModalSettings {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("modal.height", self.height),
            ("modal.max-width", self.max_width),
            ("modal.mobile-height", self.mobile_height),
            ("modal.mobile-max-width", self.mobile_max_width),
        ] {
            ensure!(
                value > 0.0 && value <= 1.0,
                "{name} must be within (0, 1]"
            );
        }
        Ok(())
    }
}

impl Default for ModalSettings {
    fn default() -> Self {
        Self {
            height: 0.72,
            max_width: 0.80,
            mobile_height: 0.85,
            mobile_max_width: 0.95,
        }
    }
}
