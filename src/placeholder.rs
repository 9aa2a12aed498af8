//! Placeholder Synthesizer: procedural stand-in posters for unresolvable assets.
//!
//! Layout, tones and title are a pure function of the poster index; only the
//! film-grain pass draws from the supplied random source.

use ab_glyph::FontArc;
use image::RgbaImage;
use rand::Rng;

use crate::processing::draw::{
    TextAnchor, draw_text, fill, fill_circle, fill_rect, fill_rect_vertical_gradient,
    fill_triangle, stroke_circle,
};

pub const PLACEHOLDER_WIDTH: u32 = 360;
pub const PLACEHOLDER_HEIGHT: u32 = 480;

/// Peak grain offset on the 0..=255 scale.
pub const GRAIN_AMPLITUDE: f32 = 7.0;

const TITLES: [&str; 30] = [
    "Meridian", "Nocturne", "Vertex", "Solstice", "Cascade", "Prism", "Zenith", "Flux", "Ember",
    "Drift", "Axiom", "Pulse", "Vortex", "Horizon", "Echo", "Spectra", "Nova", "Stratum",
    "Cipher", "Radiant", "Monolith", "Fractal", "Umbra", "Apex", "Lumen", "Orbital", "Genesis",
    "Mirage", "Catalyst", "Ethereal",
];

const DATES: [&str; 30] = [
    "2024", "2024", "2024", "2024", "2024", "2023", "2023", "2023", "2023", "2023", "2023",
    "2023", "2022", "2022", "2022", "2022", "2022", "2022", "2022", "2022", "2021", "2021",
    "2021", "2021", "2021", "2021", "2021", "2021", "2021", "2021",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    Typography,
    Circles,
    Gradient,
    Lines,
    Blocks,
    Triangle,
}

impl PlaceholderStyle {
    const ALL: [Self; 6] = [
        Self::Typography,
        Self::Circles,
        Self::Gradient,
        Self::Lines,
        Self::Blocks,
        Self::Triangle,
    ];

    pub fn for_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }
}

/// Deterministic description of the placeholder for one poster index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSpec {
    pub index: usize,
    pub style: PlaceholderStyle,
    pub title: &'static str,
    pub date: &'static str,
    /// Background grey level.
    pub base: u8,
    /// Foreground grey level, always darker than `base`.
    pub fg: u8,
}

impl PlaceholderSpec {
    pub fn for_index(index: usize) -> Self {
        let base = 200 + (index % 40 * 7 % 40) as i32 - 20;
        let fg = base - 55 - (index % 3) as i32 * 10;
        Self {
            index,
            style: PlaceholderStyle::for_index(index),
            title: TITLES[index % TITLES.len()],
            date: DATES[index % DATES.len()],
            base: base as u8,
            fg: fg as u8,
        }
    }
}

/// Render the placeholder for `index` at 360×480 (3:4).
///
/// Titles are drawn only when `font` is available. Never fails.
pub fn synthesize<R: Rng + ?Sized>(index: usize, rng: &mut R, font: Option<&FontArc>) -> RgbaImage {
    let spec = PlaceholderSpec::for_index(index);
    let mut img = RgbaImage::new(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT);
    draw_layout(&mut img, &spec, font);
    apply_grain(&mut img, rng);
    img
}

/// Flat stand-in in the poster's background tone, with no layout or grain.
/// Used when a resolution task dies before it can produce a surface.
pub fn blank(index: usize) -> RgbaImage {
    let mut img = RgbaImage::new(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT);
    fill(&mut img, f32::from(PlaceholderSpec::for_index(index).base));
    img
}

fn draw_layout(img: &mut RgbaImage, spec: &PlaceholderSpec, font: Option<&FontArc>) {
    let bg = f32::from(spec.base);
    let fg = f32::from(spec.fg);
    fill(img, bg);

    match spec.style {
        PlaceholderStyle::Typography => {
            if let Some(font) = font {
                draw_text(img, font, "Aa", 140.0, 180.0, 210.0, TextAnchor::CenterMiddle, fg);
            }
            fill_rect(img, 110.0, 310.0, 140.0, 2.0, fg);
            if let Some(font) = font {
                let title = spec.title.to_uppercase();
                draw_text(img, font, &title, 14.0, 180.0, 345.0, TextAnchor::CenterMiddle, fg);
            }
        }
        PlaceholderStyle::Circles => {
            for j in 0..5 {
                stroke_circle(img, 180.0, 220.0, 35.0 + j as f32 * 32.0, 1.5, fg);
            }
            fill_circle(img, 180.0, 220.0, 16.0, fg);
        }
        PlaceholderStyle::Gradient => {
            let stops = [(0.0, fg), (0.65, fg + 35.0), (1.0, bg - 10.0)];
            fill_rect_vertical_gradient(img, 25.0, 25.0, 310.0, 340.0, &stops);
            if let Some(font) = font {
                let tone = fg + 15.0;
                draw_text(img, font, spec.title, 13.0, 25.0, 405.0, TextAnchor::LeftBaseline, tone);
                draw_text(img, font, spec.date, 11.0, 25.0, 425.0, TextAnchor::LeftBaseline, tone);
            }
        }
        PlaceholderStyle::Lines => {
            for j in 0..12u32 {
                let y = 60.0 + j as f32 * 30.0;
                let x0 = 30.0 + (j * 37 % 100) as f32;
                let x1 = 330.0 - (j * 23 % 80) as f32;
                fill_rect(img, x0, y - 0.5, x1 - x0, 1.0, fg);
            }
            fill_circle(img, 180.0, 440.0, 4.0, fg);
        }
        PlaceholderStyle::Blocks => {
            let index = spec.index;
            for r in 0..5usize {
                for c in 0..4usize {
                    if (r + c + index % 3) % 3 != 0 {
                        let shade = fg + (r * c * (index % 25) % 25) as f32;
                        fill_rect(
                            img,
                            25.0 + c as f32 * 82.0,
                            35.0 + r as f32 * 82.0,
                            68.0,
                            68.0,
                            shade,
                        );
                    }
                }
            }
        }
        PlaceholderStyle::Triangle => {
            fill_triangle(img, (180.0, 60.0), (310.0, 320.0), (50.0, 320.0), fg);
            if let Some(font) = font {
                let title = spec.title.to_uppercase();
                draw_text(img, font, &title, 26.0, 180.0, 395.0, TextAnchor::CenterBaseline, fg);
            }
            fill_rect(img, 130.0, 410.0, 100.0, 1.0, fg);
        }
    }
}

/// Uniform luminance noise in [-GRAIN_AMPLITUDE, GRAIN_AMPLITUDE), equal on R, G and B.
fn apply_grain<R: Rng + ?Sized>(img: &mut RgbaImage, rng: &mut R) {
    for px in img.pixels_mut() {
        let noise = (rng.random::<f32>() - 0.5) * 2.0 * GRAIN_AMPLITUDE;
        for c in 0..3 {
            px[c] = (f32::from(px[c]) + noise).round().clamp(0.0, 255.0) as u8;
        }
    }
}
