//! Minimal grayscale raster primitives for procedurally drawn posters.
//!
//! Shapes are drawn with analytic coverage so edges stay soft at the small
//! sizes posters are shown at. All drawing clips to the image bounds.

use ab_glyph::{Font, FontArc, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};

#[inline]
fn gray(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Blend `tone` over the pixel at (x, y) by `coverage` in 0..=1.
pub fn blend_pixel(img: &mut RgbaImage, x: i64, y: i64, tone: f32, coverage: f32) {
    if x < 0 || y < 0 || x >= i64::from(img.width()) || y >= i64::from(img.height()) {
        return;
    }
    let coverage = coverage.clamp(0.0, 1.0);
    if coverage <= 0.0 {
        return;
    }
    let px = img.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let base = f32::from(px[c]);
        px[c] = gray(base + (tone - base) * coverage);
    }
    px[3] = 255;
}

pub fn fill(img: &mut RgbaImage, tone: f32) {
    let v = gray(tone);
    for px in img.pixels_mut() {
        *px = Rgba([v, v, v, 255]);
    }
}

pub fn fill_rect(img: &mut RgbaImage, left: f32, top: f32, width: f32, height: f32, tone: f32) {
    let right = left + width;
    let bottom = top + height;
    let x0 = left.floor().max(0.0) as i64;
    let y0 = top.floor().max(0.0) as i64;
    let x1 = right.ceil().min(img.width() as f32) as i64;
    let y1 = bottom.ceil().min(img.height() as f32) as i64;
    for y in y0..y1 {
        let cov_y = (bottom.min(y as f32 + 1.0) - top.max(y as f32)).clamp(0.0, 1.0);
        for x in x0..x1 {
            let cov_x = (right.min(x as f32 + 1.0) - left.max(x as f32)).clamp(0.0, 1.0);
            blend_pixel(img, x, y, tone, cov_x * cov_y);
        }
    }
}

/// Fill a rectangle with a vertical linear gradient that spans the whole
/// image height, the way a canvas-wide gradient clipped to a rectangle looks.
/// `stops` are (offset 0..=1, tone), sorted by offset.
pub fn fill_rect_vertical_gradient(
    img: &mut RgbaImage,
    left: f32,
    top: f32,
    width: f32,
    height: f32,
    stops: &[(f32, f32)],
) {
    if stops.is_empty() || height <= 0.0 {
        return;
    }
    let span = img.height().max(1) as f32;
    let y0 = top.floor().max(0.0) as i64;
    let y1 = (top + height).ceil().min(img.height() as f32) as i64;
    for y in y0..y1 {
        let row_top = (y as f32).max(top);
        let row_bottom = (y as f32 + 1.0).min(top + height);
        let tone = gradient_at(stops, (y as f32 + 0.5) / span);
        fill_rect(img, left, row_top, width, row_bottom - row_top, tone);
    }
}

fn gradient_at(stops: &[(f32, f32)], t: f32) -> f32 {
    let first = stops[0];
    if t <= first.0 {
        return first.1;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.0 {
            let span = (b.0 - a.0).max(f32::EPSILON);
            return a.1 + (b.1 - a.1) * ((t - a.0) / span);
        }
    }
    stops[stops.len() - 1].1
}

pub fn fill_circle(img: &mut RgbaImage, cx: f32, cy: f32, radius: f32, tone: f32) {
    for_each_in_box(img, cx, cy, radius + 1.0, |img, x, y, d| {
        blend_pixel(img, x, y, tone, radius + 0.5 - d);
    });
}

pub fn stroke_circle(img: &mut RgbaImage, cx: f32, cy: f32, radius: f32, line_width: f32, tone: f32) {
    let half = line_width * 0.5;
    for_each_in_box(img, cx, cy, radius + half + 1.0, |img, x, y, d| {
        blend_pixel(img, x, y, tone, half + 0.5 - (d - radius).abs());
    });
}

fn for_each_in_box(
    img: &mut RgbaImage,
    cx: f32,
    cy: f32,
    extent: f32,
    mut f: impl FnMut(&mut RgbaImage, i64, i64, f32),
) {
    let x0 = (cx - extent).floor().max(0.0) as i64;
    let y0 = (cy - extent).floor().max(0.0) as i64;
    let x1 = (cx + extent).ceil().min(img.width() as f32) as i64;
    let y1 = (cy + extent).ceil().min(img.height() as f32) as i64;
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            f(img, x, y, (dx * dx + dy * dy).sqrt());
        }
    }
}

/// Fill a triangle, sampling pixel centres (edges are hard).
pub fn fill_triangle(img: &mut RgbaImage, a: (f32, f32), b: (f32, f32), c: (f32, f32), tone: f32) {
    let min_x = a.0.min(b.0).min(c.0).floor().max(0.0) as i64;
    let max_x = a.0.max(b.0).max(c.0).ceil().min(img.width() as f32) as i64;
    let min_y = a.1.min(b.1).min(c.1).floor().max(0.0) as i64;
    let max_y = a.1.max(b.1).max(c.1).ceil().min(img.height() as f32) as i64;

    let edge = |p: (f32, f32), q: (f32, f32), x: f32, y: f32| {
        (q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0)
    };
    let area = edge(a, b, c.0, c.1);
    if area.abs() <= f32::EPSILON {
        return;
    }
    for y in min_y..max_y {
        for x in min_x..max_x {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(b, c, px, py) * area.signum();
            let w1 = edge(c, a, px, py) * area.signum();
            let w2 = edge(a, b, px, py) * area.signum();
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                blend_pixel(img, x, y, tone, 1.0);
            }
        }
    }
}

/// Where the (x, y) passed to [`draw_text`] sits relative to the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    LeftBaseline,
    CenterBaseline,
    CenterMiddle,
}

pub fn measure_text(text: &str, font: &FontArc, scale: PxScale) -> f32 {
    let scaled_font = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut previous = None;
    for ch in text.chars() {
        if ch.is_control() {
            continue;
        }
        let glyph_id = scaled_font.glyph_id(ch);
        if let Some(prev) = previous {
            width += scaled_font.kern(prev, glyph_id);
        }
        width += scaled_font.h_advance(glyph_id);
        previous = Some(glyph_id);
    }
    width.max(0.0)
}

/// Draw one line of text anchored at (x, y).
pub fn draw_text(
    img: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    size: f32,
    x: f32,
    y: f32,
    anchor: TextAnchor,
    tone: f32,
) {
    let scale = PxScale::from(size);
    let scaled = font.as_scaled(scale);
    let half_width = || measure_text(text, font, scale) * 0.5;
    let (mut cursor_x, baseline) = match anchor {
        TextAnchor::LeftBaseline => (x, y),
        TextAnchor::CenterBaseline => (x - half_width(), y),
        TextAnchor::CenterMiddle => {
            // descent is negative in ab_glyph
            let mid = (scaled.ascent() + scaled.descent()) * 0.5;
            (x - half_width(), y + mid)
        }
    };

    let mut previous = None;
    for ch in text.chars() {
        if ch.is_control() {
            continue;
        }
        let glyph = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            cursor_x += scaled.kern(prev, glyph);
        }
        let advance = scaled.h_advance(glyph);
        let mut positioned = scaled.scaled_glyph(ch);
        positioned.position = point(cursor_x, baseline);
        if let Some(outline) = font.outline_glyph(positioned) {
            let bounds = outline.px_bounds();
            outline.draw(|gx, gy, coverage| {
                blend_pixel(
                    img,
                    (bounds.min.x + gx as f32) as i64,
                    (bounds.min.y + gy as f32) as i64,
                    tone,
                    coverage,
                );
            });
        }
        cursor_x += advance;
        previous = Some(glyph);
    }
}
