/// Largest size with the source's aspect ratio that fits inside the box.
/// Scales up as well as down.
pub fn contain_size(box_w: f32, box_h: f32, src_w: f32, src_h: f32) -> (f32, f32) {
    let iw = src_w.max(1.0);
    let ih = src_h.max(1.0);
    let bw = box_w.max(0.0);
    let bh = box_h.max(0.0);
    let scale = (bw / iw).min(bh / ih).max(0.0);
    let scale = if scale.is_finite() { scale } else { 1.0 };
    (iw * scale, ih * scale)
}

pub fn center_offset(inner_w: f32, inner_h: f32, outer_w: f32, outer_h: f32) -> (f32, f32) {
    (
        ((outer_w - inner_w) * 0.5).max(0.0),
        ((outer_h - inner_h) * 0.5).max(0.0),
    )
}
