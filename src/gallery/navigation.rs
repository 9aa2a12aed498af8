//! Drag, wheel and edge-drift navigation around the cylinder.
//!
//! Input handlers mutate velocity and position directly; [`DragNavigation::update`]
//! is called once per frame to integrate momentum and wrap the scroll offset.

use crate::config::NavigationSettings;

// Per-frame integration factors for the residual velocities.
const ROTATION_STEP: f32 = 0.04;
const SCROLL_STEP: f32 = 0.5;
const EDGE_ROTATION_GAIN: f32 = 0.016;
const EDGE_SCROLL_GAIN: f32 = 0.5;

/// Snapshot returned by [`DragNavigation::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationFrame {
    /// Camera yaw in radians.
    pub angle: f32,
    /// Vertical offset of the poster group, always within `[0, period)`.
    pub scroll_y: f32,
    pub is_dragging: bool,
    /// The current or last press moved past the drag threshold, so it is not a click.
    pub drag_moved: bool,
}

#[derive(Debug, Clone)]
pub struct DragNavigation {
    settings: NavigationSettings,
    period: f32,
    angle: f32,
    scroll_y: f32,
    rotation_speed: f32,
    scroll_speed: f32,
    is_dragging: bool,
    drag_moved: bool,
    /// Last pointer position normalised to the viewport, 0..1 on each axis.
    pointer: (f32, f32),
    drag_origin: (f32, f32),
}

impl DragNavigation {
    /// `period` is the height the scroll offset wraps on, normally one
    /// repeat of the poster rows.
    pub fn new(settings: NavigationSettings, period: f32) -> Self {
        Self {
            settings,
            period,
            angle: 0.0,
            scroll_y: 0.0,
            rotation_speed: 0.0,
            scroll_speed: 0.0,
            is_dragging: false,
            drag_moved: false,
            pointer: (0.5, 0.5),
            drag_origin: (0.0, 0.0),
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.is_dragging = true;
        self.drag_moved = false;
        self.drag_origin = (x, y);
    }

    /// Mouse movement in viewport pixels. Always tracked for edge drift,
    /// and drags the view while a button is held.
    pub fn pointer_move(&mut self, x: f32, y: f32, viewport: (f32, f32)) {
        let (w, h) = viewport;
        if w > 0.0 && h > 0.0 {
            self.pointer = (x / w, y / h);
        }
        self.drag_to(x, y);
    }

    pub fn pointer_up(&mut self) {
        self.is_dragging = false;
    }

    pub fn touch_start(&mut self, x: f32, y: f32) {
        self.pointer_down(x, y);
    }

    /// Touch drags move the view but do not feed edge drift.
    pub fn touch_move(&mut self, x: f32, y: f32) {
        self.drag_to(x, y);
    }

    pub fn touch_end(&mut self) {
        self.pointer_up();
    }

    pub fn wheel(&mut self, delta_y: f32) {
        self.scroll_speed += delta_y * self.settings.wheel_speed;
    }

    fn drag_to(&mut self, x: f32, y: f32) {
        if !self.is_dragging {
            return;
        }
        let dx = x - self.drag_origin.0;
        let dy = y - self.drag_origin.1;
        let threshold = self.settings.drag_threshold;
        if dx.abs() > threshold || dy.abs() > threshold {
            self.drag_moved = true;
        }

        self.angle -= dx * self.settings.drag_sensitivity_x;
        self.scroll_y += dy * self.settings.drag_sensitivity_y;
        self.rotation_speed = -dx * self.settings.momentum_x;
        self.scroll_speed = dy * self.settings.momentum_y;
        self.drag_origin = (x, y);
    }

    /// Advance one frame. While an overlay is open all motion stops and the
    /// drag is abandoned.
    pub fn update(&mut self, overlay_open: bool) -> NavigationFrame {
        if overlay_open {
            self.rotation_speed = 0.0;
            self.scroll_speed = 0.0;
            self.is_dragging = false;
            return NavigationFrame {
                angle: self.angle,
                scroll_y: self.scroll_y,
                is_dragging: false,
                drag_moved: false,
            };
        }

        if !self.is_dragging {
            self.apply_edge_drift();
            self.rotation_speed *= self.settings.damping;
            self.scroll_speed *= self.settings.damping;
            self.angle += self.rotation_speed * ROTATION_STEP;
            self.scroll_y += self.scroll_speed * SCROLL_STEP;
        }

        self.scroll_y = wrap_scroll(self.scroll_y, self.period);

        NavigationFrame {
            angle: self.angle,
            scroll_y: self.scroll_y,
            is_dragging: self.is_dragging,
            drag_moved: self.drag_moved,
        }
    }

    fn apply_edge_drift(&mut self) {
        let zone = self.settings.edge_zone;
        let drift = self.settings.edge_drift_speed;
        let nx = (self.pointer.0 - 0.5) * 2.0;
        let ny = (self.pointer.1 - 0.5) * 2.0;
        if nx.abs() > zone {
            let f = (nx.abs() - zone) / (1.0 - zone);
            self.rotation_speed += nx.signum() * f * drift * EDGE_ROTATION_GAIN;
        }
        if ny.abs() > zone {
            let f = (ny.abs() - zone) / (1.0 - zone);
            self.scroll_speed += ny.signum() * f * drift * EDGE_SCROLL_GAIN;
        }
    }

    pub fn reset_drag_moved(&mut self) {
        self.drag_moved = false;
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn scroll_y(&self) -> f32 {
        self.scroll_y
    }

    pub fn velocity(&self) -> (f32, f32) {
        (self.rotation_speed, self.scroll_speed)
    }
}

/// Wrap `value` into `[0, period)`. Non-positive periods disable wrapping.
pub fn wrap_scroll(value: f32, period: f32) -> f32 {
    if period <= 0.0 || !value.is_finite() {
        return value;
    }
    let wrapped = value.rem_euclid(period);
    // rem_euclid can round up to exactly `period` for tiny negative inputs.
    if wrapped >= period { 0.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEW: (f32, f32) = (1000.0, 800.0);

    fn nav() -> DragNavigation {
        DragNavigation::new(NavigationSettings::default(), 450.0)
    }

    #[test]
    fn scroll_wraps_into_period_for_any_offset() {
        for v in [-1e6_f32, -450.0, -0.0001, 0.0, 449.99, 450.0, 1234.5, 9e5] {
            let w = wrap_scroll(v, 450.0);
            assert!((0.0..450.0).contains(&w), "{v} -> {w}");
        }
        assert_eq!(wrap_scroll(500.0, 450.0), 50.0);
        assert_eq!(wrap_scroll(5.0, 0.0), 5.0);
    }

    #[test]
    fn drag_moves_view_and_marks_moved_past_threshold() {
        let mut n = nav();
        n.pointer_down(500.0, 400.0);
        n.pointer_move(502.0, 401.0, VIEW);
        assert!(!n.update(false).drag_moved);

        n.pointer_move(552.0, 441.0, VIEW);
        let frame = n.update(false);
        assert!(frame.is_dragging);
        assert!(frame.drag_moved);
        // 52px of total horizontal travel at 0.0012 rad/px
        assert!((frame.angle + 52.0 * 0.0012).abs() < 1e-5);
        assert!((frame.scroll_y - 41.0 * 0.15).abs() < 1e-4);

        n.pointer_up();
        n.reset_drag_moved();
        assert!(!n.update(false).drag_moved);
    }

    #[test]
    fn momentum_decays_after_release() {
        let mut n = nav();
        n.pointer_down(500.0, 400.0);
        n.pointer_move(400.0, 400.0, VIEW);
        n.pointer_move(500.0, 400.0, VIEW);
        n.pointer_up();
        let (start, _) = n.velocity();
        assert!(start < 0.0);

        let mut last = start.abs();
        for _ in 0..50 {
            n.update(false);
            let (rot, _) = n.velocity();
            assert!(rot.abs() < last);
            last = rot.abs();
        }
        assert!((last - start.abs() * 0.975_f32.powi(50)).abs() < 1e-6);
    }

    #[test]
    fn wheel_adds_scroll_velocity() {
        let mut n = nav();
        n.wheel(100.0);
        assert!((n.velocity().1 - 0.4).abs() < 1e-6);
        let frame = n.update(false);
        assert!((frame.scroll_y - 0.4 * 0.975 * 0.5).abs() < 1e-5);
    }

    #[test]
    fn pointer_near_edge_drifts_when_idle() {
        let mut n = nav();
        // nx = 0.98, well inside the right edge zone
        n.pointer_move(990.0, 400.0, VIEW);
        n.update(false);
        let (rot, scroll) = n.velocity();
        assert!(rot > 0.0);
        assert_eq!(scroll, 0.0);

        let mut centred = nav();
        centred.pointer_move(500.0, 400.0, VIEW);
        centred.update(false);
        assert_eq!(centred.velocity(), (0.0, 0.0));
    }

    #[test]
    fn touch_drag_does_not_track_edge_position() {
        let mut n = nav();
        n.touch_start(10.0, 400.0);
        n.touch_move(990.0, 400.0);
        n.touch_end();
        assert!(n.velocity().0 < 0.0);
        // pointer stayed centred, so no drift is added on top of damping
        let before = n.velocity().0;
        n.update(false);
        assert!((n.velocity().0 - before * 0.975).abs() < 1e-7);
    }

    #[test]
    fn overlay_freezes_motion() {
        let mut n = nav();
        n.pointer_down(500.0, 400.0);
        n.pointer_move(600.0, 500.0, VIEW);
        let before = (n.angle(), n.scroll_y());

        let frame = n.update(true);
        assert!(!frame.is_dragging);
        assert!(!frame.drag_moved);
        assert_eq!((frame.angle, frame.scroll_y), before);
        assert_eq!(n.velocity(), (0.0, 0.0));

        // Pointer moves after the freeze do nothing; the drag was dropped.
        n.pointer_move(700.0, 600.0, VIEW);
        assert_eq!(n.update(true).angle, before.0);
    }
}
