use crate::ViewerSettings;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomStep {
    In,
    Out,
}

impl ZoomStep {
    pub fn sign(self) -> f64 {
        match self {
            ZoomStep::In => 1.0,
            ZoomStep::Out => -1.0,
        }
    }
}

/// Scale, rotation and pan applied to the surface image on display.
///
/// `pan_offset` is expressed in percent of the image viewport; hosts feed
/// pointer positions to the drag operations in the same unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformState {
    pub scale: f64,
    pub rotation_degrees: f64,
    pub pan_offset: Point,
    // Some only while a drag gesture is in progress.
    drag_anchor: Option<Point>,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotation_degrees: 0.0,
            pan_offset: Point::ORIGIN,
            drag_anchor: None,
        }
    }
}

impl TransformState {
    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    pub fn drag_anchor(&self) -> Option<Point> {
        self.drag_anchor
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.rotation_degrees == 0.0 && self.pan_offset == Point::ORIGIN
    }

    /// Steps the scale by `scale_factor`, clamped to the configured bounds.
    pub fn zoom_by(&mut self, step: ZoomStep, settings: &ViewerSettings) {
        let next = self.scale + step.sign() * settings.scale_factor;
        self.scale = next.clamp(settings.min_scale, settings.max_scale);
    }

    pub fn rotate_step(&mut self, settings: &ViewerSettings) {
        self.rotation_degrees = (self.rotation_degrees + settings.rotate_factor).rem_euclid(360.0);
    }

    /// Moves the image by one `pan_factor` step per axis; only the sign of
    /// `dx`/`dy` matters.
    pub fn pan_by(&mut self, dx: i32, dy: i32, settings: &ViewerSettings) {
        self.pan_offset.x += f64::from(dx.signum()) * settings.pan_factor;
        self.pan_offset.y += f64::from(dy.signum()) * settings.pan_factor;
    }

    pub fn begin_drag(&mut self, pointer: Point) {
        // Moves place the offset at (pointer - anchor).
        self.drag_anchor = Some(Point::new(
            pointer.x - self.pan_offset.x,
            pointer.y - self.pan_offset.y,
        ));
    }

    /// Returns false when no drag is in progress.
    pub fn continue_drag(&mut self, pointer: Point) -> bool {
        let Some(anchor) = self.drag_anchor else {
            return false;
        };
        self.pan_offset = Point::new(pointer.x - anchor.x, pointer.y - anchor.y);
        true
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Rotation rounded to the nearest quarter turn, in `0..4`.
    pub fn quarter_turns(&self) -> u8 {
        ((self.rotation_degrees / 90.0).round() as i64).rem_euclid(4) as u8
    }

    /// Rotation left over after [`Self::quarter_turns`], in `[-45, 45]`.
    pub fn residual_degrees(&self) -> f64 {
        let quarter = f64::from(self.quarter_turns()) * 90.0;
        (self.rotation_degrees - quarter + 180.0).rem_euclid(360.0) - 180.0
    }

    /// CSS-equivalent rendering of the transform, for hosts that style
    /// elements directly.
    pub fn css(&self) -> String {
        format!(
            "scale({}) rotate({}deg) translate({}%, {}%)",
            self.scale, self.rotation_degrees, self.pan_offset.x, self.pan_offset.y
        )
    }
}
