use super::Rgba;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseOptions {
    pub fill: Rgba,
    pub stroke: Rgba,
    pub stroke_width: f32,
}

impl Default for EllipseOptions {
    fn default() -> Self {
        Self {
            fill: Rgba::new(0, 255, 0, DEFAULT_FILL_ALPHA),
            stroke: Rgba::opaque(0, 255, 0),
            stroke_width: DEFAULT_ELLIPSE_STROKE_WIDTH,
        }
    }
}

impl EllipseOptions {
    pub fn set_fill(&mut self, fill: Rgba) {
        self.fill = fill;
    }

    pub fn set_stroke(&mut self, stroke: Rgba) {
        self.stroke = stroke;
    }

    pub fn set_stroke_width(&mut self, stroke_width: f32) {
        self.stroke_width = clamp_stroke_width(stroke_width);
    }
}

/// Ellipse anchored by the top-left corner of its bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseElement {
    pub id: u64,
    pub left: f32,
    pub top: f32,
    pub rx: f32,
    pub ry: f32,
    pub options: EllipseOptions,
}

impl EllipseElement {
    pub fn new(id: u64, left: f32, top: f32, rx: f32, ry: f32, options: EllipseOptions) -> Self {
        Self {
            id,
            left,
            top,
            rx,
            ry,
            options,
        }
    }

    pub fn with_default_radius(id: u64, left: f32, top: f32, options: EllipseOptions) -> Self {
        Self::new(
            id,
            left,
            top,
            DEFAULT_ELLIPSE_RADIUS,
            DEFAULT_ELLIPSE_RADIUS,
            options,
        )
    }
}

fn clamp_stroke_width(value: f32) -> f32 {
    value.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH)
}

const DEFAULT_FILL_ALPHA: u8 = 77;
const DEFAULT_ELLIPSE_STROKE_WIDTH: f32 = 2.0;
const DEFAULT_ELLIPSE_RADIUS: f32 = 50.0;
const MIN_STROKE_WIDTH: f32 = 0.0;
const MAX_STROKE_WIDTH: f32 = 64.0;
