use super::{CanvasPoint, Rgba};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenOptions {
    pub color: Rgba,
    pub thickness: f32,
}

impl Default for PenOptions {
    fn default() -> Self {
        Self {
            color: Rgba::opaque(0, 0, 0),
            thickness: DEFAULT_PEN_THICKNESS,
        }
    }
}

impl PenOptions {
    pub fn set_color(&mut self, color: Rgba) {
        self.color = color;
    }

    pub fn set_thickness(&mut self, thickness: f32) {
        self.thickness = clamp_thickness(thickness);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PenStroke {
    pub id: u64,
    pub points: Vec<CanvasPoint>,
    pub options: PenOptions,
    pub finalized: bool,
}

impl PenStroke {
    pub fn new(id: u64, start: CanvasPoint, options: PenOptions) -> Self {
        Self {
            id,
            points: vec![start],
            options,
            finalized: false,
        }
    }

    pub fn append_point(&mut self, point: CanvasPoint) {
        self.points.push(point);
    }

    pub fn finalize(&mut self) {
        self.finalized = true;
    }
}

fn clamp_thickness(value: f32) -> f32 {
    value.clamp(MIN_PEN_THICKNESS, MAX_PEN_THICKNESS)
}

const DEFAULT_PEN_THICKNESS: f32 = 3.0;
const MIN_PEN_THICKNESS: f32 = 0.5;
const MAX_PEN_THICKNESS: f32 = 64.0;
