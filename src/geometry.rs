//! Shared geometric and color primitives used across editor, render, and history modules.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasPoint {
    pub x: f32,
    pub y: f32,
}

impl CanvasPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn channels(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Uniform scale that fits `source` inside `bounds` without ever enlarging it.
pub fn fit_scale(source: PixelSize, bounds: PixelSize) -> f32 {
    if source.is_empty() || bounds.is_empty() {
        return 1.0;
    }
    let horizontal = bounds.width as f32 / source.width as f32;
    let vertical = bounds.height as f32 / source.height as f32;
    horizontal.min(vertical).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_scale_picks_the_limiting_axis() {
        let scale = fit_scale(PixelSize::new(1000, 800), PixelSize::new(800, 600));
        assert!((scale - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn fit_scale_never_enlarges_small_sources() {
        let scale = fit_scale(PixelSize::new(400, 300), PixelSize::new(800, 600));
        assert!((scale - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn fit_scale_tolerates_empty_dimensions() {
        let degenerate_source = fit_scale(PixelSize::new(0, 10), PixelSize::new(800, 600));
        let degenerate_bounds = fit_scale(PixelSize::new(10, 10), PixelSize::new(0, 0));
        assert!((degenerate_source - 1.0).abs() < f32::EPSILON);
        assert!((degenerate_bounds - 1.0).abs() < f32::EPSILON);
    }
}
