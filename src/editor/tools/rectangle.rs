use super::Rgba;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleOptions {
    pub fill: Rgba,
    pub stroke: Rgba,
    pub stroke_width: f32,
}

impl Default for RectangleOptions {
    fn default() -> Self {
        Self {
            fill: Rgba::new(255, 0, 0, DEFAULT_FILL_ALPHA),
            stroke: Rgba::opaque(255, 0, 0),
            stroke_width: DEFAULT_RECTANGLE_STROKE_WIDTH,
        }
    }
}

impl RectangleOptions {
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

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleElement {
    pub id: u64,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub options: RectangleOptions,
}

impl RectangleElement {
    pub fn new(
        id: u64,
        left: f32,
        top: f32,
        width: f32,
        height: f32,
        options: RectangleOptions,
    ) -> Self {
        Self {
            id,
            left,
            top,
            width,
            height,
            options,
        }
    }

    pub fn with_default_size(id: u64, left: f32, top: f32, options: RectangleOptions) -> Self {
        Self::new(
            id,
            left,
            top,
            DEFAULT_RECTANGLE_WIDTH,
            DEFAULT_RECTANGLE_HEIGHT,
            options,
        )
    }
}

fn clamp_stroke_width(value: f32) -> f32 {
    value.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH)
}

const DEFAULT_FILL_ALPHA: u8 = 77;
const DEFAULT_RECTANGLE_STROKE_WIDTH: f32 = 2.0;
const DEFAULT_RECTANGLE_WIDTH: f32 = 100.0;
const DEFAULT_RECTANGLE_HEIGHT: f32 = 80.0;
const MIN_STROKE_WIDTH: f32 = 0.0;
const MAX_STROKE_WIDTH: f32 = 64.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_options_default_to_translucent_red_fill() {
        let options = RectangleOptions::default();
        assert_eq!(options.fill, Rgba::new(255, 0, 0, 77));
        assert_eq!(options.stroke, Rgba::opaque(255, 0, 0));
        assert_eq!(options.stroke_width, DEFAULT_RECTANGLE_STROKE_WIDTH);
    }

    #[test]
    fn rectangle_stroke_width_is_clamped() {
        let mut options = RectangleOptions::default();
        options.set_stroke_width(-3.0);
        assert_eq!(options.stroke_width, MIN_STROKE_WIDTH);
        options.set_stroke_width(1000.0);
        assert_eq!(options.stroke_width, MAX_STROKE_WIDTH);
    }

    #[test]
    fn default_sized_rectangle_spans_100_by_80() {
        let element =
            RectangleElement::with_default_size(7, 10.0, 20.0, RectangleOptions::default());
        assert_eq!(element.width, 100.0);
        assert_eq!(element.height, 80.0);
        assert_eq!(element.id, 7);
    }
}
