use super::Rgba;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextOptions {
    pub color: Rgba,
    pub size: f32,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            color: Rgba::opaque(0, 0, 0),
            size: DEFAULT_TEXT_SIZE,
        }
    }
}

impl TextOptions {
    pub fn set_color(&mut self, color: Rgba) {
        self.color = color;
    }

    pub fn set_size(&mut self, size: f32) {
        self.size = clamp_text_size(size);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub id: u64,
    pub left: f32,
    pub top: f32,
    pub content: String,
    pub options: TextOptions,
}

impl TextElement {
    pub fn new(id: u64, left: f32, top: f32, content: &str, options: TextOptions) -> Self {
        Self {
            id,
            left,
            top,
            content: content.to_string(),
            options,
        }
    }
}

fn clamp_text_size(size: f32) -> f32 {
    size.clamp(MIN_TEXT_SIZE, MAX_TEXT_SIZE)
}

pub(super) const DEFAULT_TEXT_CONTENT: &str = "Edit me";
const DEFAULT_TEXT_SIZE: f32 = 24.0;
const MIN_TEXT_SIZE: f32 = 4.0;
const MAX_TEXT_SIZE: f32 = 256.0;
