//! Annotation objects and the ordered stack an editing session mutates.

mod ellipse;
mod pen;
mod rectangle;
mod text;

pub use crate::geometry::{CanvasPoint, Rgba};
pub use ellipse::{EllipseElement, EllipseOptions};
pub use pen::{PenOptions, PenStroke};
pub use rectangle::{RectangleElement, RectangleOptions};
pub use text::{TextElement, TextOptions};

use text::DEFAULT_TEXT_CONTENT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Select,
    Crop,
    Rectangle,
    Ellipse,
    Arrow,
    Pen,
    Text,
    Blur,
}

impl ToolKind {
    /// Tools that insert a ready-made object the moment they activate.
    pub const fn inserts_object(self) -> bool {
        matches!(self, Self::Rectangle | Self::Ellipse | Self::Text)
    }

    /// Tools that put the canvas into freehand drawing mode.
    pub const fn begins_drawing(self) -> bool {
        matches!(self, Self::Pen)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationObject {
    Rectangle(RectangleElement),
    Ellipse(EllipseElement),
    Pen(PenStroke),
    Text(TextElement),
}

impl AnnotationObject {
    pub const fn id(&self) -> u64 {
        match self {
            Self::Rectangle(rectangle) => rectangle.id,
            Self::Ellipse(ellipse) => ellipse.id,
            Self::Pen(stroke) => stroke.id,
            Self::Text(text) => text.id,
        }
    }

    pub fn translate_by(&mut self, dx: f32, dy: f32) {
        match self {
            Self::Rectangle(rectangle) => {
                rectangle.left += dx;
                rectangle.top += dy;
            }
            Self::Ellipse(ellipse) => {
                ellipse.left += dx;
                ellipse.top += dy;
            }
            Self::Pen(stroke) => {
                for point in &mut stroke.points {
                    point.x += dx;
                    point.y += dy;
                }
            }
            Self::Text(text) => {
                text.left += dx;
                text.top += dy;
            }
        }
    }

    fn as_pen_mut(&mut self) -> Option<&mut PenStroke> {
        match self {
            Self::Pen(stroke) => Some(stroke),
            _ => None,
        }
    }

    fn as_text_mut(&mut self) -> Option<&mut TextElement> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolError {
    ToolNotSelected,
    StrokeNotActive,
    StrokeAlreadyActive,
    ObjectNotFound,
}

/// Ordered annotation stack; later objects draw above earlier ones.
#[derive(Debug, Clone)]
pub struct AnnotationStack {
    active_tool: ToolKind,
    rectangle_options: RectangleOptions,
    ellipse_options: EllipseOptions,
    pen_options: PenOptions,
    text_options: TextOptions,
    objects: Vec<AnnotationObject>,
    next_id: u64,
    active_stroke: Option<u64>,
}

impl Default for AnnotationStack {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationStack {
    fn allocate_id(&mut self) -> u64 {
        let issued = self.next_id;
        self.next_id = issued.saturating_add(1);
        issued
    }

    fn find_object_mut<T>(
        &mut self,
        id: u64,
        projector: fn(&mut AnnotationObject) -> Option<&mut T>,
    ) -> Option<&mut T> {
        self.objects
            .iter_mut()
            .filter(|object| object.id() == id)
            .find_map(projector)
    }

    pub fn new() -> Self {
        Self {
            active_tool: ToolKind::Select,
            rectangle_options: RectangleOptions::default(),
            ellipse_options: EllipseOptions::default(),
            pen_options: PenOptions::default(),
            text_options: TextOptions::default(),
            objects: Vec::new(),
            next_id: 1,
            active_stroke: None,
        }
    }

    pub fn select_tool(&mut self, tool: ToolKind) {
        self.active_tool = tool;
    }

    pub fn active_tool(&self) -> ToolKind {
        self.active_tool
    }

    pub fn objects(&self) -> &[AnnotationObject] {
        &self.objects
    }

    pub fn rectangle_options(&self) -> RectangleOptions {
        self.rectangle_options
    }

    pub fn ellipse_options(&self) -> EllipseOptions {
        self.ellipse_options
    }

    pub fn pen_options(&self) -> PenOptions {
        self.pen_options
    }

    pub fn text_options(&self) -> TextOptions {
        self.text_options
    }

    pub fn set_shared_stroke_color(&mut self, color: Rgba) {
        self.rectangle_options.set_stroke(color);
        self.ellipse_options.set_stroke(color);
        self.pen_options.set_color(color);
        self.text_options.set_color(color);
    }

    pub fn set_shared_stroke_width(&mut self, width: f32) {
        self.rectangle_options.set_stroke_width(width);
        self.ellipse_options.set_stroke_width(width);
        self.pen_options.set_thickness(width);
    }

    pub fn set_text_size(&mut self, size: f32) {
        self.text_options.set_size(size);
    }

    pub fn insert_rectangle(&mut self, at: CanvasPoint) -> u64 {
        let id = self.allocate_id();
        let element = RectangleElement::with_default_size(id, at.x, at.y, self.rectangle_options);
        self.objects.push(AnnotationObject::Rectangle(element));
        id
    }

    pub fn insert_ellipse(&mut self, at: CanvasPoint) -> u64 {
        let id = self.allocate_id();
        let element = EllipseElement::with_default_radius(id, at.x, at.y, self.ellipse_options);
        self.objects.push(AnnotationObject::Ellipse(element));
        id
    }

    pub fn insert_text(&mut self, at: CanvasPoint) -> u64 {
        let id = self.allocate_id();
        let element = TextElement::new(id, at.x, at.y, DEFAULT_TEXT_CONTENT, self.text_options);
        self.objects.push(AnnotationObject::Text(element));
        id
    }

    pub fn begin_stroke(&mut self, at: CanvasPoint) -> Result<u64, ToolError> {
        if self.active_stroke.is_some() {
            return Err(ToolError::StrokeAlreadyActive);
        }
        let id = self.allocate_id();
        self.objects
            .push(AnnotationObject::Pen(PenStroke::new(id, at, self.pen_options)));
        self.active_stroke = Some(id);
        Ok(id)
    }

    pub fn extend_stroke(&mut self, point: CanvasPoint) -> Result<(), ToolError> {
        let id = self.active_stroke.ok_or(ToolError::StrokeNotActive)?;
        let stroke = self
            .find_object_mut(id, AnnotationObject::as_pen_mut)
            .ok_or(ToolError::StrokeNotActive)?;
        stroke.append_point(point);
        Ok(())
    }

    pub fn finish_stroke(&mut self) -> Result<u64, ToolError> {
        let id = self.active_stroke.take().ok_or(ToolError::StrokeNotActive)?;
        if let Some(stroke) = self.find_object_mut(id, AnnotationObject::as_pen_mut) {
            stroke.finalize();
        }
        Ok(id)
    }

    /// Re-pushes a previously popped object, keeping fresh ids ahead of it.
    pub fn push_object(&mut self, object: AnnotationObject) {
        self.next_id = self.next_id.max(object.id().saturating_add(1));
        self.objects.push(object);
    }

    pub fn pop_object(&mut self) -> Option<AnnotationObject> {
        let object = self.objects.pop()?;
        if self.active_stroke == Some(object.id()) {
            self.active_stroke = None;
        }
        Some(object)
    }

    pub fn remove_object(&mut self, id: u64) -> Result<AnnotationObject, ToolError> {
        let index = self
            .objects
            .iter()
            .position(|object| object.id() == id)
            .ok_or(ToolError::ObjectNotFound)?;
        let object = self.objects.remove(index);
        if self.active_stroke == Some(id) {
            self.active_stroke = None;
        }
        Ok(object)
    }

    pub fn move_object_by(&mut self, id: u64, dx: f32, dy: f32) -> Result<(), ToolError> {
        let object = self
            .objects
            .iter_mut()
            .find(|object| object.id() == id)
            .ok_or(ToolError::ObjectNotFound)?;
        object.translate_by(dx, dy);
        Ok(())
    }

    pub fn set_text_content(&mut self, id: u64, content: &str) -> Result<(), ToolError> {
        let text = self
            .find_object_mut(id, AnnotationObject::as_text_mut)
            .ok_or(ToolError::ObjectNotFound)?;
        text.content = content.to_string();
        Ok(())
    }
}

#[cfg(test)]
impl AnnotationObject {
    fn as_rectangle(&self) -> Option<&RectangleElement> {
        match self {
            Self::Rectangle(rectangle) => Some(rectangle),
            _ => None,
        }
    }

    fn as_pen(&self) -> Option<&PenStroke> {
        match self {
            Self::Pen(stroke) => Some(stroke),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<&TextElement> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
impl AnnotationStack {
    fn find_object_ref<T>(
        &self,
        id: u64,
        projector: fn(&AnnotationObject) -> Option<&T>,
    ) -> Option<&T> {
        self.objects.iter().find_map(|object| {
            if object.id() == id {
                projector(object)
            } else {
                None
            }
        })
    }

    fn get_rectangle(&self, id: u64) -> Option<&RectangleElement> {
        self.find_object_ref(id, AnnotationObject::as_rectangle)
    }

    fn get_pen_stroke(&self, id: u64) -> Option<&PenStroke> {
        self.find_object_ref(id, AnnotationObject::as_pen)
    }

    fn get_text(&self, id: u64) -> Option<&TextElement> {
        self.find_object_ref(id, AnnotationObject::as_text)
    }
}
