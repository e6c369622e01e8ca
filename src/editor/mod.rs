//! Editing session: base raster, annotation stack, undo history, and export.

pub mod tools;

use std::time::{SystemTime, UNIX_EPOCH};

use image::RgbaImage;
use thiserror::Error;

use crate::clipboard::{ClipboardBackend, ClipboardError};
use crate::geometry::{fit_scale, PixelSize};
use crate::raster::{self, RasterError};
use crate::render::{CanvasRenderer, FlattenRequest, RenderError};

pub use tools::{AnnotationObject, AnnotationStack, CanvasPoint, Rgba, ToolError, ToolKind};

pub const ZOOM_MIN_PERCENT: u16 = 20;
pub const ZOOM_MAX_PERCENT: u16 = 300;
pub const ZOOM_STEP_PERCENT: u16 = 20;
pub const DEFAULT_CANVAS_BOUNDS: PixelSize = PixelSize::new(800, 600);

const CANVAS_BACKGROUND: Rgba = Rgba::opaque(255, 255, 255);
const DEFAULT_INSERT_POINT: CanvasPoint = CanvasPoint::new(100.0, 100.0);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to decode source image")]
    SourceDecode {
        #[source]
        source: RasterError,
    },
    #[error("source image has empty dimensions: {width}x{height}")]
    EmptySource { width: u32, height: u32 },
    #[error("failed to flatten canvas")]
    Flatten {
        #[source]
        source: RenderError,
    },
    #[error("failed to encode export")]
    ExportEncode {
        #[source]
        source: RasterError,
    },
    #[error("failed to write image to clipboard")]
    ClipboardWrite {
        #[source]
        source: ClipboardError,
    },
    #[error("tool operation failed: {0:?}")]
    Tool(ToolError),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// View-only zoom over the fitted canvas. Never touches export geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorViewport {
    zoom_percent: u16,
}

impl Default for EditorViewport {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorViewport {
    pub const fn new() -> Self {
        Self { zoom_percent: 100 }
    }

    pub const fn zoom_percent(&self) -> u16 {
        self.zoom_percent
    }

    pub const fn min_zoom_percent() -> u16 {
        ZOOM_MIN_PERCENT
    }

    pub const fn max_zoom_percent() -> u16 {
        ZOOM_MAX_PERCENT
    }

    pub fn zoom_in(&mut self) {
        self.zoom_percent = clamp_zoom_percent(self.zoom_percent.saturating_add(ZOOM_STEP_PERCENT));
    }

    pub fn zoom_out(&mut self) {
        self.zoom_percent = clamp_zoom_percent(self.zoom_percent.saturating_sub(ZOOM_STEP_PERCENT));
    }

    pub fn set_zoom_percent(&mut self, zoom_percent: u16) {
        self.zoom_percent = snap_zoom_percent(zoom_percent);
    }
}

fn clamp_zoom_percent(zoom_percent: u16) -> u16 {
    zoom_percent.clamp(ZOOM_MIN_PERCENT, ZOOM_MAX_PERCENT)
}

// Clamp first so the rounding arithmetic cannot overflow u16.
fn snap_zoom_percent(zoom_percent: u16) -> u16 {
    let clamped = clamp_zoom_percent(zoom_percent);
    (clamped + ZOOM_STEP_PERCENT / 2) / ZOOM_STEP_PERCENT * ZOOM_STEP_PERCENT
}

/// One image being edited. The base raster is fixed; only annotations
/// participate in undo and redo.
#[derive(Debug, Clone)]
pub struct EditorSession {
    base: RgbaImage,
    native_size: PixelSize,
    canvas_size: PixelSize,
    file_name: Option<String>,
    stack: AnnotationStack,
    viewport: EditorViewport,
    redo_buffer: Vec<AnnotationObject>,
}

impl EditorSession {
    pub fn from_data_url(
        data_url: &str,
        file_name: Option<String>,
        bounds: PixelSize,
    ) -> SessionResult<Self> {
        let image = raster::decode_data_url(data_url)
            .map_err(|source| SessionError::SourceDecode { source })?;
        Self::from_image(image, file_name, bounds)
    }

    pub fn from_image(
        image: RgbaImage,
        file_name: Option<String>,
        bounds: PixelSize,
    ) -> SessionResult<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(SessionError::EmptySource { width, height });
        }

        let native_size = PixelSize::new(width, height);
        let scale = fit_scale(native_size, bounds);
        let canvas_size = PixelSize::new(
            ((width as f32 * scale).round() as u32).max(1),
            ((height as f32 * scale).round() as u32).max(1),
        );

        tracing::debug!(
            native_width = width,
            native_height = height,
            canvas_width = canvas_size.width,
            canvas_height = canvas_size.height,
            "opened editing session"
        );
        Ok(Self {
            base: image,
            native_size,
            canvas_size,
            file_name,
            stack: AnnotationStack::new(),
            viewport: EditorViewport::new(),
            redo_buffer: Vec::new(),
        })
    }

    pub fn native_size(&self) -> PixelSize {
        self.native_size
    }

    pub fn canvas_size(&self) -> PixelSize {
        self.canvas_size
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn annotations(&self) -> &[AnnotationObject] {
        self.stack.objects()
    }

    pub fn active_tool(&self) -> ToolKind {
        self.stack.active_tool()
    }

    pub fn is_drawing_mode(&self) -> bool {
        self.stack.active_tool().begins_drawing()
    }

    /// Activates a tool. Shape and text tools drop a ready-made object on the
    /// canvas and snap back to `Select`, so every activation inserts afresh.
    pub fn activate_tool(&mut self, tool: ToolKind) -> Option<u64> {
        self.stack.select_tool(tool);
        let inserted = match tool {
            ToolKind::Rectangle => Some(self.stack.insert_rectangle(DEFAULT_INSERT_POINT)),
            ToolKind::Ellipse => Some(self.stack.insert_ellipse(DEFAULT_INSERT_POINT)),
            ToolKind::Text => Some(self.stack.insert_text(DEFAULT_INSERT_POINT)),
            ToolKind::Select | ToolKind::Crop | ToolKind::Arrow | ToolKind::Pen
            | ToolKind::Blur => None,
        };
        if let Some(id) = inserted {
            self.stack.select_tool(ToolKind::Select);
            self.redo_buffer.clear();
            tracing::debug!(?tool, id, "inserted annotation on tool activation");
        }
        inserted
    }

    pub fn begin_stroke(&mut self, at: CanvasPoint) -> SessionResult<u64> {
        self.ensure_drawing_mode()?;
        let id = self.stack.begin_stroke(at).map_err(SessionError::Tool)?;
        self.redo_buffer.clear();
        Ok(id)
    }

    pub fn extend_stroke(&mut self, point: CanvasPoint) -> SessionResult<()> {
        self.ensure_drawing_mode()?;
        self.stack.extend_stroke(point).map_err(SessionError::Tool)
    }

    pub fn finish_stroke(&mut self) -> SessionResult<u64> {
        self.ensure_drawing_mode()?;
        self.stack.finish_stroke().map_err(SessionError::Tool)
    }

    fn ensure_drawing_mode(&self) -> SessionResult<()> {
        if self.stack.active_tool().begins_drawing() {
            Ok(())
        } else {
            Err(SessionError::Tool(ToolError::ToolNotSelected))
        }
    }

    pub fn move_object(&mut self, id: u64, dx: f32, dy: f32) -> SessionResult<()> {
        self.stack
            .move_object_by(id, dx, dy)
            .map_err(SessionError::Tool)
    }

    pub fn remove_object(&mut self, id: u64) -> SessionResult<()> {
        self.stack
            .remove_object(id)
            .map(|_| ())
            .map_err(SessionError::Tool)
    }

    pub fn set_text_content(&mut self, id: u64, content: &str) -> SessionResult<()> {
        self.stack
            .set_text_content(id, content)
            .map_err(SessionError::Tool)
    }

    pub fn set_stroke_color(&mut self, color: Rgba) {
        self.stack.set_shared_stroke_color(color);
    }

    pub fn set_stroke_width(&mut self, width: f32) {
        self.stack.set_shared_stroke_width(width);
    }

    pub fn set_text_size(&mut self, size: f32) {
        self.stack.set_text_size(size);
    }

    /// Pops the newest annotation. The base image itself is never undoable.
    pub fn undo(&mut self) -> bool {
        match self.stack.pop_object() {
            Some(object) => {
                self.redo_buffer.push(object);
                true
            }
            None => {
                tracing::debug!("undo requested with no annotations");
                false
            }
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.redo_buffer.pop() {
            Some(object) => {
                self.stack.push_object(object);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.stack.objects().is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_buffer.is_empty()
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn set_zoom_percent(&mut self, zoom_percent: u16) {
        self.viewport.set_zoom_percent(zoom_percent);
    }

    pub fn zoom_percent(&self) -> u16 {
        self.viewport.zoom_percent()
    }

    /// Canvas size after the current zoom, for hosts sizing their widget.
    pub fn display_size(&self) -> PixelSize {
        let factor = f32::from(self.viewport.zoom_percent()) / 100.0;
        PixelSize::new(
            ((self.canvas_size.width as f32 * factor).round() as u32).max(1),
            ((self.canvas_size.height as f32 * factor).round() as u32).max(1),
        )
    }

    /// Canvas-to-native scale applied to annotations when exporting.
    pub fn export_multiplier(&self) -> f32 {
        let width_ratio = self.native_size.width as f32 / self.canvas_size.width as f32;
        let height_ratio = self.native_size.height as f32 / self.canvas_size.height as f32;
        width_ratio.max(height_ratio)
    }

    pub fn export_raster<R: CanvasRenderer>(&self, renderer: &R) -> SessionResult<Vec<u8>> {
        let flattened = self.flatten(renderer)?;
        raster::encode_png(&flattened).map_err(|source| SessionError::ExportEncode { source })
    }

    pub fn export_data_url<R: CanvasRenderer>(&self, renderer: &R) -> SessionResult<String> {
        let flattened = self.flatten(renderer)?;
        raster::encode_png_data_url(&flattened)
            .map_err(|source| SessionError::ExportEncode { source })
    }

    fn flatten<R: CanvasRenderer>(&self, renderer: &R) -> SessionResult<RgbaImage> {
        renderer
            .flatten(&FlattenRequest {
                base: &self.base,
                objects: self.stack.objects(),
                scale: self.export_multiplier(),
                background: CANVAS_BACKGROUND,
            })
            .map_err(|source| SessionError::Flatten { source })
    }

    /// Copies the flattened export to the clipboard. Returns `Ok(false)` when
    /// the host has no clipboard support instead of failing.
    pub fn copy_to_clipboard<R, C>(&self, renderer: &R, clipboard: &C) -> SessionResult<bool>
    where
        R: CanvasRenderer,
        C: ClipboardBackend,
    {
        if !clipboard.is_supported() {
            tracing::info!("clipboard backend unavailable; skipping copy");
            return Ok(false);
        }
        let png = self.export_raster(renderer)?;
        clipboard
            .copy_png(&png)
            .map_err(|source| SessionError::ClipboardWrite { source })?;
        Ok(true)
    }

    pub fn export_file_name(&self) -> String {
        match &self.file_name {
            Some(name) => name.clone(),
            None => format!("edited-image-{}.png", epoch_millis()),
        }
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::clipboard::{ClipboardResult, UnsupportedClipboard};
    use crate::render::SoftwareRenderer;

    struct RecordingClipboard {
        copied: RefCell<Vec<Vec<u8>>>,
    }

    impl RecordingClipboard {
        fn new() -> Self {
            Self {
                copied: RefCell::new(Vec::new()),
            }
        }
    }

    impl ClipboardBackend for RecordingClipboard {
        fn is_supported(&self) -> bool {
            true
        }

        fn copy_png(&self, png_bytes: &[u8]) -> ClipboardResult<()> {
            self.copied.borrow_mut().push(png_bytes.to_vec());
            Ok(())
        }
    }

    fn session_with_base(width: u32, height: u32, bounds: PixelSize) -> EditorSession {
        let base = RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
        EditorSession::from_image(base, None, bounds).expect("session should open")
    }

    #[test]
    fn oversized_source_is_fitted_without_distortion() {
        let session = session_with_base(1000, 800, DEFAULT_CANVAS_BOUNDS);
        assert_eq!(session.canvas_size(), PixelSize::new(750, 600));
        assert_eq!(session.native_size(), PixelSize::new(1000, 800));
    }

    #[test]
    fn small_source_is_never_upscaled() {
        let session = session_with_base(400, 300, DEFAULT_CANVAS_BOUNDS);
        assert_eq!(session.canvas_size(), PixelSize::new(400, 300));
    }

    #[test]
    fn empty_source_is_rejected() {
        let result = EditorSession::from_image(RgbaImage::new(0, 0), None, DEFAULT_CANVAS_BOUNDS);
        assert!(matches!(
            result,
            Err(SessionError::EmptySource {
                width: 0,
                height: 0
            })
        ));
    }

    #[test]
    fn corrupt_data_url_does_not_open_a_session() {
        let result =
            EditorSession::from_data_url("data:image/png;base64,@@@", None, DEFAULT_CANVAS_BOUNDS);
        assert!(matches!(result, Err(SessionError::SourceDecode { .. })));
    }

    #[test]
    fn tool_activation_inserts_exactly_for_shape_and_text_tools() {
        for tool in [
            ToolKind::Select,
            ToolKind::Crop,
            ToolKind::Rectangle,
            ToolKind::Ellipse,
            ToolKind::Arrow,
            ToolKind::Pen,
            ToolKind::Text,
            ToolKind::Blur,
        ] {
            let mut session = session_with_base(400, 300, DEFAULT_CANVAS_BOUNDS);
            let inserted = session.activate_tool(tool);
            assert_eq!(
                inserted.is_some(),
                tool.inserts_object(),
                "{tool:?} insertion mismatch"
            );
            let expected = if tool.inserts_object() {
                ToolKind::Select
            } else {
                tool
            };
            assert_eq!(session.active_tool(), expected, "{tool:?} should settle");
        }
    }

    #[test]
    fn rectangle_activation_drops_default_shape_at_insert_point() {
        let mut session = session_with_base(400, 300, DEFAULT_CANVAS_BOUNDS);
        session.activate_tool(ToolKind::Rectangle);

        let AnnotationObject::Rectangle(rectangle) = &session.annotations()[0] else {
            panic!("expected a rectangle");
        };
        assert_eq!((rectangle.left, rectangle.top), (100.0, 100.0));
        assert_eq!((rectangle.width, rectangle.height), (100.0, 80.0));
    }

    #[test]
    fn repeated_activation_inserts_additional_objects() {
        let mut session = session_with_base(400, 300, DEFAULT_CANVAS_BOUNDS);
        session.activate_tool(ToolKind::Ellipse);
        session.activate_tool(ToolKind::Ellipse);
        assert_eq!(session.annotations().len(), 2);
    }

    #[test]
    fn pen_operations_require_drawing_mode() {
        let mut session = session_with_base(400, 300, DEFAULT_CANVAS_BOUNDS);
        let result = session.begin_stroke(CanvasPoint::new(1.0, 1.0));
        assert!(matches!(
            result,
            Err(SessionError::Tool(ToolError::ToolNotSelected))
        ));

        session.activate_tool(ToolKind::Pen);
        assert!(session.is_drawing_mode());
        session
            .begin_stroke(CanvasPoint::new(1.0, 1.0))
            .expect("begin should succeed");
        session
            .extend_stroke(CanvasPoint::new(2.0, 2.0))
            .expect("extend should succeed");
        session.finish_stroke().expect("finish should succeed");
        assert_eq!(session.annotations().len(), 1);
    }

    #[test]
    fn undo_and_redo_round_trip_annotations() {
        let mut session = session_with_base(400, 300, DEFAULT_CANVAS_BOUNDS);
        session.activate_tool(ToolKind::Rectangle);
        let before = session.annotations().to_vec();

        assert!(session.undo());
        assert!(session.annotations().is_empty());
        assert!(session.can_redo());

        assert!(session.redo());
        assert_eq!(session.annotations(), before.as_slice());
    }

    #[test]
    fn undo_below_zero_is_a_no_op() {
        let mut session = session_with_base(400, 300, DEFAULT_CANVAS_BOUNDS);
        assert!(!session.undo());
        assert!(!session.can_undo());
        assert!(session.annotations().is_empty());
    }

    #[test]
    fn new_annotation_clears_redo_history() {
        let mut session = session_with_base(400, 300, DEFAULT_CANVAS_BOUNDS);
        session.activate_tool(ToolKind::Rectangle);
        session.undo();
        assert!(session.can_redo());

        session.activate_tool(ToolKind::Ellipse);
        assert!(!session.can_redo());
        assert!(!session.redo());
    }

    #[test]
    fn zoom_clamps_to_both_ends_of_the_ladder() {
        let mut session = session_with_base(400, 300, DEFAULT_CANVAS_BOUNDS);
        assert_eq!(session.zoom_percent(), 100);

        for _ in 0..20 {
            session.zoom_in();
        }
        assert_eq!(session.zoom_percent(), ZOOM_MAX_PERCENT);

        for _ in 0..30 {
            session.zoom_out();
        }
        assert_eq!(session.zoom_percent(), ZOOM_MIN_PERCENT);
    }

    #[test]
    fn set_zoom_snaps_to_the_step_grid() {
        let mut session = session_with_base(400, 300, DEFAULT_CANVAS_BOUNDS);
        session.set_zoom_percent(110);
        assert_eq!(session.zoom_percent(), 120);
        session.set_zoom_percent(1000);
        assert_eq!(session.zoom_percent(), ZOOM_MAX_PERCENT);
        session.set_zoom_percent(0);
        assert_eq!(session.zoom_percent(), ZOOM_MIN_PERCENT);
    }

    #[test]
    fn display_size_follows_zoom_but_export_stays_native() {
        let mut session = session_with_base(100, 80, PixelSize::new(50, 40));
        assert_eq!(session.canvas_size(), PixelSize::new(50, 40));

        session.set_zoom_percent(300);
        assert_eq!(session.display_size(), PixelSize::new(150, 120));

        let renderer = SoftwareRenderer::without_font();
        let png = session.export_raster(&renderer).expect("export should succeed");
        let exported = raster::decode_image_bytes(&png).expect("png should decode");
        assert_eq!(exported.dimensions(), (100, 80));
    }

    #[test]
    fn export_multiplier_matches_canvas_to_native_ratio() {
        let session = session_with_base(100, 80, PixelSize::new(50, 40));
        assert_eq!(session.export_multiplier(), 2.0);
    }

    #[test]
    fn undone_annotations_leave_no_trace_in_the_export() {
        let renderer = SoftwareRenderer::without_font();
        let mut session = session_with_base(200, 160, DEFAULT_CANVAS_BOUNDS);
        let clean = session.export_raster(&renderer).expect("export");

        session.activate_tool(ToolKind::Rectangle);
        let annotated = session.export_raster(&renderer).expect("export");
        assert_ne!(clean, annotated);

        session.undo();
        let restored = session.export_raster(&renderer).expect("export");
        assert_eq!(clean, restored);
    }

    #[test]
    fn clipboard_copy_reports_unsupported_hosts_without_failing() {
        let renderer = SoftwareRenderer::without_font();
        let session = session_with_base(40, 30, DEFAULT_CANVAS_BOUNDS);

        let copied = session
            .copy_to_clipboard(&renderer, &UnsupportedClipboard)
            .expect("copy should not fail");
        assert!(!copied);
    }

    #[test]
    fn clipboard_copy_hands_png_bytes_to_the_backend() {
        let renderer = SoftwareRenderer::without_font();
        let session = session_with_base(40, 30, DEFAULT_CANVAS_BOUNDS);
        let clipboard = RecordingClipboard::new();

        let copied = session
            .copy_to_clipboard(&renderer, &clipboard)
            .expect("copy should succeed");
        assert!(copied);

        let recorded = clipboard.copied.borrow();
        assert_eq!(recorded.len(), 1);
        let decoded = raster::decode_image_bytes(&recorded[0]).expect("payload should be png");
        assert_eq!(decoded.dimensions(), (40, 30));
    }

    #[test]
    fn export_file_name_prefers_the_source_name() {
        let base = RgbaImage::from_pixel(10, 10, image::Rgba([0, 0, 0, 255]));
        let session = EditorSession::from_image(
            base,
            Some("shot-7.png".to_string()),
            DEFAULT_CANVAS_BOUNDS,
        )
        .expect("session should open");
        assert_eq!(session.export_file_name(), "shot-7.png");
    }

    #[test]
    fn export_file_name_falls_back_to_timestamped_default() {
        let session = session_with_base(10, 10, DEFAULT_CANVAS_BOUNDS);
        let name = session.export_file_name();
        assert!(name.starts_with("edited-image-"));
        assert!(name.ends_with(".png"));
    }
}
