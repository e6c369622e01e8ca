//! Software flattening of an annotated canvas into a native-resolution raster.

use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};
use image::RgbaImage;
use thiserror::Error;

use crate::editor::tools::AnnotationObject;
use crate::geometry::{CanvasPoint, Rgba};

const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-fonts/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/usr/share/fonts/gnu-free/FreeSans.ttf",
];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("canvas dimensions are empty")]
    EmptyCanvas,
    #[error("invalid flatten scale: {scale}")]
    InvalidScale { scale: f32 },
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// One flatten job: base raster at native size, annotations in canvas
/// coordinates, and the canvas-to-native scale factor.
#[derive(Debug)]
pub struct FlattenRequest<'a> {
    pub base: &'a RgbaImage,
    pub objects: &'a [AnnotationObject],
    pub scale: f32,
    pub background: Rgba,
}

pub trait CanvasRenderer {
    fn flatten(&self, request: &FlattenRequest<'_>) -> RenderResult<RgbaImage>;
}

/// CPU rasterizer; hosts with a native canvas can substitute their own.
#[derive(Debug, Clone)]
pub struct SoftwareRenderer {
    font: Option<FontArc>,
}

impl Default for SoftwareRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self {
            font: resolve_system_font(),
        }
    }

    pub const fn with_font(font: FontArc) -> Self {
        Self { font: Some(font) }
    }

    pub const fn without_font() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }
}

impl CanvasRenderer for SoftwareRenderer {
    fn flatten(&self, request: &FlattenRequest<'_>) -> RenderResult<RgbaImage> {
        if !request.scale.is_finite() || request.scale <= 0.0 {
            return Err(RenderError::InvalidScale {
                scale: request.scale,
            });
        }
        let (width, height) = request.base.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyCanvas);
        }

        let mut output = RgbaImage::from_pixel(
            width,
            height,
            image::Rgba(request.background.channels()),
        );

        for (x, y, pixel) in request.base.enumerate_pixels() {
            blend_pixel(
                &mut output,
                x as i64,
                y as i64,
                Rgba::new(pixel[0], pixel[1], pixel[2], pixel[3]),
            );
        }

        for object in request.objects {
            self.draw_object(&mut output, object, request.scale);
        }

        Ok(output)
    }
}

impl SoftwareRenderer {
    fn draw_object(&self, output: &mut RgbaImage, object: &AnnotationObject, scale: f32) {
        match object {
            AnnotationObject::Rectangle(rectangle) => {
                let options = rectangle.options;
                fill_rect(
                    output,
                    rectangle.left * scale,
                    rectangle.top * scale,
                    rectangle.width * scale,
                    rectangle.height * scale,
                    options.fill,
                );
                stroke_rect(
                    output,
                    rectangle.left * scale,
                    rectangle.top * scale,
                    rectangle.width * scale,
                    rectangle.height * scale,
                    options.stroke_width * scale,
                    options.stroke,
                );
            }
            AnnotationObject::Ellipse(ellipse) => {
                let options = ellipse.options;
                let cx = (ellipse.left + ellipse.rx) * scale;
                let cy = (ellipse.top + ellipse.ry) * scale;
                fill_ellipse(
                    output,
                    cx,
                    cy,
                    ellipse.rx * scale,
                    ellipse.ry * scale,
                    options.fill,
                );
                stroke_ellipse(
                    output,
                    cx,
                    cy,
                    ellipse.rx * scale,
                    ellipse.ry * scale,
                    options.stroke_width * scale,
                    options.stroke,
                );
            }
            AnnotationObject::Pen(stroke) => {
                let thickness = stroke.options.thickness * scale;
                if stroke.points.len() == 1 {
                    let only = scaled_point(stroke.points[0], scale);
                    stroke_segment(output, only, only, thickness, stroke.options.color);
                }
                for pair in stroke.points.windows(2) {
                    stroke_segment(
                        output,
                        scaled_point(pair[0], scale),
                        scaled_point(pair[1], scale),
                        thickness,
                        stroke.options.color,
                    );
                }
            }
            AnnotationObject::Text(text) => {
                let Some(font) = &self.font else {
                    tracing::warn!(id = text.id, "no font available; skipping text annotation");
                    return;
                };
                draw_text(
                    output,
                    font,
                    &text.content,
                    text.left * scale,
                    text.top * scale,
                    text.options.size * scale,
                    text.options.color,
                );
            }
        }
    }
}

fn scaled_point(point: CanvasPoint, scale: f32) -> CanvasPoint {
    CanvasPoint::new(point.x * scale, point.y * scale)
}

fn blend_pixel(image: &mut RgbaImage, x: i64, y: i64, color: Rgba) {
    if color.a == 0 || x < 0 || y < 0 {
        return;
    }
    let (width, height) = image.dimensions();
    if x >= i64::from(width) || y >= i64::from(height) {
        return;
    }

    let pixel = image.get_pixel_mut(x as u32, y as u32);
    let alpha = u32::from(color.a);
    let inverse = 255 - alpha;
    let over = |src: u8, dst: u8| -> u8 {
        ((u32::from(src) * alpha + u32::from(dst) * inverse + 127) / 255) as u8
    };
    pixel[0] = over(color.r, pixel[0]);
    pixel[1] = over(color.g, pixel[1]);
    pixel[2] = over(color.b, pixel[2]);
    pixel[3] = (alpha + u32::from(pixel[3]) * inverse / 255).min(255) as u8;
}

pub(crate) fn fill_rect(
    image: &mut RgbaImage,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    color: Rgba,
) {
    if width <= 0.0 || height <= 0.0 {
        return;
    }
    let x0 = x.round() as i64;
    let y0 = y.round() as i64;
    let x1 = (x + width).round() as i64;
    let y1 = (y + height).round() as i64;
    for py in y0..y1 {
        for px in x0..x1 {
            blend_pixel(image, px, py, color);
        }
    }
}

fn stroke_rect(
    image: &mut RgbaImage,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    thickness: f32,
    color: Rgba,
) {
    if thickness <= 0.0 || width <= 0.0 || height <= 0.0 {
        return;
    }
    let half = thickness * 0.5;
    // Bands are disjoint so translucent strokes never double-blend at corners.
    fill_rect(image, x - half, y - half, width + thickness, thickness, color);
    fill_rect(
        image,
        x - half,
        y + height - half,
        width + thickness,
        thickness,
        color,
    );
    let side_height = height - thickness;
    if side_height > 0.0 {
        fill_rect(image, x - half, y + half, thickness, side_height, color);
        fill_rect(
            image,
            x + width - half,
            y + half,
            thickness,
            side_height,
            color,
        );
    }
}

fn fill_ellipse(image: &mut RgbaImage, cx: f32, cy: f32, rx: f32, ry: f32, color: Rgba) {
    if rx <= 0.0 || ry <= 0.0 {
        return;
    }
    let x0 = (cx - rx).floor() as i64;
    let x1 = (cx + rx).ceil() as i64;
    let y0 = (cy - ry).floor() as i64;
    let y1 = (cy + ry).ceil() as i64;
    for py in y0..=y1 {
        for px in x0..=x1 {
            let dx = (px as f32 + 0.5 - cx) / rx;
            let dy = (py as f32 + 0.5 - cy) / ry;
            if dx * dx + dy * dy <= 1.0 {
                blend_pixel(image, px, py, color);
            }
        }
    }
}

fn stroke_ellipse(
    image: &mut RgbaImage,
    cx: f32,
    cy: f32,
    rx: f32,
    ry: f32,
    thickness: f32,
    color: Rgba,
) {
    if thickness <= 0.0 || rx <= 0.0 || ry <= 0.0 {
        return;
    }
    let half = thickness * 0.5;
    let outer_rx = rx + half;
    let outer_ry = ry + half;
    let inner_rx = rx - half;
    let inner_ry = ry - half;

    let x0 = (cx - outer_rx).floor() as i64;
    let x1 = (cx + outer_rx).ceil() as i64;
    let y0 = (cy - outer_ry).floor() as i64;
    let y1 = (cy + outer_ry).ceil() as i64;
    for py in y0..=y1 {
        for px in x0..=x1 {
            let sample_x = px as f32 + 0.5 - cx;
            let sample_y = py as f32 + 0.5 - cy;
            let outer = ellipse_distance(sample_x, sample_y, outer_rx, outer_ry);
            if outer > 1.0 {
                continue;
            }
            let inside_hole = inner_rx > 0.0
                && inner_ry > 0.0
                && ellipse_distance(sample_x, sample_y, inner_rx, inner_ry) < 1.0;
            if !inside_hole {
                blend_pixel(image, px, py, color);
            }
        }
    }
}

fn ellipse_distance(dx: f32, dy: f32, rx: f32, ry: f32) -> f32 {
    let nx = dx / rx;
    let ny = dy / ry;
    nx * nx + ny * ny
}

fn stroke_segment(
    image: &mut RgbaImage,
    a: CanvasPoint,
    b: CanvasPoint,
    thickness: f32,
    color: Rgba,
) {
    let radius = (thickness * 0.5).max(0.5);
    let x0 = (a.x.min(b.x) - radius).floor() as i64;
    let x1 = (a.x.max(b.x) + radius).ceil() as i64;
    let y0 = (a.y.min(b.y) - radius).floor() as i64;
    let y1 = (a.y.max(b.y) + radius).ceil() as i64;
    let radius_squared = radius * radius;

    for py in y0..=y1 {
        for px in x0..=x1 {
            let sample_x = px as f32 + 0.5;
            let sample_y = py as f32 + 0.5;
            if segment_distance_squared(sample_x, sample_y, a, b) <= radius_squared {
                blend_pixel(image, px, py, color);
            }
        }
    }
}

fn segment_distance_squared(px: f32, py: f32, a: CanvasPoint, b: CanvasPoint) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_squared = dx * dx + dy * dy;
    let t = if length_squared <= f32::EPSILON {
        0.0
    } else {
        (((px - a.x) * dx + (py - a.y) * dy) / length_squared).clamp(0.0, 1.0)
    };
    let nearest_x = a.x + t * dx;
    let nearest_y = a.y + t * dy;
    let offset_x = px - nearest_x;
    let offset_y = py - nearest_y;
    offset_x * offset_x + offset_y * offset_y
}

fn draw_text(
    image: &mut RgbaImage,
    font: &FontArc,
    content: &str,
    left: f32,
    top: f32,
    px_size: f32,
    color: Rgba,
) {
    if px_size <= 0.0 || content.is_empty() {
        return;
    }
    let scaled = font.as_scaled(px_size);
    let line_height = scaled.height();

    for (line_index, line) in content.split('\n').enumerate() {
        let baseline = top + scaled.ascent() + line_index as f32 * line_height;
        let mut cursor_x = left;
        let mut previous: Option<GlyphId> = None;

        for ch in line.chars() {
            let glyph_id = font.glyph_id(ch);
            if let Some(previous) = previous {
                cursor_x += scaled.kern(previous, glyph_id);
            }
            let glyph = glyph_id.with_scale_and_position(px_size, point(cursor_x, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let alpha = (coverage * f32::from(color.a)).round().min(255.0) as u8;
                    if alpha == 0 {
                        return;
                    }
                    blend_pixel(
                        image,
                        (bounds.min.x + gx as f32).round() as i64,
                        (bounds.min.y + gy as f32).round() as i64,
                        Rgba::new(color.r, color.g, color.b, alpha),
                    );
                });
            }
            cursor_x += scaled.h_advance(glyph_id);
            previous = Some(glyph_id);
        }
    }
}

fn resolve_system_font() -> Option<FontArc> {
    for path in SYSTEM_FONT_CANDIDATES {
        let Ok(bytes) = std::fs::read(path) else {
            continue;
        };
        match FontArc::try_from_vec(bytes) {
            Ok(font) => {
                tracing::debug!(path, "loaded annotation font");
                return Some(font);
            }
            Err(err) => {
                tracing::warn!(path, ?err, "failed to parse font file");
            }
        }
    }
    tracing::warn!("no usable system font found; text annotations will not flatten");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::tools::{
        EllipseElement, EllipseOptions, PenOptions, PenStroke, RectangleElement, RectangleOptions,
        TextElement, TextOptions,
    };

    const WHITE: Rgba = Rgba::opaque(255, 255, 255);

    fn opaque_base(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, image::Rgba(color))
    }

    fn flatten(
        base: &RgbaImage,
        objects: &[AnnotationObject],
        scale: f32,
    ) -> RenderResult<RgbaImage> {
        SoftwareRenderer::without_font().flatten(&FlattenRequest {
            base,
            objects,
            scale,
            background: WHITE,
        })
    }

    fn opaque_rectangle(left: f32, top: f32, width: f32, height: f32) -> AnnotationObject {
        AnnotationObject::Rectangle(RectangleElement::new(
            1,
            left,
            top,
            width,
            height,
            RectangleOptions {
                fill: Rgba::opaque(0, 0, 255),
                stroke: Rgba::opaque(0, 0, 255),
                stroke_width: 0.0,
            },
        ))
    }

    #[test]
    fn flatten_rejects_non_positive_or_non_finite_scales() {
        let base = opaque_base(2, 2, [10, 20, 30, 255]);
        assert!(matches!(
            flatten(&base, &[], 0.0),
            Err(RenderError::InvalidScale { scale: _ })
        ));
        assert!(matches!(
            flatten(&base, &[], f32::NAN),
            Err(RenderError::InvalidScale { scale: _ })
        ));
    }

    #[test]
    fn flatten_rejects_empty_base() {
        let base = RgbaImage::new(0, 0);
        assert!(matches!(flatten(&base, &[], 1.0), Err(RenderError::EmptyCanvas)));
    }

    #[test]
    fn flatten_without_annotations_reproduces_opaque_base() {
        let base = opaque_base(4, 3, [200, 50, 25, 255]);
        let output = flatten(&base, &[], 1.0).expect("flatten should succeed");
        assert_eq!(output, base);
    }

    #[test]
    fn flatten_composites_translucent_base_over_background() {
        let base = opaque_base(1, 1, [0, 0, 0, 128]);
        let output = flatten(&base, &[], 1.0).unwrap();
        let pixel = output.get_pixel(0, 0);
        assert_eq!(pixel[0], 127);
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn rectangle_fill_lands_inside_bounds_only() {
        let base = opaque_base(6, 6, [255, 255, 255, 255]);
        let output = flatten(&base, &[opaque_rectangle(1.0, 1.0, 2.0, 2.0)], 1.0).unwrap();

        assert_eq!(output.get_pixel(1, 1)[2], 255);
        assert_eq!(output.get_pixel(2, 2)[2], 255);
        assert_eq!(output.get_pixel(1, 1)[0], 0);
        assert_eq!(*output.get_pixel(0, 0), image::Rgba([255, 255, 255, 255]));
        assert_eq!(*output.get_pixel(3, 3), image::Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn scale_multiplies_annotation_geometry_without_touching_base_size() {
        let base = opaque_base(8, 8, [255, 255, 255, 255]);
        let output = flatten(&base, &[opaque_rectangle(1.0, 1.0, 2.0, 2.0)], 2.0).unwrap();

        assert_eq!(output.dimensions(), (8, 8));
        assert_eq!(output.get_pixel(2, 2)[0], 0);
        assert_eq!(output.get_pixel(5, 5)[0], 0);
        assert_eq!(*output.get_pixel(1, 1), image::Rgba([255, 255, 255, 255]));
        assert_eq!(*output.get_pixel(6, 6), image::Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn translucent_fill_blends_with_base() {
        let base = opaque_base(4, 4, [255, 255, 255, 255]);
        let object = AnnotationObject::Rectangle(RectangleElement::new(
            1,
            0.0,
            0.0,
            4.0,
            4.0,
            RectangleOptions {
                fill: Rgba::new(255, 0, 0, 77),
                stroke: Rgba::opaque(255, 0, 0),
                stroke_width: 0.0,
            },
        ));
        let output = flatten(&base, &[object], 1.0).unwrap();
        let pixel = output.get_pixel(2, 2);

        assert_eq!(pixel[0], 255);
        assert!(pixel[1] < 255 && pixel[1] > 150, "green was {}", pixel[1]);
        assert_eq!(pixel[1], pixel[2]);
    }

    #[test]
    fn ellipse_fill_covers_center_but_not_bounding_corners() {
        let base = opaque_base(12, 12, [255, 255, 255, 255]);
        let object = AnnotationObject::Ellipse(EllipseElement::new(
            1,
            1.0,
            1.0,
            5.0,
            5.0,
            EllipseOptions {
                fill: Rgba::opaque(0, 128, 0),
                stroke: Rgba::opaque(0, 128, 0),
                stroke_width: 0.0,
            },
        ));
        let output = flatten(&base, &[object], 1.0).unwrap();

        assert_eq!(output.get_pixel(6, 6)[1], 128);
        assert_eq!(*output.get_pixel(1, 1), image::Rgba([255, 255, 255, 255]));
        assert_eq!(*output.get_pixel(11, 11), image::Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn pen_stroke_marks_path_but_not_distant_pixels() {
        let base = opaque_base(6, 6, [255, 255, 255, 255]);
        let object = AnnotationObject::Pen(PenStroke {
            id: 1,
            points: vec![CanvasPoint::new(0.5, 2.5), CanvasPoint::new(4.5, 2.5)],
            options: PenOptions {
                color: Rgba::opaque(0, 0, 0),
                thickness: 1.0,
            },
            finalized: true,
        });
        let output = flatten(&base, &[object], 1.0).unwrap();

        assert_eq!(*output.get_pixel(2, 2), image::Rgba([0, 0, 0, 255]));
        assert_eq!(*output.get_pixel(2, 5), image::Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn text_is_skipped_when_no_font_is_available() {
        let base = opaque_base(10, 10, [255, 255, 255, 255]);
        let object = AnnotationObject::Text(TextElement::new(
            1,
            1.0,
            1.0,
            "Edit me",
            TextOptions {
                color: Rgba::opaque(0, 0, 0),
                size: 8.0,
            },
        ));
        let with_text = flatten(&base, &[object], 1.0).unwrap();
        let without = flatten(&base, &[], 1.0).unwrap();
        assert_eq!(with_text, without);
    }
}
