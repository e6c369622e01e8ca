//! Screenshot acquisition behind a backend seam.

use std::time::{SystemTime, UNIX_EPOCH};

use image::RgbaImage;
use thiserror::Error;

use crate::geometry::{PixelSize, Rgba};
use crate::raster::{self, RasterError};
use crate::render;

pub const PLACEHOLDER_WIDTH: u32 = 1200;
pub const PLACEHOLDER_HEIGHT: u32 = 800;

const GRADIENT_START: [u8; 3] = [139, 92, 246];
const GRADIENT_END: [u8; 3] = [6, 182, 212];
const PANEL_COLOR: Rgba = Rgba::new(255, 255, 255, 26);
const PANEL_LEFT: f32 = 100.0;
const PANEL_TOP: f32 = 100.0;
const PANEL_WIDTH: f32 = 1000.0;
const PANEL_HEIGHT: f32 = 600.0;

/// One captured frame, already encoded for the editor handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureArtifact {
    pub data_url: String,
    pub file_name: String,
    pub dimensions: PixelSize,
    pub created_at: u64,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture backend unavailable: {message}")]
    BackendUnavailable { message: String },
    #[error("failed to encode captured frame")]
    Encode {
        #[source]
        source: RasterError,
    },
}

pub trait ScreenshotBackend {
    fn capture(&self) -> Result<CaptureArtifact, CaptureError>;
}

/// Deterministic stand-in frame used until a real compositor grab lands.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderCapture;

impl ScreenshotBackend for PlaceholderCapture {
    fn capture(&self) -> Result<CaptureArtifact, CaptureError> {
        let frame = placeholder_frame();
        let data_url = raster::encode_png_data_url(&frame)
            .map_err(|source| CaptureError::Encode { source })?;
        let created_at = epoch_millis();

        tracing::debug!(created_at, "produced placeholder capture frame");
        Ok(CaptureArtifact {
            data_url,
            file_name: format!("screenshot-{created_at}.png"),
            dimensions: PixelSize::new(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT),
            created_at,
        })
    }
}

fn placeholder_frame() -> RgbaImage {
    let mut frame = RgbaImage::new(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT);
    let span = (PLACEHOLDER_WIDTH + PLACEHOLDER_HEIGHT - 2) as f32;
    for (x, y, pixel) in frame.enumerate_pixels_mut() {
        let t = (x + y) as f32 / span;
        *pixel = image::Rgba([
            lerp_channel(GRADIENT_START[0], GRADIENT_END[0], t),
            lerp_channel(GRADIENT_START[1], GRADIENT_END[1], t),
            lerp_channel(GRADIENT_START[2], GRADIENT_END[2], t),
            255,
        ]);
    }
    render::fill_rect(
        &mut frame,
        PANEL_LEFT,
        PANEL_TOP,
        PANEL_WIDTH,
        PANEL_HEIGHT,
        PANEL_COLOR,
    );
    frame
}

fn lerp_channel(start: u8, end: u8, t: f32) -> u8 {
    (f32::from(start) + (f32::from(end) - f32::from(start)) * t).round() as u8
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
