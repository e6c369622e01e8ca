//! PNG and data-URL codec helpers shared by the capture, history, and export paths.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use image::imageops::FilterType;
use image::{ImageFormat, RgbaImage};
use thiserror::Error;

use crate::geometry::{fit_scale, PixelSize};

const DATA_URL_SCHEME: &str = "data:";
const DATA_URL_BASE64_MARKER: &str = ";base64,";
const IMAGE_MIME_PREFIX: &str = "image/";
const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("data url is not a base64-encoded image")]
    UnsupportedDataUrl,
    #[error("unsupported image format: {format:?}")]
    UnsupportedFormat { format: ImageFormat },
    #[error("failed to decode base64 payload: {source}")]
    Base64Decode {
        #[source]
        source: base64::DecodeError,
    },
    #[error("failed to decode image bytes: {source}")]
    ImageDecode {
        #[source]
        source: image::ImageError,
    },
    #[error("failed to encode png: {source}")]
    PngEncode {
        #[source]
        source: image::ImageError,
    },
}

pub type RasterResult<T> = std::result::Result<T, RasterError>;

pub fn encode_png(image: &RgbaImage) -> RasterResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|source| RasterError::PngEncode { source })?;
    Ok(bytes)
}

pub fn encode_png_data_url(image: &RgbaImage) -> RasterResult<String> {
    let bytes = encode_png(image)?;
    Ok(format!(
        "{PNG_DATA_URL_PREFIX}{}",
        BASE64_STANDARD.encode(bytes)
    ))
}

/// Wraps already-encoded image bytes in a data url without re-encoding them.
pub fn data_url_from_bytes(bytes: &[u8]) -> RasterResult<String> {
    let format =
        image::guess_format(bytes).map_err(|source| RasterError::ImageDecode { source })?;
    let mime = mime_for_format(format)?;
    Ok(format!(
        "{DATA_URL_SCHEME}{mime}{DATA_URL_BASE64_MARKER}{}",
        BASE64_STANDARD.encode(bytes)
    ))
}

pub fn decode_image_bytes(bytes: &[u8]) -> RasterResult<RgbaImage> {
    let image =
        image::load_from_memory(bytes).map_err(|source| RasterError::ImageDecode { source })?;
    Ok(image.to_rgba8())
}

pub fn decode_data_url(data_url: &str) -> RasterResult<RgbaImage> {
    decode_image_bytes(&data_url_payload(data_url)?)
}

/// Raw encoded bytes behind a data url, without decoding the raster itself.
pub fn data_url_payload(data_url: &str) -> RasterResult<Vec<u8>> {
    let encoded = split_image_data_url(data_url).ok_or(RasterError::UnsupportedDataUrl)?;
    BASE64_STANDARD
        .decode(encoded)
        .map_err(|source| RasterError::Base64Decode { source })
}

pub fn probe_data_url_dimensions(data_url: &str) -> RasterResult<PixelSize> {
    let image = decode_data_url(data_url)?;
    Ok(PixelSize::new(image.width(), image.height()))
}

/// Shrinks `image` to fit inside `bounds`, preserving aspect ratio; never enlarges.
pub fn resize_to_fit(image: &RgbaImage, bounds: PixelSize) -> RgbaImage {
    let source = PixelSize::new(image.width(), image.height());
    let scale = fit_scale(source, bounds);
    if scale >= 1.0 {
        return image.clone();
    }
    let width = ((source.width as f32 * scale).round() as u32).max(1);
    let height = ((source.height as f32 * scale).round() as u32).max(1);
    image::imageops::resize(image, width, height, FilterType::Triangle)
}

fn split_image_data_url(data_url: &str) -> Option<&str> {
    let rest = data_url.strip_prefix(DATA_URL_SCHEME)?;
    let (mime, encoded) = rest.split_once(DATA_URL_BASE64_MARKER)?;
    if !mime.starts_with(IMAGE_MIME_PREFIX) {
        return None;
    }
    Some(encoded)
}

fn mime_for_format(format: ImageFormat) -> RasterResult<&'static str> {
    match format {
        ImageFormat::Png => Ok("image/png"),
        ImageFormat::Jpeg => Ok("image/jpeg"),
        ImageFormat::Gif => Ok("image/gif"),
        ImageFormat::WebP => Ok("image/webp"),
        ImageFormat::Bmp => Ok("image/bmp"),
        other => Err(RasterError::UnsupportedFormat { format: other }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([12, 34, 56, 255]))
    }

    #[test]
    fn png_data_url_roundtrips_pixels_and_dimensions() {
        let image = sample_image(6, 4);
        let data_url = encode_png_data_url(&image).expect("encode should succeed");
        assert!(data_url.starts_with(PNG_DATA_URL_PREFIX));

        let decoded = decode_data_url(&data_url).expect("decode should succeed");
        assert_eq!(decoded.dimensions(), (6, 4));
        assert_eq!(decoded.get_pixel(3, 2), image.get_pixel(3, 2));
    }

    #[test]
    fn probe_reports_dimensions_without_exposing_pixels() {
        let data_url = encode_png_data_url(&sample_image(9, 7)).unwrap();
        let size = probe_data_url_dimensions(&data_url).expect("probe should succeed");
        assert_eq!(size, PixelSize::new(9, 7));
    }

    #[test]
    fn data_url_from_bytes_tags_png_mime() {
        let bytes = encode_png(&sample_image(2, 2)).unwrap();
        let data_url = data_url_from_bytes(&bytes).expect("wrap should succeed");
        assert!(data_url.starts_with(PNG_DATA_URL_PREFIX));
    }

    #[test]
    fn decode_rejects_non_image_data_urls() {
        let err = decode_data_url("data:text/plain;base64,aGVsbG8=")
            .expect_err("text payload should be rejected");
        assert!(matches!(err, RasterError::UnsupportedDataUrl));
    }

    #[test]
    fn decode_rejects_corrupt_base64() {
        let err = decode_data_url("data:image/png;base64,@@not-base64@@")
            .expect_err("corrupt payload should be rejected");
        assert!(matches!(err, RasterError::Base64Decode { source: _ }));
    }

    #[test]
    fn decode_rejects_valid_base64_of_garbage_bytes() {
        let payload = BASE64_STANDARD.encode(b"definitely not an image");
        let err = decode_data_url(&format!("data:image/png;base64,{payload}"))
            .expect_err("garbage bytes should fail image decode");
        assert!(matches!(err, RasterError::ImageDecode { source: _ }));
    }

    #[test]
    fn resize_to_fit_shrinks_along_the_limiting_axis() {
        let resized = resize_to_fit(&sample_image(1000, 800), PixelSize::new(800, 600));
        assert_eq!(resized.dimensions(), (750, 600));
    }

    #[test]
    fn resize_to_fit_leaves_small_images_untouched() {
        let image = sample_image(300, 200);
        let resized = resize_to_fit(&image, PixelSize::new(800, 600));
        assert_eq!(resized.dimensions(), (300, 200));
    }
}
