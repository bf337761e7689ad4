#![forbid(unsafe_code)]

use crate::fontdb::Database;
use crate::fonts::text_font_resolver;
use std::sync::Arc;
use svgquirk_core::{CachedRaster, Measurement, Pipeline};

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error(transparent)]
    Pipeline(#[from] svgquirk_core::Error),
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("invalid background color for JPG rendering")]
    JpegBackground,
    #[error("JPG rendering requires an opaque background color (e.g. white)")]
    JpegOpaqueBackgroundRequired,
    #[error("failed to encode JPG")]
    JpegEncode,
}

pub type Result<T> = std::result::Result<T, RasterError>;

#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub scale: f32,
    pub device_pixel_ratio: f32,
    pub background: Option<String>,
    pub jpeg_quality: u8,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            device_pixel_ratio: 1.0,
            background: None,
            jpeg_quality: 90,
        }
    }
}

impl RasterOptions {
    fn effective_scale(&self) -> f32 {
        self.scale * self.device_pixel_ratio
    }
}

/// Renders a pipeline's current document to pixels, caching the result on the pipeline.
pub struct Rasterizer {
    fontdb: Arc<Database>,
    font_family: String,
}

impl Rasterizer {
    pub fn new(fontdb: Arc<Database>) -> Self {
        Self {
            fontdb,
            font_family: "Helvetica".to_string(),
        }
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    /// Returns the pipeline's cached raster, rendering it first if there is none for these
    /// options.
    pub fn raster<'p>(
        &self,
        pipeline: &'p mut Pipeline,
        options: &RasterOptions,
    ) -> Result<&'p CachedRaster> {
        let scale = options.effective_scale();
        let reusable = pipeline
            .cached_raster()
            .is_some_and(|c| c.scale == scale && c.background == options.background);
        if !reusable {
            let svg = pipeline.serialize(true)?;
            let measurement = pipeline.current_measurement();
            let pixmap = self.render_pixmap(
                &svg,
                &measurement,
                scale,
                options.background.as_deref(),
            )?;
            tracing::debug!(
                width = pixmap.width(),
                height = pixmap.height(),
                scale,
                "rasterized document"
            );
            pipeline.store_raster(CachedRaster {
                width: pixmap.width(),
                height: pixmap.height(),
                scale,
                background: options.background.clone(),
                pixels: pixmap.take(),
            });
        }
        pipeline
            .cached_raster()
            .ok_or(RasterError::Pipeline(svgquirk_core::Error::NotLoaded))
    }

    pub fn png(&self, pipeline: &mut Pipeline, options: &RasterOptions) -> Result<Vec<u8>> {
        let raster = self.raster(pipeline, options)?;
        raster_to_png(raster)
    }

    pub fn jpeg(&self, pipeline: &mut Pipeline, options: &RasterOptions) -> Result<Vec<u8>> {
        let bg = options.background.as_deref().unwrap_or("white");
        let Some(color) = parse_tiny_skia_color(bg) else {
            return Err(RasterError::JpegBackground);
        };
        if color.alpha() != 1.0 {
            return Err(RasterError::JpegOpaqueBackgroundRequired);
        }
        let options = RasterOptions {
            background: Some(bg.to_string()),
            ..options.clone()
        };
        let raster = self.raster(pipeline, &options)?;
        raster_to_jpeg(raster, options.jpeg_quality)
    }

    fn render_pixmap(
        &self,
        svg: &str,
        measurement: &Measurement,
        scale: f32,
        background: Option<&str>,
    ) -> Result<tiny_skia::Pixmap> {
        let mut opt = usvg::Options::default();
        opt.fontdb = self.fontdb.clone();
        opt.font_family = self.font_family.clone();
        opt.font_resolver = text_font_resolver(&self.font_family);

        let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| RasterError::SvgParse)?;

        // The normalized root carries `width`/`height`/`viewBox` equal to the measurement, so
        // `usvg` already maps the viewBox min corner to (0,0); only the scale is applied here.
        let width_px = (measurement.width as f32 * scale).ceil().max(1.0) as u32;
        let height_px = (measurement.height as f32 * scale).ceil().max(1.0) as u32;

        let mut pixmap =
            tiny_skia::Pixmap::new(width_px, height_px).ok_or(RasterError::PixmapAlloc)?;

        if let Some(bg) = background {
            if let Some(color) = parse_tiny_skia_color(bg) {
                pixmap.fill(color);
            }
        }

        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap.as_mut(),
        );
        Ok(pixmap)
    }
}

fn raster_pixmap(raster: &CachedRaster) -> Result<tiny_skia::Pixmap> {
    let size = tiny_skia::IntSize::from_wh(raster.width, raster.height)
        .ok_or(RasterError::PixmapAlloc)?;
    tiny_skia::Pixmap::from_vec(raster.pixels.clone(), size).ok_or(RasterError::PixmapAlloc)
}

pub fn raster_to_png(raster: &CachedRaster) -> Result<Vec<u8>> {
    raster_pixmap(raster)?
        .encode_png()
        .map_err(|_| RasterError::PngEncode)
}

/// Encodes an opaque raster as JPG. Alpha is dropped.
pub fn raster_to_jpeg(raster: &CachedRaster, quality: u8) -> Result<Vec<u8>> {
    let (w, h) = (raster.width, raster.height);

    // tiny-skia renders into an RGBA8 buffer. When the destination is opaque (we always fill a
    // solid background for JPG), the alpha channel is always 255 and can be dropped safely.
    let mut rgb = vec![0u8; (w as usize) * (h as usize) * 3];
    for (src, dst) in raster.pixels.chunks_exact(4).zip(rgb.chunks_exact_mut(3)) {
        dst[0] = src[0];
        dst[1] = src[1];
        dst[2] = src[2];
    }

    let mut out = Vec::new();
    let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
    enc.encode(&rgb, w, h, image::ExtendedColorType::Rgb8)
        .map_err(|_| RasterError::JpegEncode)?;
    Ok(out)
}

fn parse_tiny_skia_color(text: &str) -> Option<tiny_skia::Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 0)),
        "white" => return Some(tiny_skia::Color::from_rgba8(255, 255, 255, 255)),
        "black" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 255)),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    fn hex2(b: &[u8]) -> Option<u8> {
        let hi = (*b.first()? as char).to_digit(16)? as u8;
        let lo = (*b.get(1)? as char).to_digit(16)? as u8;
        Some((hi << 4) | lo)
    }
    fn hex1(c: u8) -> Option<u8> {
        let v = (c as char).to_digit(16)? as u8;
        Some((v << 4) | v)
    }

    let bytes = hex.as_bytes();
    match bytes.len() {
        3 => Some(tiny_skia::Color::from_rgba8(
            hex1(bytes[0])?,
            hex1(bytes[1])?,
            hex1(bytes[2])?,
            255,
        )),
        4 => Some(tiny_skia::Color::from_rgba8(
            hex1(bytes[0])?,
            hex1(bytes[1])?,
            hex1(bytes[2])?,
            hex1(bytes[3])?,
        )),
        6 => Some(tiny_skia::Color::from_rgba8(
            hex2(&bytes[0..2])?,
            hex2(&bytes[2..4])?,
            hex2(&bytes[4..6])?,
            255,
        )),
        8 => Some(tiny_skia::Color::from_rgba8(
            hex2(&bytes[0..2])?,
            hex2(&bytes[2..4])?,
            hex2(&bytes[4..6])?,
            hex2(&bytes[6..8])?,
        )),
        _ => None,
    }
}
