use crate::fonts::{FontResolver, NoopFontResolver};
use crate::measure::{Measurement, MeasurementOracle, measure_document};
use crate::text_quirks::{QuirksOptions, normalize_text_quirks};
use crate::tree::{Document, SVG_NS};
use crate::{Error, Result};
use std::sync::Arc;

/// Decoded pixels for the current document, kept by the [`Pipeline`] on behalf of a raster
/// consumer. Cleared whenever a new document is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRaster {
    pub width: u32,
    pub height: u32,
    /// Effective scale (`device_pixel_ratio * scale`) the pixels were rendered at.
    pub scale: f32,
    pub background: Option<String>,
    /// Premultiplied RGBA8.
    pub pixels: Vec<u8>,
}

/// Load → normalize text → resolve fonts → measure, with the result swapped in only when every
/// step succeeds.
///
/// A pipeline is single-threaded: `load` must not be called concurrently on one instance.
/// Independent instances share nothing but the font resolver and may run on separate threads.
pub struct Pipeline {
    oracle: Box<dyn MeasurementOracle + Send>,
    fonts: Arc<dyn FontResolver + Send + Sync>,
    options: QuirksOptions,
    document: Option<Document>,
    measurement: Measurement,
    cached_raster: Option<CachedRaster>,
}

impl Pipeline {
    pub fn new(oracle: impl MeasurementOracle + Send + 'static) -> Self {
        Self {
            oracle: Box::new(oracle),
            fonts: Arc::new(NoopFontResolver),
            options: QuirksOptions::default(),
            document: None,
            measurement: Measurement::default(),
            cached_raster: None,
        }
    }

    pub fn with_font_resolver(mut self, fonts: Arc<dyn FontResolver + Send + Sync>) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn with_options(mut self, options: QuirksOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &QuirksOptions {
        &self.options
    }

    /// Parses, normalizes and measures `markup`, replacing the current document on success.
    ///
    /// On failure the previously loaded document and measurement stay current. The cached
    /// raster is dropped either way.
    pub fn load(&mut self, markup: &str) -> Result<()> {
        self.cached_raster = None;

        let mut doc = Document::parse(markup)?;
        let root = doc.root_mut();
        if !root.name().contains(':') && !root.has_attr("xmlns") {
            root.prepend_attr("xmlns", SVG_NS);
        }

        let normalized = normalize_text_quirks(root, &self.options)?;
        self.fonts.resolve(root)?;
        tracing::debug!(text_elements = normalized, "normalized text quirks");

        let (doc, measurement) = measure_document(&doc, self.oracle.as_mut())?;
        self.document = Some(doc);
        self.measurement = measurement;
        Ok(())
    }

    /// Loads `markup` and returns its measurement.
    pub fn measure(&mut self, markup: &str) -> Result<Measurement> {
        self.load(markup)?;
        Ok(self.measurement)
    }

    /// Serializes the current document. With `embed_fonts`, fonts are inlined into a copy; the
    /// pipeline's own document is never touched.
    pub fn serialize(&self, embed_fonts: bool) -> Result<String> {
        let doc = self.document.as_ref().ok_or(Error::NotLoaded)?;
        if embed_fonts {
            let embedded = self.fonts.embed(doc.root())?;
            Document::from_root(embedded).to_markup()
        } else {
            doc.to_markup()
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn current_measurement(&self) -> Measurement {
        self.measurement
    }

    /// `(width, height)` of the last measurement; zeros before the first successful load.
    pub fn current_size(&self) -> (f64, f64) {
        self.measurement.size()
    }

    /// `(x, y)` of the last measurement; zeros before the first successful load.
    pub fn current_offset(&self) -> (f64, f64) {
        self.measurement.offset()
    }

    pub fn cached_raster(&self) -> Option<&CachedRaster> {
        self.cached_raster.as_ref()
    }

    pub fn store_raster(&mut self, raster: CachedRaster) -> &CachedRaster {
        self.cached_raster.insert(raster)
    }
}
