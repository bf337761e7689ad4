#![forbid(unsafe_code)]

//! Quirks-mode SVG normalization and measurement.
//!
//! SVG produced under legacy rendering assumptions often carries wrong or missing
//! `width`/`height`/`viewBox`, ignores `x`/`y` on text, and relies on implicit line breaks and
//! default fonts. [`Pipeline::load`] rewrites such markup into standards-conformant SVG and
//! computes its drawn bounding box through an injected [`MeasurementOracle`].
//!
//! Font lookup/embedding ([`FontResolver`]) and the oracle are collaborators supplied by the
//! caller; the `svgquirk` crate provides `usvg`/`fontdb` backed implementations.

pub mod error;
pub mod fonts;
pub mod measure;
pub mod number;
pub mod pipeline;
pub mod stroke;
pub mod text_quirks;
pub mod tree;

pub use error::{Error, Result};
pub use fonts::{FontResolver, NoopFontResolver};
pub use measure::{Attachment, BoundingBox, Measurement, MeasurementOracle, measure_document};
pub use pipeline::{CachedRaster, Pipeline};
pub use stroke::max_stroke_width;
pub use text_quirks::{QuirksOptions, normalize_text_element, normalize_text_quirks};
pub use tree::{Document, Element, Node, SVG_NS};
