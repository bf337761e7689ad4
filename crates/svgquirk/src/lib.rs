#![forbid(unsafe_code)]

//! `svgquirk` normalizes SVG written under legacy quirks-mode rendering assumptions into
//! standards-conformant SVG, and measures the true drawn bounds of the result.
//!
//! The pipeline itself lives in `svgquirk-core` and is re-exported here. This crate adds the
//! concrete collaborators:
//! - [`UsvgOracle`]: measurement oracle backed by `usvg`
//! - [`FontdbResolver`]: font lookup and base64 `@font-face` embedding backed by `fontdb`
//!
//! # Features
//!
//! - `raster`: PNG/JPG output of the normalized document via `resvg` (`svgquirk::raster`)

pub use svgquirk_core::*;

pub mod fonts;
pub mod oracle;

#[cfg(feature = "raster")]
pub mod raster;

pub use fonts::{FontdbResolver, install_generic_fallbacks, text_font_resolver};
pub use oracle::UsvgOracle;
pub use usvg::fontdb;

use std::sync::Arc;

/// Loads the system font database once, for sharing between the oracle, the font resolver and
/// the rasterizer. Generic families are remapped to installed faces where the defaults are
/// missing.
pub fn system_fontdb() -> Arc<fontdb::Database> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    fonts::install_generic_fallbacks(&mut db);
    tracing::debug!(faces = db.len(), "loaded system fonts");
    Arc::new(db)
}

/// Pipeline wired to `usvg` measurement and `fontdb` font resolution over one shared database.
pub fn headless_pipeline(db: Arc<fontdb::Database>) -> Pipeline {
    Pipeline::new(UsvgOracle::new(db.clone()))
        .with_font_resolver(Arc::new(FontdbResolver::new(db)))
}
