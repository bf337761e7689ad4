use crate::fontdb::Database;
use crate::fonts::text_font_resolver;
use std::sync::Arc;
use svgquirk_core::{BoundingBox, Document, Error, MeasurementOracle, Result};

/// Measurement oracle that builds a `usvg` render tree and reports its fill-only bounds.
///
/// The attached copy has the root `width`/`height`/`viewBox` removed, so bounds come back in
/// the document's own user units rather than in viewport units.
pub struct UsvgOracle {
    fontdb: Arc<Database>,
    font_family: String,
    attached: Option<Attached>,
}

struct Attached {
    bounds: Option<usvg::Rect>,
}

impl UsvgOracle {
    pub fn new(fontdb: Arc<Database>) -> Self {
        Self {
            fontdb,
            font_family: "Helvetica".to_string(),
            attached: None,
        }
    }

    /// Family `usvg` falls back to for text without a `font-family`.
    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }
}

impl MeasurementOracle for UsvgOracle {
    fn attach(&mut self, document: &Document) -> Result<()> {
        let mut root = document.root().clone();
        for name in ["width", "height", "viewBox"] {
            root.remove_attr(name);
        }
        let markup = Document::from_root(root).to_markup()?;

        let mut opt = usvg::Options::default();
        opt.fontdb = self.fontdb.clone();
        opt.font_family = self.font_family.clone();
        opt.font_resolver = text_font_resolver(&self.font_family);
        let tree = usvg::Tree::from_str(&markup, &opt)
            .map_err(|e| Error::measurement(format!("failed to build render tree: {e}")))?;

        let root = tree.root();
        let bounds = root.has_children().then(|| root.abs_bounding_box());
        self.attached = Some(Attached { bounds });
        Ok(())
    }

    fn bounding_box(&self) -> Result<BoundingBox> {
        let attached = self
            .attached
            .as_ref()
            .ok_or_else(|| Error::measurement("no document attached"))?;
        let rect = attached
            .bounds
            .ok_or_else(|| Error::measurement("document has no drawable content"))?;
        Ok(BoundingBox {
            x: f64::from(rect.x()),
            y: f64::from(rect.y()),
            width: f64::from(rect.width()),
            height: f64::from(rect.height()),
        })
    }

    fn detach(&mut self) {
        self.attached = None;
    }
}
