use crate::number::fmt_number;
use crate::stroke::max_stroke_width;
use crate::tree::Document;
use crate::{Error, Result};
use serde::Serialize;

/// Tight fill-only box reported by a [`MeasurementOracle`], in document user units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Offset and size of the drawable content of a document, stroke included.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Measurement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Measurement {
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn offset(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn view_box(&self) -> String {
        format!(
            "{} {} {} {}",
            fmt_number(self.x),
            fmt_number(self.y),
            fmt_number(self.width),
            fmt_number(self.height)
        )
    }
}

/// A rendering engine that can report the tight bounding box of an attached document.
///
/// Attachment is stateful: callers go through [`Attachment`], which detaches on drop, rather
/// than calling `attach`/`detach` directly.
pub trait MeasurementOracle {
    fn attach(&mut self, document: &Document) -> Result<()>;

    /// Fails with [`Error::MeasurementFailure`] when nothing drawable is attached.
    fn bounding_box(&self) -> Result<BoundingBox>;

    fn detach(&mut self);
}

/// Scoped attachment of a document to an oracle. Detaches when dropped, including on early
/// returns and failed attaches.
pub struct Attachment<'a> {
    oracle: &'a mut dyn MeasurementOracle,
}

impl<'a> Attachment<'a> {
    pub fn new(oracle: &'a mut dyn MeasurementOracle, document: &Document) -> Result<Self> {
        let attachment = Self { oracle };
        attachment.oracle.attach(document)?;
        Ok(attachment)
    }

    pub fn bounding_box(&self) -> Result<BoundingBox> {
        self.oracle.bounding_box()
    }
}

impl Drop for Attachment<'_> {
    fn drop(&mut self) {
        self.oracle.detach();
    }
}

/// Measures `document` and returns a freshly parsed copy carrying the computed `width`,
/// `height` and `viewBox` on its root, together with the [`Measurement`].
///
/// The input document is never mutated: the oracle may leave an attached tree unusable, so the
/// result is rebuilt from the markup captured before attaching.
pub fn measure_document(
    document: &Document,
    oracle: &mut dyn MeasurementOracle,
) -> Result<(Document, Measurement)> {
    let markup = document.to_markup()?;

    let bbox = {
        let attachment = Attachment::new(oracle, document)?;
        attachment.bounding_box()?
    };
    if ![bbox.x, bbox.y, bbox.width, bbox.height]
        .iter()
        .all(|v| v.is_finite())
        || bbox.width < 0.0
        || bbox.height < 0.0
    {
        return Err(Error::measurement(format!(
            "oracle returned an unusable box: {bbox:?}"
        )));
    }

    let mut fresh = Document::parse(&markup).map_err(|e| {
        Error::malformed(format!("document did not re-parse after measurement: {e}"))
    })?;

    let half = max_stroke_width(fresh.root()) / 2.0;
    let measurement = Measurement {
        x: bbox.x - half,
        y: bbox.y - half,
        width: bbox.width + 2.0 * half,
        height: bbox.height + 2.0 * half,
    };
    tracing::debug!(?bbox, stroke_half = half, ?measurement, "measured document");

    let root = fresh.root_mut();
    root.set_attr("width", fmt_number(measurement.width));
    root.set_attr("height", fmt_number(measurement.height));
    root.set_attr("viewBox", measurement.view_box());

    Ok((fresh, measurement))
}
