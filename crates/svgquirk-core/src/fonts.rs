use crate::Result;
use crate::tree::Element;

/// Resolves font references in a document tree against whatever font data is available.
///
/// Implementations are shared between pipelines, so both entry points take `&self`.
pub trait FontResolver {
    /// Resolves `font-family` references in place.
    fn resolve(&self, root: &mut Element) -> Result<()>;

    /// Returns a copy of `root` with the referenced fonts inlined as embedded data. `root`
    /// itself is left untouched.
    fn embed(&self, root: &Element) -> Result<Element>;
}

/// Leaves trees as they are. Used when no font data is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFontResolver;

impl FontResolver for NoopFontResolver {
    fn resolve(&self, _root: &mut Element) -> Result<()> {
        Ok(())
    }

    fn embed(&self, root: &Element) -> Result<Element> {
        Ok(root.clone())
    }
}
