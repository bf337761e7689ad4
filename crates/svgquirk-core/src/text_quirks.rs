//! Rewrites `<text>` elements so a standards-conformant renderer draws them the way the legacy
//! quirks-mode renderer did.

use crate::Result;
use crate::number::fmt_number;
use crate::tree::Element;

/// Values injected by the text quirks pass.
#[derive(Debug, Clone, PartialEq)]
pub struct QuirksOptions {
    pub default_font_size: f64,
    pub default_font_family: String,
    pub alignment_baseline: String,
    pub line_tag: String,
    pub line_anchor_x: f64,
    pub line_advance: String,
}

impl Default for QuirksOptions {
    fn default() -> Self {
        Self {
            default_font_size: 14.0,
            default_font_family: "Helvetica".to_string(),
            alignment_baseline: "text-before-edge".to_string(),
            line_tag: "tspan".to_string(),
            line_anchor_x: 0.0,
            line_advance: "1.2em".to_string(),
        }
    }
}

/// Normalizes every `text` element under (and including) `root`. Returns how many were touched.
pub fn normalize_text_quirks(root: &mut Element, options: &QuirksOptions) -> Result<usize> {
    let mut count = 0usize;
    root.walk_mut(&mut |el| {
        if el.is("text") {
            normalize_text_element(el, options)?;
            count += 1;
        }
        Ok(())
    })?;
    Ok(count)
}

/// Normalizes a single `text` element in place. Running it twice is a no-op the second time.
pub fn normalize_text_element(el: &mut Element, options: &QuirksOptions) -> Result<()> {
    // The legacy renderer always drew text at the origin.
    el.remove_attr("x");
    el.remove_attr("y");
    el.set_attr("alignment-baseline", options.alignment_baseline.as_str());
    if !el.has_attr("font-size") {
        el.set_attr("font-size", fmt_number(options.default_font_size));
    }
    if !el.has_attr("font-family") {
        el.set_attr("font-family", options.default_font_family.as_str());
    }

    // Elements with explicit line children carry no direct text; their layout is already right.
    let Some(content) = el.take_text()? else {
        return Ok(());
    };
    let anchor_x = fmt_number(options.line_anchor_x);
    for line in split_lines(&content) {
        let mut node = Element::new(options.line_tag.as_str());
        node.set_attr("x", anchor_x.as_str());
        node.set_attr("dy", options.line_advance.as_str());
        node.set_text(line)?;
        el.append_child(node)?;
    }
    Ok(())
}

fn split_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}
