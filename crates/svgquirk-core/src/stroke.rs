use crate::number::parse_leading_number;
use crate::tree::Element;

/// Largest effective stroke width over `root` and all of its descendants.
///
/// Per element: an explicit `stroke-width` counts as its numeric value (malformed or negative
/// values count as 0); otherwise a bare `stroke` counts as 1; otherwise 0.
pub fn max_stroke_width(root: &Element) -> f64 {
    root.descendants()
        .map(effective_stroke_width)
        .fold(0.0, f64::max)
}

pub fn effective_stroke_width(el: &Element) -> f64 {
    match (el.attr("stroke"), el.attr("stroke-width")) {
        (_, Some(width)) => parse_stroke_width(width),
        (Some(_), None) => 1.0,
        (None, None) => 0.0,
    }
}

fn parse_stroke_width(raw: &str) -> f64 {
    match parse_leading_number(raw) {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Document;

    fn max_of(svg: &str) -> f64 {
        max_stroke_width(Document::parse(svg).unwrap().root())
    }

    #[test]
    fn no_stroke_attributes_is_zero() {
        assert_eq!(max_of(r#"<svg><rect width="10" height="10"/></svg>"#), 0.0);
    }

    #[test]
    fn bare_stroke_implies_one() {
        assert_eq!(max_of(r#"<svg><rect stroke="red"/></svg>"#), 1.0);
    }

    #[test]
    fn explicit_width_wins_over_implied() {
        assert_eq!(
            max_of(r#"<svg><rect stroke="red" stroke-width="0.25"/></svg>"#),
            0.25
        );
        assert_eq!(max_of(r#"<svg><rect stroke-width="3px"/></svg>"#), 3.0);
    }

    #[test]
    fn malformed_or_negative_widths_count_as_zero() {
        assert_eq!(
            max_of(r#"<svg><rect stroke="red" stroke-width="wide"/></svg>"#),
            0.0
        );
        assert_eq!(max_of(r#"<svg><rect stroke-width="-4"/></svg>"#), 0.0);
    }

    #[test]
    fn root_and_nested_elements_are_visited() {
        assert_eq!(max_of(r#"<svg stroke-width="5"><rect/></svg>"#), 5.0);
        assert_eq!(
            max_of(r#"<svg><g><g><path stroke-width="7"/></g></g><rect stroke="b"/></svg>"#),
            7.0
        );
    }
}
