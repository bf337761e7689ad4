// Number formatting and parsing for attribute values.

/// Stringifies a number the way a JS engine's `Number#toString()` would, which is what the
/// legacy producer wrote into `width`/`height`/`viewBox`.
///
/// Non-finite values become `0`, `-0` becomes `0`, and float noise within `1e-9` of an integer
/// is snapped so repeated measure passes do not drift in the last digit.
pub fn fmt_number(v: f64) -> String {
    let mut buf = ryu_js::Buffer::new();
    js_number_to_string(v, &mut buf).to_string()
}

fn js_number_to_string(mut v: f64, buf: &mut ryu_js::Buffer) -> &str {
    if !v.is_finite() {
        return "0";
    }
    let nearest = v.round();
    if (v - nearest).abs() < 1e-9 {
        v = nearest;
    }
    if v == -0.0 {
        v = 0.0;
    }
    buf.format_finite(v)
}

/// Parses the leading numeric prefix of `s` (after leading whitespace), like JS `parseFloat`.
///
/// `"2px"` yields `2`, `"1e1"` yields `10`, `"abc"` yields `None`.
pub fn parse_leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0usize;
    let mut best = None;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let mut saw_digit = false;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        saw_digit = true;
    }
    if saw_digit {
        best = Some(end);
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            saw_digit = true;
        }
        if saw_digit {
            best = Some(end);
        }
    }
    if saw_digit && end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            best = Some(exp_end);
        }
    }

    let end = best?;
    s[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_have_no_fraction() {
        assert_eq!(fmt_number(14.0), "14");
        assert_eq!(fmt_number(-0.0), "0");
        assert_eq!(fmt_number(0.5), "0.5");
        assert_eq!(fmt_number(f64::NAN), "0");
        assert_eq!(fmt_number(101.00000000001), "101");
    }

    #[test]
    fn leading_number_matches_parse_float() {
        assert_eq!(parse_leading_number("2px"), Some(2.0));
        assert_eq!(parse_leading_number("  .5"), Some(0.5));
        assert_eq!(parse_leading_number("3."), Some(3.0));
        assert_eq!(parse_leading_number("1e1"), Some(10.0));
        assert_eq!(parse_leading_number("4e"), Some(4.0));
        assert_eq!(parse_leading_number("-7"), Some(-7.0));
        assert_eq!(parse_leading_number("abc"), None);
        assert_eq!(parse_leading_number(""), None);
        assert_eq!(parse_leading_number("-"), None);
    }
}
