//! Shortest text for a float at a fixed number of significant digits,
//! as printf's `%g` writes it. Downstream tools were written against
//! tables in this form.

/// `value` rounded to `digits` significant digits. Trailing zeros are
/// dropped, very large and very small magnitudes use an exponent.
pub fn significant(value: f64, digits: usize) -> String {
    let digits = digits.max(1);
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_owned();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }

    // the exponent after rounding, 9.9999999999999999 becomes 1e1
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .expect("exponent format always contains an e");
    let exponent: i32 = exponent.parse().expect("exponent is an integer");

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let precision = (digits as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.precision$}")).to_owned()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
