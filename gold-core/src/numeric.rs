use serde_json::Value;

/// Coerce a loosely typed JSON value into a finite `f64`.
///
/// Accepts JSON numbers and numeric strings. Empty strings, `null`, booleans
/// and anything that is not finite yield `None`.
pub fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                None
            } else {
                text.parse::<f64>().ok()
            }
        }
        _ => None,
    }?;

    parsed.is_finite().then_some(parsed)
}

/// Round to two decimal places; `None` if the result is not finite.
pub fn round_to_two(value: f64) -> Option<f64> {
    let rounded = (value * 100.0).round() / 100.0;
    rounded.is_finite().then_some(rounded)
}
