use serde_json::Value;

/// Canonical string key for a raw seat/roll-number cell.
///
/// Spreadsheets hand integers back as floats, so `3`, `3.0`, `"3.0"` and
/// `"3.0000"` all become `"3"`. Text that is not an integer with a zero
/// fraction is returned trimmed but otherwise untouched.
pub fn normalize_seat_id(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 => format!("{:.0}", f),
                    _ => n.to_string(),
                }
            }
        }
        Value::String(s) => normalize_seat_str(s),
        other => normalize_seat_str(&other.to_string()),
    }
}

pub fn normalize_seat_str(raw: &str) -> String {
    let t = raw.trim();
    let Some((whole, frac)) = t.split_once('.') else {
        return t.to_string();
    };
    let digits = whole.strip_prefix('-').unwrap_or(whole);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return t.to_string();
    }
    if !frac.chars().all(|c| c == '0') {
        return t.to_string();
    }
    whole.to_string()
}
