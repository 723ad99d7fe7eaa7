//! Display formatting for points and elapsed times.

use chrono::Duration;

/// Render a point amount with thousands separators, e.g. `1,250pt`.
pub fn format_points(points: i64) -> String {
    let digits = points.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if points < 0 {
        format!("-{grouped}pt")
    } else {
        format!("{grouped}pt")
    }
}

/// Render an elapsed duration as `now`, `5m ago`, `3h ago` or `2d ago`.
///
/// Anything under a minute, or negative, is `now`.
pub fn relative_time(elapsed: Duration) -> String {
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        "now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if minutes < 60 * 24 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        format!("{}d ago", elapsed.num_days())
    }
}
