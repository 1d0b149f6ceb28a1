//! Human-readable time and progress formatting
//!
//! Used by front ends to render `PlayerView` values.

/// Clock format switch point (seconds): below this, `M:SS`; at or above, `H:MM:SS`
const HOUR: u64 = 3600;

/// Width of the text progress bar when callers don't specify one
pub const DEFAULT_BAR_WIDTH: usize = 20;

/// Format whole seconds as a player clock.
///
/// - Under one hour: `M:SS`
/// - One hour or more: `H:MM:SS`
///
/// # Examples
///
/// ```
/// use goon_common::human_time::format_clock;
///
/// assert_eq!(format_clock(0), "0:00");
/// assert_eq!(format_clock(212), "3:32");
/// assert_eq!(format_clock(3661), "1:01:01");
/// ```
pub fn format_clock(seconds: u64) -> String {
    if seconds < HOUR {
        format!("{}:{:02}", seconds / 60, seconds % 60)
    } else {
        let hours = seconds / HOUR;
        let mins = (seconds % HOUR) / 60;
        let secs = seconds % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }
}

/// Format `elapsed / duration`, or `elapsed / ?:??` when the duration is unknown.
///
/// # Examples
///
/// ```
/// use goon_common::human_time::format_position;
///
/// assert_eq!(format_position(13.7, Some(212)), "0:13 / 3:32");
/// assert_eq!(format_position(75.0, None), "1:15 / ?:??");
/// ```
pub fn format_position(elapsed_secs: f64, duration_secs: Option<u64>) -> String {
    let elapsed = elapsed_secs.max(0.0).floor() as u64;
    match duration_secs {
        Some(total) => format!("{} / {}", format_clock(elapsed), format_clock(total)),
        None => format!("{} / ?:??", format_clock(elapsed)),
    }
}

/// Render a text progress bar.
///
/// `None` renders an indeterminate indicator instead of a computed bar, since
/// a fraction cannot be derived without a known duration.
///
/// # Examples
///
/// ```
/// use goon_common::human_time::progress_bar;
///
/// assert_eq!(progress_bar(Some(0.5), 10), "[=====-----]");
/// assert_eq!(progress_bar(None, 10), "[~~~live~~~]");
/// ```
pub fn progress_bar(fraction: Option<f64>, width: usize) -> String {
    match fraction {
        Some(f) => {
            let f = if f.is_nan() { 0.0 } else { f.clamp(0.0, 1.0) };
            let filled = (f * width as f64).round() as usize;
            format!("[{}{}]", "=".repeat(filled), "-".repeat(width - filled))
        }
        None => {
            let label = "live";
            if width < label.len() {
                return format!("[{}]", "~".repeat(width));
            }
            let left = (width - label.len()) / 2;
            let right = width - label.len() - left;
            format!("[{}{}{}]", "~".repeat(left), label, "~".repeat(right))
        }
    }
}
