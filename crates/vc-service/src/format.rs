//! Human-readable durations and timestamps for notices.

use chrono::{DateTime, FixedOffset, Utc};

const JST_OFFSET_SECONDS: i32 = 9 * 3600;

/// Format seconds as `"{h}時間{m}分{s}秒"`.
///
/// Hours are omitted when zero. Minutes are omitted when zero unless
/// both hours and seconds are present. Seconds always appear.
#[must_use]
pub fn fmt_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;

    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}時間"));
    }
    if m > 0 || (h > 0 && s > 0) {
        out.push_str(&format!("{m}分"));
    }
    out.push_str(&format!("{s}秒"));
    out
}

/// Format a timestamp in Japan Standard Time, e.g. `"3月7日 09:05"`.
#[must_use]
pub fn fmt_jst(at: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(JST_OFFSET_SECONDS) {
        Some(jst) => at.with_timezone(&jst).format("%-m月%-d日 %H:%M").to_string(),
        None => at.format("%-m月%-d日 %H:%M UTC").to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fmt_duration_seconds_only() {
        assert_eq!(fmt_duration(0), "0秒");
        assert_eq!(fmt_duration(42), "42秒");
    }

    #[test]
    fn test_fmt_duration_minutes() {
        assert_eq!(fmt_duration(330), "5分30秒");
        assert_eq!(fmt_duration(600), "10分0秒");
    }

    #[test]
    fn test_fmt_duration_hours() {
        assert_eq!(fmt_duration(3723), "1時間2分3秒");
        assert_eq!(fmt_duration(3600), "1時間0秒");
        assert_eq!(fmt_duration(3601), "1時間0分1秒");
        assert_eq!(fmt_duration(3660), "1時間1分0秒");
    }

    #[test]
    fn test_fmt_duration_negative_clamps() {
        assert_eq!(fmt_duration(-5), "0秒");
    }

    #[test]
    fn test_fmt_jst_shifts_nine_hours() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 0, 5, 0).unwrap();
        assert_eq!(fmt_jst(at), "3月7日 09:05");

        let late = Utc.with_ymd_and_hms(2024, 12, 31, 20, 30, 0).unwrap();
        assert_eq!(fmt_jst(late), "1月1日 05:30");
    }
}
