use chrono::{DateTime, TimeZone, Utc};

/// Human-friendly age of an epoch-millisecond timestamp relative to `now`.
///
/// `just now`, `5m ago`, `3h ago`, `2d ago`, then `Mar 4` from a week on.
/// Missing or zero timestamps render as an empty string; timestamps in the
/// future count as `just now`.
pub fn format_relative_time<Tz: TimeZone>(pub_date_ms: Option<i64>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let Some(ms) = pub_date_ms.filter(|&ms| ms != 0) else {
        return String::new();
    };
    let Some(then) = DateTime::<Utc>::from_timestamp_millis(ms) else {
        return String::new();
    };

    let diff_ms = now.timestamp_millis() - ms;
    let mins = diff_ms.div_euclid(60_000);
    let hours = diff_ms.div_euclid(3_600_000);
    let days = diff_ms.div_euclid(86_400_000);

    if mins < 1 {
        "just now".to_string()
    } else if mins < 60 {
        format!("{}m ago", mins)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        then.with_timezone(&now.timezone()).format("%b %-d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap()
    }

    fn ago(secs: i64) -> Option<i64> {
        Some(now().timestamp_millis() - secs * 1000)
    }

    #[test]
    fn buckets() {
        assert_eq!(format_relative_time(ago(30), &now()), "just now");
        assert_eq!(format_relative_time(ago(5 * 60), &now()), "5m ago");
        assert_eq!(format_relative_time(ago(59 * 60 + 59), &now()), "59m ago");
        assert_eq!(format_relative_time(ago(3 * 3600), &now()), "3h ago");
        assert_eq!(format_relative_time(ago(2 * 86_400), &now()), "2d ago");
        assert_eq!(format_relative_time(ago(8 * 86_400), &now()), "Mar 12");
    }

    #[test]
    fn missing_and_future() {
        assert_eq!(format_relative_time(None, &now()), "");
        assert_eq!(format_relative_time(Some(0), &now()), "");
        assert_eq!(format_relative_time(ago(-600), &now()), "just now");
    }
}
