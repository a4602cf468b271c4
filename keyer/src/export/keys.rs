use chrono::{DateTime, TimeZone, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";

/// `"{date}/{stamp}{suffix}"` for the export started at `started_ms`. Out of
/// range timestamps use the current time; both parts always come from the
/// same instant.
fn dated_key(started_ms: i64, suffix: &str) -> String {
    let at: DateTime<Utc> = Utc
        .timestamp_millis_opt(started_ms)
        .single()
        .unwrap_or_else(Utc::now);
    format!(
        "{date}/{stamp}{suffix}",
        date = at.format(DATE_FORMAT),
        stamp = at.format(STAMP_FORMAT),
    )
}

/// Relative path of an exported animation.
/// e.g. "2026-10-19/20261019T093000000Z.gif"
pub fn gif_key(started_ms: i64) -> String {
    dated_key(started_ms, ".gif")
}

/// Relative directory for the PNG sequence of one export, next to its GIF.
/// e.g. "2026-10-19/20261019T093000000Z_frames"
pub fn frames_dir_key(started_ms: i64) -> String {
    dated_key(started_ms, "_frames")
}

pub fn frame_file_name(seq: u64) -> String {
    format!("frame_{seq:06}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        // 2026-02-18T09:30:00.000Z
        let start = 1771407000000i64;

        let k = gif_key(start);
        assert_eq!(k, "2026-02-18/20260218T093000000Z.gif");

        let d = frames_dir_key(start);
        assert_eq!(d, "2026-02-18/20260218T093000000Z_frames");

        assert_eq!(frame_file_name(7), "frame_000007.png");
    }

    #[test]
    fn out_of_range_timestamp_uses_now() {
        let k = gif_key(i64::MAX);
        let (date, file) = k.split_once('/').unwrap();
        assert_eq!(date.len(), 10);
        assert_eq!(date.replace('-', ""), file[..8]);
        assert!(file.ends_with("Z.gif"));
    }
}
