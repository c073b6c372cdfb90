//! Status text formatting and persistence.
//!
//! Turns compiled [`StatusRow`]s into the plain-text lines consumed by the
//! display and writes them to a status file.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::model::StatusRow;

pub const HEADER_PREFIX: &str = "# generated at ";
pub const NO_DATA: &str = "No realtime data";
pub const NO_STATIONS: &str = "No stations requested.";

/// Formats one row, e.g. `Grove Street (PATH) JSQ-33: 5 min to 33rd St`.
///
/// Overdue arrivals display as `0 min`.
pub fn format_status_line(row: &StatusRow) -> String {
    let label = format!("{} {}", row.display_label.trim(), row.route_token.trim());
    let label = label.trim();

    let detail = match row.minutes_until_arrival {
        None => NO_DATA.to_string(),
        Some(minutes) => {
            let minutes = minutes.max(0);
            match row.destination.as_deref().map(str::trim) {
                Some(destination) if !destination.is_empty() => {
                    format!("{minutes} min to {destination}")
                }
                _ => format!("{minutes} min"),
            }
        }
    };

    format!("{label}: {detail}")
}

/// Formats all rows, optionally preceded by a `# generated at` header.
///
/// `timestamp` defaults to now.
pub fn render_status_lines(
    rows: &[StatusRow],
    include_timestamp: bool,
    timestamp: Option<DateTime<Utc>>,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len() + 1);

    if include_timestamp {
        let stamp = timestamp
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Secs, false);
        lines.push(format!("{HEADER_PREFIX}{stamp}"));
    }

    lines.extend(rows.iter().map(format_status_line));

    if rows.is_empty() {
        lines.push(NO_STATIONS.to_string());
    }

    lines
}

/// Writes the rendered rows to `path`, creating parent directories.
///
/// `timestamp` stamps the header as in [`render_status_lines`]. Returns the path written.
pub fn write_status_file(
    path: impl AsRef<Path>,
    rows: &[StatusRow],
    include_timestamp: bool,
    timestamp: Option<DateTime<Utc>>,
) -> Result<PathBuf> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let lines = render_status_lines(rows, include_timestamp, timestamp);
    debug!(path = %path.display(), lines = lines.len(), "Writing status file");

    let mut contents = lines.join("\n");
    contents.push('\n');
    std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), rows = rows.len(), "Status file written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;

    fn row(label: &str, route: &str, minutes: Option<i64>, destination: Option<&str>) -> StatusRow {
        StatusRow {
            display_label: label.to_string(),
            route_token: route.to_string(),
            minutes_until_arrival: minutes,
            destination: destination.map(str::to_string),
            station_key: None,
            arrival_time: None,
        }
    }

    #[test]
    fn test_format_line_with_destination() {
        let line = format_status_line(&row("Grove Street (PATH)", "JSQ-33", Some(5), Some("33rd St")));
        assert_eq!(line, "Grove Street (PATH) JSQ-33: 5 min to 33rd St");
    }

    #[test]
    fn test_format_line_without_data_or_destination() {
        assert_eq!(
            format_status_line(&row("33rd Street", "JSQ-33", None, Some(""))),
            "33rd Street JSQ-33: No realtime data"
        );
        assert_eq!(format_status_line(&row("23 St", "F", Some(3), Some("  "))), "23 St F: 3 min");
    }

    #[test]
    fn test_format_line_clamps_overdue_minutes() {
        assert_eq!(
            format_status_line(&row("23 St", "F", Some(-4), Some("Coney"))),
            "23 St F: 0 min to Coney"
        );
    }

    #[test]
    fn test_render_with_timestamp_header() {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rows = vec![
            row("23 St", "F", Some(3), Some("Coney")),
            row("33rd Street", "JSQ-33", None, None),
        ];

        let lines = render_status_lines(&rows, true, Some(timestamp));
        assert_eq!(lines[0], "# generated at 2024-01-01T00:00:00+00:00");
        assert_eq!(lines[1], "23 St F: 3 min to Coney");
        assert_eq!(lines[2], "33rd Street JSQ-33: No realtime data");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_status_lines(&[], false, None), vec![NO_STATIONS.to_string()]);
    }

    #[test]
    fn test_write_status_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("status.txt");
        let rows = vec![
            row("23 St", "F", Some(3), Some("Coney")),
            row("33rd Street", "JSQ-33", None, None),
        ];

        let written = write_status_file(&path, &rows, false, None).unwrap();
        assert_eq!(written, path);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "23 St F: 3 min to Coney\n33rd Street JSQ-33: No realtime data\n");
    }

    #[test]
    fn test_write_status_file_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.txt");

        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        write_status_file(&path, &[], true, Some(timestamp)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let expected = render_status_lines(&[], true, Some(timestamp));
        assert_eq!(contents.lines().collect::<Vec<_>>(), expected);
        assert_eq!(expected[0], "# generated at 2024-01-01T00:00:00+00:00");
        assert_eq!(expected[1], NO_STATIONS);
    }
}
