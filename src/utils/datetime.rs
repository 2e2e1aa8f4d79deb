use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp for storage. Fixed precision and a `Z` suffix so the
/// stored strings compare lexicographically in the same order as the
/// instants they represent.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored RFC 3339 timestamp back into UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

/// Human-readable form for admin notices.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%A, %B %d, %Y at %H:%M UTC").to_string()
}
