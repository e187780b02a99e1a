use chrono::{DateTime, Datelike, FixedOffset};

const MONTHS_PT_BR: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Parses the API's timestamps, which use `+0000` rather than RFC 3339's
/// `+00:00`.
pub fn parse(date: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(date))
        .ok()
}

/// `dd MMM yyyy` with Portuguese month abbreviations, e.g. `25 mar 2021`.
/// Unparseable input yields `None`.
pub fn format_publication_date(date: &str) -> Option<String> {
    let date = parse(date)?;
    Some(format!(
        "{:02} {} {}",
        date.day(),
        MONTHS_PT_BR[date.month0() as usize],
        date.year()
    ))
}
