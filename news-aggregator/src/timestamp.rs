//! Publish-date resolution for feed items.
//!
//! Feeds in the wild disagree on date encodings, so a raw value is tried
//! against [`LAYOUTS`] in order and the first successful parse wins.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123Offset,
    /// `Mon, 02 Jan 2006 15:04:05 MST`
    Rfc1123Zone,
    /// `02 Jan 06 15:04 -0700`
    Rfc822Offset,
    /// `02 Jan 06 15:04 MST`
    Rfc822Zone,
    /// `2006-01-02T15:04:05Z07:00`
    Rfc3339,
}

pub const LAYOUTS: [DateLayout; 5] = [
    DateLayout::Rfc1123Offset,
    DateLayout::Rfc1123Zone,
    DateLayout::Rfc822Offset,
    DateLayout::Rfc822Zone,
    DateLayout::Rfc3339,
];

// The weekday prefix is checked for shape only; feeds often get it wrong.
const RFC1123_FORMAT: &str = "%d %b %Y %H:%M:%S";
const RFC822_FORMAT: &str = "%d %b %y %H:%M";

impl DateLayout {
    pub fn parse(self, raw: &str) -> Option<DateTime<Utc>> {
        match self {
            DateLayout::Rfc1123Offset => parse_with_offset(strip_weekday(raw)?, RFC1123_FORMAT),
            DateLayout::Rfc1123Zone => parse_with_zone(strip_weekday(raw)?, RFC1123_FORMAT),
            DateLayout::Rfc822Offset => parse_with_offset(raw, RFC822_FORMAT),
            DateLayout::Rfc822Zone => parse_with_zone(raw, RFC822_FORMAT),
            DateLayout::Rfc3339 => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// Resolve a raw publish date, falling back to the current time when no
/// layout matches. Never fails.
pub fn resolve_published(raw: &str) -> DateTime<Utc> {
    parse_published(raw).unwrap_or_else(Utc::now)
}

pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    LAYOUTS.iter().find_map(|layout| layout.parse(raw))
}

fn strip_weekday(raw: &str) -> Option<&str> {
    let (day, rest) = raw.split_once(", ")?;
    if day.len() == 3 && day.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(rest)
    } else {
        None
    }
}

fn parse_with_offset(raw: &str, format: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, &format!("{} %z", format))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_with_zone(raw: &str, format: &str) -> Option<DateTime<Utc>> {
    let (rest, zone) = raw.rsplit_once(' ')?;
    let offset = zone_offset(zone)?;
    let naive = NaiveDateTime::parse_from_str(rest, format).ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Offsets for the zone abbreviations RFC 822 names. Any other alphabetic
/// abbreviation is read as UTC; anything non-alphabetic is rejected.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    if zone.is_empty() || zone.len() > 5 || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let hours = match zone.to_ascii_uppercase().as_str() {
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}
