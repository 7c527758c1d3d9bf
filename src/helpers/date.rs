//! Date helper functions

use chrono::{DateTime, Locale, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::SiteConfig;

/// Format a date with month and weekday names taken from `locale`
pub fn format_date_localized<Tz: TimeZone>(
    date: &DateTime<Tz>,
    format: &str,
    locale: Locale,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let chrono_format = moment_to_chrono_format(format);
    date.format_localized(&chrono_format, locale).to_string()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Parse a POSIX locale name such as `pt_BR`, falling back to `en_US`
pub fn parse_locale(name: &str) -> Locale {
    Locale::try_from(name.replace('-', "_").as_str()).unwrap_or_else(|_| {
        tracing::warn!("Unknown locale {:?}, using en_US", name);
        Locale::en_US
    })
}

/// Publication-date formatter with the site's fixed pattern, locale and zone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    format: String,
    locale: Locale,
    tz: Tz,
}

impl DateFormatter {
    pub fn new(format: &str, locale: Locale, tz: Tz) -> Self {
        Self {
            format: format.to_string(),
            locale,
            tz,
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(&config.date_format, parse_locale(&config.locale), config.tz())
    }

    /// Display form, e.g. `15 mar 2021`
    pub fn format(&self, date: &DateTime<Utc>) -> String {
        format_date_localized(&date.with_timezone(&self.tz), &self.format, self.locale)
    }

    /// Machine-readable form for `<time datetime="...">`
    pub fn datetime(&self, date: &DateTime<Utc>) -> String {
        date_xml(&date.with_timezone(&self.tz))
    }
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    // Longest patterns first within each unit
    let replacements = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("DDDD", "%j"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("ZZ", "%z"),
        ("SSS", "%3f"),
    ];

    let mut result = format.to_string();

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}
