//! Date helper functions

use anyhow::Result;
use chrono::{DateTime, Locale, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Formats timestamps for display
pub trait FormatDate: Send + Sync {
    /// Format `date` with a date-fns style pattern (e.g. `dd MMM yyyy`)
    fn format(&self, date: &DateTime<Utc>, pattern: &str) -> String;
}

/// Options recognized by [`LocaleDateFormatter`]
#[derive(Debug, Clone, Default)]
pub struct DateFormatOptions<'a> {
    /// Locale identifier, `pt_BR` or `pt-BR`
    pub locale: &'a str,
    /// IANA timezone name, empty for UTC
    pub timezone: &'a str,
}

/// Locale-aware formatter with month and weekday names from `chrono`
#[derive(Debug, Clone, Copy)]
pub struct LocaleDateFormatter {
    locale: Locale,
    timezone: Option<Tz>,
}

impl LocaleDateFormatter {
    pub fn new(options: DateFormatOptions<'_>) -> Result<Self> {
        let name = options.locale.replace('-', "_");
        let locale = Locale::try_from(name.as_str())
            .map_err(|_| anyhow::anyhow!("Unknown locale: {}", options.locale))?;

        let timezone = if options.timezone.is_empty() {
            None
        } else {
            let tz = options
                .timezone
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("Unknown timezone {}: {}", options.timezone, e))?;
            Some(tz)
        };

        Ok(Self { locale, timezone })
    }
}

impl FormatDate for LocaleDateFormatter {
    fn format(&self, date: &DateTime<Utc>, pattern: &str) -> String {
        match self.timezone {
            Some(tz) => format_localized(&date.with_timezone(&tz), pattern, self.locale),
            None => format_localized(date, pattern, self.locale),
        }
    }
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}

fn format_localized<Z: TimeZone>(date: &DateTime<Z>, pattern: &str, locale: Locale) -> String
where
    Z::Offset: std::fmt::Display,
{
    let chrono_format = date_fns_to_chrono_format(pattern, date.hour());
    date.format_localized(&chrono_format, locale).to_string()
}

/// Convert a date-fns format pattern to a chrono format string.
///
/// Text inside single quotes is literal (`''` is a quote). The `k` hour
/// (1-24) has no chrono equivalent, so it is written out from `hour`.
fn date_fns_to_chrono_format(pattern: &str, hour: u32) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut result = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                result.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        result.push('\'');
                        i += 2;
                        continue;
                    }
                    break;
                }
                push_literal(&mut result, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut result, c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        i += run;

        let kday_hour = if hour == 0 { 24 } else { hour };
        let field = match (c, run) {
            ('y', 2) => "%y".to_string(),
            ('y', _) => "%Y".to_string(),
            ('M', 1) => "%-m".to_string(),
            ('M', 2) => "%m".to_string(),
            ('M', 3) => "%b".to_string(),
            ('M', _) => "%B".to_string(),
            ('d', 1) => "%-d".to_string(),
            ('d', _) => "%d".to_string(),
            ('E', 1..=3) => "%a".to_string(),
            ('E', _) => "%A".to_string(),
            ('H', 1) => "%-H".to_string(),
            ('H', _) => "%H".to_string(),
            ('h', 1) => "%-I".to_string(),
            ('h', _) => "%I".to_string(),
            ('k', 1) => kday_hour.to_string(),
            ('k', _) => format!("{:02}", kday_hour),
            ('m', 1) => "%-M".to_string(),
            ('m', _) => "%M".to_string(),
            ('s', 1) => "%-S".to_string(),
            ('s', _) => "%S".to_string(),
            ('a', _) => "%p".to_string(),
            _ => std::iter::repeat(c).take(run).collect(),
        };
        result.push_str(&field);
    }

    result
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}
