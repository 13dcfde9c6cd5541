//! `LIST` output parsing
//!
//! `LIST` output is not standardised. Two formats cover nearly every server:
//!
//! - Unix `ls -l`: `drwxr-xr-x 2 ftp ftp 4096 Mar  5 14:22 name`
//! - MS-DOS: `03-05-24  02:22PM       <DIR>          name`
//!
//! Lines in neither format (such as `total 12`) are skipped.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

use ftpseek_common::{EntryKind, RemoteEntry};

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Parse a whole `LIST` response body
pub(crate) fn parse_listing(body: &str) -> Vec<RemoteEntry> {
    parse_listing_at(body, Utc::now())
}

/// Parse a `LIST` response body, resolving year-less dates relative to `now`
pub(crate) fn parse_listing_at(body: &str, now: DateTime<Utc>) -> Vec<RemoteEntry> {
    body.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| parse_unix_line(line, now).or_else(|| parse_dos_line(line)))
        .filter(|entry| entry.name != "." && entry.name != "..")
        .collect()
}

/// Whitespace-separated tokens with their byte offsets
fn tokens(line: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (idx, ch) in line.char_indices() {
        if ch.is_whitespace() {
            if let Some(begin) = start.take() {
                out.push((begin, &line[begin..idx]));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(begin) = start {
        out.push((begin, &line[begin..]));
    }
    out
}

fn month_number(token: &str) -> Option<u32> {
    let lower = token.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|month| *month == lower)
        .and_then(|idx| u32::try_from(idx + 1).ok())
}

fn parse_unix_line(line: &str, now: DateTime<Utc>) -> Option<RemoteEntry> {
    let tokens = tokens(line);
    let (_, perms) = *tokens.first()?;
    if perms.len() < 10 || !matches!(perms.as_bytes()[0], b'-' | b'd' | b'l' | b'b' | b'c' | b'p' | b's') {
        return None;
    }

    // Owner and group columns vary between servers; anchor on the month,
    // which always follows the size
    let month_idx = (2..tokens.len().saturating_sub(3)).find(|&idx| {
        month_number(tokens[idx].1).is_some() && tokens[idx - 1].1.parse::<u64>().is_ok()
    })?;

    let size = tokens[month_idx - 1].1.parse::<u64>().ok()?;
    let month = month_number(tokens[month_idx].1)?;
    let day = tokens[month_idx + 1].1.parse::<u32>().ok()?;
    let modified = unix_timestamp(month, day, tokens[month_idx + 2].1, now);

    let (name_start, _) = tokens[month_idx + 3];
    let raw_name = &line[name_start..];

    let (name, kind) = match perms.as_bytes()[0] {
        b'd' => (raw_name, EntryKind::Directory),
        b'l' => match raw_name.split_once(" -> ") {
            Some((name, target)) => (
                name,
                EntryKind::Link {
                    target: target.to_string(),
                },
            ),
            None => (
                raw_name,
                EntryKind::Link {
                    target: String::new(),
                },
            ),
        },
        _ => (raw_name, EntryKind::File),
    };

    Some(RemoteEntry {
        name: name.to_string(),
        kind,
        size,
        modified,
    })
}

/// `Mon DD HH:MM` (within the last year) or `Mon DD YYYY`
fn unix_timestamp(month: u32, day: u32, time_or_year: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some((hour, minute)) = time_or_year.split_once(':') {
        let time = NaiveTime::from_hms_opt(hour.parse().ok()?, minute.parse().ok()?, 0)?;
        let mut date = NaiveDate::from_ymd_opt(now.year(), month, day)?;
        // Year-less dates are at most six months old; anything ahead of now
        // belongs to last year
        if date.and_time(time).and_utc() > now + chrono::Duration::days(1) {
            date = NaiveDate::from_ymd_opt(now.year() - 1, month, day)?;
        }
        Some(date.and_time(time).and_utc())
    } else {
        let year = time_or_year.parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(date.and_time(NaiveTime::MIN).and_utc())
    }
}

fn parse_dos_line(line: &str) -> Option<RemoteEntry> {
    let tokens = tokens(line);
    if tokens.len() < 4 {
        return None;
    }

    let date = parse_dos_date(tokens[0].1)?;
    let time = parse_dos_time(tokens[1].1)?;
    let (kind, size) = if tokens[2].1.eq_ignore_ascii_case("<DIR>") {
        (EntryKind::Directory, 0)
    } else {
        (EntryKind::File, tokens[2].1.parse::<u64>().ok()?)
    };

    let (name_start, _) = tokens[3];
    Some(RemoteEntry {
        name: line[name_start..].to_string(),
        kind,
        size,
        modified: Some(date.and_time(time).and_utc()),
    })
}

/// `MM-DD-YY` or `MM-DD-YYYY`
fn parse_dos_date(token: &str) -> Option<NaiveDate> {
    let mut parts = token.split('-');
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    let year_part = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let year: i32 = year_part.parse().ok()?;
    let year = match year_part.len() {
        2 if year < 70 => 2000 + year,
        2 => 1900 + year,
        4 => year,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `HH:MMAM` / `HH:MMPM`
fn parse_dos_time(token: &str) -> Option<NaiveTime> {
    if token.len() < 6 || !token.is_char_boundary(token.len() - 2) {
        return None;
    }
    let (clock, meridiem) = token.split_at(token.len() - 2);
    let (hour, minute) = clock.split_once(':')?;
    let mut hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if hour == 0 || hour > 12 {
        return None;
    }

    match meridiem.to_ascii_uppercase().as_str() {
        "AM" if hour == 12 => hour = 0,
        "AM" => {}
        "PM" if hour == 12 => {}
        "PM" => hour += 12,
        _ => return None,
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}
