// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2024 Tobias Hunger <tobias.hunger@gmail.com>

use chrono::NaiveDate;

/// Separates the fields of one log line
///
/// Author names and subjects may contain it as well: The date is the first
/// field after the author that parses as one.
pub(crate) const FIELD_SEPARATOR: char = '|';
/// Wraps each log line
pub(crate) const LINE_QUOTE: char = '\'';

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One commit as reported by the log of a repository
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogRecord {
    hash: String,
    user: String,
    date: NaiveDate,
    message: String,
}

impl LogRecord {
    /// The short commit identifier
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The author's display name
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The first line of the commit message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

fn unquote(line: &str) -> &str {
    let line = line.strip_prefix(LINE_QUOTE).unwrap_or(line);
    line.strip_suffix(LINE_QUOTE).unwrap_or(line)
}

fn parse_line(line: &str) -> crate::Result<LogRecord> {
    let fields: Vec<_> = unquote(line).split(FIELD_SEPARATOR).collect();
    if fields.len() < 4 {
        return Err(crate::Error::new_malformed_log(
            line,
            format!("expected 4 fields, found {}", fields.len()),
        ));
    }

    let hash = fields[0];
    if hash.is_empty() {
        return Err(crate::Error::new_malformed_log(
            line,
            "empty commit hash".to_string(),
        ));
    }

    // The subject needs a field of its own, so the date is never last
    let date_position = (2..fields.len() - 1).find_map(|i| {
        NaiveDate::parse_from_str(fields[i], DATE_FORMAT)
            .ok()
            .map(|date| (i, date))
    });
    let Some((index, date)) = date_position else {
        let e = NaiveDate::parse_from_str(fields[2], DATE_FORMAT)
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        return Err(crate::Error::new_malformed_log(
            line,
            format!("invalid date \"{}\": {e}", fields[2]),
        ));
    };

    let separator = FIELD_SEPARATOR.to_string();
    Ok(LogRecord {
        hash: hash.to_string(),
        user: fields[1..index].join(separator.as_str()),
        date,
        message: fields[index + 1..].join(separator.as_str()),
    })
}

/// Decode log output with one `'hash|user|YYYY-MM-DD|subject'` record per line
///
/// Records are returned in the order of the output.
///
/// # Errors
///
/// Reports `MalformedLog` for the first line that is not a valid record.
pub fn parse_log(output: &str) -> crate::Result<Vec<LogRecord>> {
    if output.trim().is_empty() {
        return Ok(vec![]);
    }

    let mut lines: Vec<_> = output
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }

    lines.into_iter().map(parse_line).collect()
}
