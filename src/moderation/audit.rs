/// Audit log display format
///
/// One line per entry: `timestamp\tactor\taction\tnote`. Timestamps are
/// RFC 3339 with full sub-second precision, an absent note is an empty field,
/// and backslash, tab, newline and carriage return are escaped so that
/// `parse_log(&format_log(log))` reproduces the log exactly.
use super::entity::{AuditEntry, AuditLog};
use crate::error::{ModerationError, ModerationResult};
use chrono::{DateTime, SecondsFormat, Utc};

const FIELD_SEPARATOR: char = '\t';

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(value: &str, line: usize) -> ModerationResult<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                return Err(ModerationError::InvalidAuditLine {
                    line,
                    reason: format!("unknown escape sequence \\{}", other),
                })
            }
            None => {
                return Err(ModerationError::InvalidAuditLine {
                    line,
                    reason: "dangling escape".to_string(),
                })
            }
        }
    }
    Ok(out)
}

/// Format a single entry as one display line (no trailing newline)
pub fn format_entry(entry: &AuditEntry) -> String {
    format!(
        "{ts}{sep}{actor}{sep}{action}{sep}{note}",
        ts = entry.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        actor = escape(&entry.actor),
        action = escape(&entry.action),
        note = entry.note.as_deref().map(escape).unwrap_or_default(),
        sep = FIELD_SEPARATOR,
    )
}

/// Parse one display line. `line` is 1-based and only used for error reporting.
pub fn parse_entry(text: &str, line: usize) -> ModerationResult<AuditEntry> {
    let fields: Vec<&str> = text.split(FIELD_SEPARATOR).collect();
    if fields.len() != 4 {
        return Err(ModerationError::InvalidAuditLine {
            line,
            reason: format!("expected 4 fields, found {}", fields.len()),
        });
    }

    let timestamp = DateTime::parse_from_rfc3339(fields[0])
        .map_err(|e| ModerationError::InvalidAuditLine {
            line,
            reason: format!("invalid timestamp: {}", e),
        })?
        .with_timezone(&Utc);

    let actor = unescape(fields[1], line)?;
    let action = unescape(fields[2], line)?;
    if actor.is_empty() || action.is_empty() {
        return Err(ModerationError::InvalidAuditLine {
            line,
            reason: "actor and action are required".to_string(),
        });
    }

    let note = if fields[3].is_empty() {
        None
    } else {
        Some(unescape(fields[3], line)?)
    };

    Ok(AuditEntry {
        action,
        actor,
        timestamp,
        note,
    })
}

/// Format a whole log, one entry per line
pub fn format_log(log: &AuditLog) -> String {
    let mut out = String::new();
    for entry in log.entries() {
        out.push_str(&format_entry(entry));
        out.push('\n');
    }
    out
}

/// Parse a log produced by `format_log`. Blank lines are ignored.
pub fn parse_log(text: &str) -> ModerationResult<AuditLog> {
    let entries = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_entry(line, idx + 1))
        .collect::<ModerationResult<Vec<_>>>()?;

    Ok(AuditLog::from_entries(entries))
}
