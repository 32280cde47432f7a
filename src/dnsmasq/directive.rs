//! Directive tokenizer for dnsmasq configuration lines.
//!
//! Splits one raw line into an option key and value, applying dnsmasq's
//! comment rules. This is deliberately not a full grammar: the merge
//! engine only needs `(key, value)` pairs, and anything it cannot token-
//! ize is reported with a position so callers can cite the exact spot.

use thiserror::Error;

/// A single `key=value` (or bare flag) directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// The option name, e.g. `dhcp-range`.
    pub key: String,
    /// The option value; empty for bare flags such as `no-hosts`.
    pub value: String,
}

/// Error type for directive tokenization.
///
/// Carries a 1-based line and column so a corrupt managed file can be
/// diagnosed at the exact offending character.
#[derive(Debug, Error)]
pub enum DirectiveError {
    /// The line is not blank or a comment, but does not tokenize.
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        /// 1-based line number.
        line: usize,
        /// 1-based byte column.
        column: usize,
        /// What was wrong.
        message: String,
    },
}

impl DirectiveError {
    const fn syntax(line: usize, column: usize, message: String) -> Self {
        Self::Syntax {
            line,
            column,
            message,
        }
    }
}

/// Splits a line at a dnsmasq-style comment.
///
/// A `#` starts a comment only at the start of the line or when preceded
/// by whitespace; dnsmasq has no escaping, so a `#` embedded in a value
/// (e.g. `dhcp-option=option:domain-search,a#b`) is literal. Returns the
/// content before the comment and the comment text after the `#`, if any.
#[must_use]
pub fn split_comment(line: &str) -> (&str, Option<&str>) {
    let mut prev_is_space = true;
    for (i, ch) in line.char_indices() {
        if ch == '#' && prev_is_space {
            return (&line[..i], Some(&line[i + 1..]));
        }
        prev_is_space = ch.is_whitespace();
    }
    (line, None)
}

/// Tokenizes one configuration line.
///
/// Returns `Ok(None)` for blank and comment-only lines, `Ok(Some(_))`
/// for a directive (bare flags get an empty value), and an error with
/// line/column for content that is not a directive at all.
///
/// # Errors
///
/// Returns [`DirectiveError::Syntax`] when the option name is empty or
/// contains characters outside `[A-Za-z0-9_-]`.
pub fn parse_directive(line: &str, line_number: usize) -> Result<Option<Directive>, DirectiveError> {
    let (content, _comment) = split_comment(line);
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Byte offset of the first non-whitespace character, for columns.
    let indent = content.len() - content.trim_start().len();

    let (key, value) = match trimmed.split_once('=') {
        Some((key, value)) => (key.trim_end(), value.trim()),
        None => (trimmed, ""),
    };

    if key.is_empty() {
        return Err(DirectiveError::syntax(
            line_number,
            indent + 1,
            "missing option name before '='".to_string(),
        ));
    }

    if let Some(pos) = key
        .bytes()
        .position(|b| !(b.is_ascii_alphanumeric() || b == b'-' || b == b'_'))
    {
        let offending = key[pos..].chars().next().unwrap_or('?');
        return Err(DirectiveError::syntax(
            line_number,
            indent + pos + 1,
            format!("unexpected character {offending:?} in option name"),
        ));
    }

    Ok(Some(Directive {
        key: key.to_string(),
        value: value.to_string(),
    }))
}
