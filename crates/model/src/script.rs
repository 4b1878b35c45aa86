//! Script rows parsed from two-column delimited text.
//!
//! Each non-blank line holds `speaker,text`. Fields may be wrapped in double
//! quotes to carry literal commas; inside quotes `""` is an escaped quote.
//! Blank lines and malformed lines are skipped and never consume a row
//! number, so row `n` is always the `n`-th accepted line.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::timeline::ModelError;

/// One line of the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRow {
    /// 1-based position among accepted lines.
    pub index: u32,
    pub speaker: String,
    pub text: String,
}

/// A line that was not turned into a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLine {
    /// 1-based physical line number in the input.
    pub line_number: usize,
    pub reason: SkipReason,
}

/// Why a line was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Fewer than the two required fields.
    TooFewFields { found: usize },
    /// A quoted field was still open at end of line.
    UnterminatedQuote,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::TooFewFields { found } => {
                write!(f, "expected 2 fields (speaker, text), found {found}")
            }
            SkipReason::UnterminatedQuote => f.write_str("unterminated quoted field"),
        }
    }
}

/// Result of parsing a whole script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedScript {
    pub rows: Vec<ScriptRow>,
    pub skipped: Vec<SkippedLine>,
}

/// Parse script text into rows.
///
/// Never fails: malformed lines are reported in [`ParsedScript::skipped`]
/// and logged as warnings.
pub fn parse_script(input: &str) -> ParsedScript {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut parsed = ParsedScript::default();
    let mut next_index: u32 = 1;

    for (i, line) in input.lines().enumerate() {
        let line_number = i + 1;
        if line.trim().is_empty() {
            continue;
        }

        let fields = match split_fields(line) {
            Ok(fields) => fields,
            Err(reason) => {
                tracing::warn!(line = line_number, %reason, "Skipping malformed script line");
                parsed.skipped.push(SkippedLine {
                    line_number,
                    reason,
                });
                continue;
            }
        };

        // `,` or `" ",""` carry no data and count as blank.
        if fields.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        if fields.len() < 2 {
            let reason = SkipReason::TooFewFields {
                found: fields.len(),
            };
            tracing::warn!(line = line_number, %reason, "Skipping malformed script line");
            parsed.skipped.push(SkippedLine {
                line_number,
                reason,
            });
            continue;
        }

        if fields.len() > 2 {
            tracing::debug!(
                line = line_number,
                extra = fields.len() - 2,
                "Ignoring extra fields"
            );
        }

        let mut fields = fields.into_iter();
        let speaker = fields.next().unwrap_or_default().trim().to_string();
        let text = fields.next().unwrap_or_default().trim().to_string();

        parsed.rows.push(ScriptRow {
            index: next_index,
            speaker,
            text,
        });
        next_index += 1;
    }

    parsed
}

/// Read and parse a UTF-8 script file.
pub fn parse_script_file(path: impl AsRef<Path>) -> Result<ParsedScript, ModelError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(parse_script(&content))
}

/// Split one line into fields, honouring double-quote escaping.
fn split_fields(line: &str) -> Result<Vec<String>, SkipReason> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;
    let mut at_field_start = true;

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            ',' => {
                fields.push(std::mem::take(&mut field));
                at_field_start = true;
                continue;
            }
            '"' if at_field_start || field.trim().is_empty() => {
                // Leading whitespace before an opening quote is dropped.
                field.clear();
                in_quotes = true;
            }
            _ => field.push(c),
        }
        at_field_start = false;
    }

    if in_quotes {
        return Err(SkipReason::UnterminatedQuote);
    }
    fields.push(field);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_rows() {
        let parsed = parse_script("Alice,Hello\nBob,Hi there\n");
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].index, 1);
        assert_eq!(parsed.rows[0].speaker, "Alice");
        assert_eq!(parsed.rows[1].text, "Hi there");
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_quoted_field_keeps_commas_and_escaped_quotes() {
        let parsed = parse_script(r#""Dr. Smith, PhD","She said ""yes"", then left""#);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].speaker, "Dr. Smith, PhD");
        assert_eq!(parsed.rows[0].text, r#"She said "yes", then left"#);
    }

    #[test]
    fn test_blank_lines_do_not_break_numbering() {
        let parsed = parse_script("\nAlice,One\n\n   \nBob,Two\n,\nCarol,Three");
        let indices: Vec<u32> = parsed.rows.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(parsed.rows[2].speaker, "Carol");
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_malformed_line_is_skipped_without_consuming_index() {
        let parsed = parse_script("Alice,One\njust a sentence\nBob,Two");
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1].index, 2);
        assert_eq!(parsed.rows[1].speaker, "Bob");
        assert_eq!(
            parsed.skipped,
            vec![SkippedLine {
                line_number: 2,
                reason: SkipReason::TooFewFields { found: 1 },
            }]
        );
    }

    #[test]
    fn test_unterminated_quote_is_skipped() {
        let parsed = parse_script("Alice,\"never closed\nBob,Fine");
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].index, 1);
        assert_eq!(parsed.skipped[0].reason, SkipReason::UnterminatedQuote);
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let parsed = parse_script("Alice,Hello,extra,columns");
        assert_eq!(parsed.rows[0].text, "Hello");
    }

    #[test]
    fn test_bom_and_crlf_are_handled() {
        let parsed = parse_script("\u{feff}Alice,Hello\r\nBob,Hi\r\n");
        assert_eq!(parsed.rows[0].speaker, "Alice");
        assert_eq!(parsed.rows[1].text, "Hi");
    }

    #[test]
    fn test_empty_text_row_is_kept() {
        let parsed = parse_script("Narrator,");
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].text, "");
    }

    #[test]
    fn test_quoted_field_with_surrounding_whitespace() {
        let parsed = parse_script(r#"Alice,  "Hello, world"  "#);
        assert_eq!(parsed.rows[0].text, "Hello, world");
    }

    #[test]
    fn test_parse_script_file_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_script_file(dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, ModelError::IoError { .. }));
    }
}
