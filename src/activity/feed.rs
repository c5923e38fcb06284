use serde::Deserialize;

use crate::activity::FetchError;

/// Where the index sits in the feed body.
///
/// Lines are counted from the end after splitting on `'\n'`, so a body
/// ending in a newline has an empty last line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedFormat {
    /// Fixed character columns `start..end` of one line.
    Columns {
        #[serde(default = "default_line_from_end")]
        line_from_end: usize,
        #[serde(default = "default_start")]
        start: usize,
        #[serde(default = "default_end")]
        end: usize,
    },
    /// Last numeric token on one line, ignoring JSON punctuation.
    LastNumber {
        #[serde(default = "default_line_from_end")]
        line_from_end: usize,
    },
}

fn default_line_from_end() -> usize {
    3
}

fn default_start() -> usize {
    57
}

fn default_end() -> usize {
    60
}

impl Default for FeedFormat {
    fn default() -> Self {
        FeedFormat::Columns {
            line_from_end: default_line_from_end(),
            start: default_start(),
            end: default_end(),
        }
    }
}

impl FeedFormat {
    pub fn parse(&self, body: &str) -> Result<f64, FetchError> {
        match *self {
            FeedFormat::Columns {
                line_from_end,
                start,
                end,
            } => {
                let line = select_line(body, line_from_end)?;
                let field: String = line
                    .chars()
                    .skip(start)
                    .take(end.saturating_sub(start))
                    .collect();
                if field.is_empty() {
                    return Err(FetchError::ShortLine {
                        start,
                        end,
                        line: line.to_string(),
                    });
                }
                let field = field.trim();
                field
                    .parse()
                    .map_err(|_| FetchError::NotANumber(field.to_string()))
            }
            FeedFormat::LastNumber { line_from_end } => {
                let line = select_line(body, line_from_end)?;
                line.split(is_separator)
                    .rev()
                    .filter(|token| !token.is_empty())
                    .find_map(|token| token.parse::<f64>().ok().filter(|v| v.is_finite()))
                    .ok_or_else(|| FetchError::NotANumber(line.to_string()))
            }
        }
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | ':' | '"' | '[' | ']' | '{' | '}')
}

fn select_line(body: &str, from_end: usize) -> Result<&str, FetchError> {
    let lines: Vec<&str> = body.split('\n').collect();
    if from_end == 0 || from_end > lines.len() {
        return Err(FetchError::MissingLine {
            lines: lines.len(),
            wanted: from_end,
        });
    }
    Ok(lines[lines.len() - from_end])
}
